//! Lock-free circuit breaker shared by the relay pool and every FRPEI
//! provider.
//!
//! Adapted from the workspace's canonical atomics+semaphore circuit
//! breaker: three states (Closed/Open/HalfOpen), a semaphore gating how
//! many trial calls may run concurrently in HalfOpen, and a pluggable
//! clock so tests can drive state transitions without sleeping.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering::Relaxed};
use std::sync::Arc;

use beacon_types::ports::{CircuitBreaker as CircuitBreakerPort, CircuitState};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RawState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl From<u8> for RawState {
    fn from(v: u8) -> Self {
        match v {
            1 => RawState::Open,
            2 => RawState::HalfOpen,
            _ => RawState::Closed,
        }
    }
}

impl From<RawState> for CircuitState {
    fn from(s: RawState) -> Self {
        match s {
            RawState::Closed => CircuitState::Closed,
            RawState::Open => CircuitState::Open,
            RawState::HalfOpen => CircuitState::HalfOpen,
        }
    }
}

/// Time source abstraction, so tests can advance the clock deterministically
/// instead of sleeping real wall time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_ms(&self) -> u64;
}

#[derive(Default, Debug)]
pub struct RealClock;

impl Clock for RealClock {
    fn now_ms(&self) -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Threshold configuration. Defaults: `failure_threshold=3`,
/// `success_threshold=2`.
#[derive(Debug, Clone)]
pub struct Config {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub reset_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 2,
            reset_timeout_ms: 30_000,
        }
    }
}

/// Lock-free circuit breaker implementing [`beacon_types::ports::CircuitBreaker`].
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    state: AtomicU8,
    failures: AtomicU32,
    successes: AtomicU32,
    open_until_ms: AtomicU64,
    half_open_permits: Arc<Semaphore>,
    cfg: Config,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, cfg: Config) -> Arc<Self> {
        Self::with_clock(name, cfg, Arc::new(RealClock))
    }

    pub fn with_clock(name: impl Into<String>, cfg: Config, clock: Arc<dyn Clock>) -> Arc<Self> {
        let permits = cfg.success_threshold.max(1) as usize;
        Arc::new(Self {
            name: name.into(),
            state: AtomicU8::new(RawState::Closed as u8),
            failures: AtomicU32::new(0),
            successes: AtomicU32::new(0),
            open_until_ms: AtomicU64::new(0),
            half_open_permits: Arc::new(Semaphore::new(permits)),
            cfg,
            clock,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn raw_state(&self) -> RawState {
        self.state.load(Relaxed).into()
    }

    /// Attempt to acquire a call slot, returning a permit that must stay
    /// alive for the call's duration when the breaker is HalfOpen.
    pub fn try_acquire(&self) -> Result<Option<OwnedSemaphorePermit>, &'static str> {
        match self.raw_state() {
            RawState::Closed => Ok(None),
            RawState::Open => {
                let now = self.clock.now_ms();
                if now >= self.open_until_ms.load(Relaxed) {
                    self.state.store(RawState::HalfOpen as u8, Relaxed);
                    self.try_acquire()
                } else {
                    Err("circuit open")
                }
            }
            RawState::HalfOpen => match Arc::clone(&self.half_open_permits).try_acquire_owned() {
                Ok(permit) => Ok(Some(permit)),
                Err(_) => Err("half-open saturated"),
            },
        }
    }

    fn trip_open(&self) {
        self.state.store(RawState::Open as u8, Relaxed);
        self.successes.store(0, Relaxed);
        self.failures.store(0, Relaxed);
        let until = self.clock.now_ms() + self.cfg.reset_timeout_ms;
        self.open_until_ms.store(until, Relaxed);
        let target = self.cfg.success_threshold.max(1) as usize;
        let avail = self.half_open_permits.available_permits();
        if avail < target {
            self.half_open_permits.add_permits(target - avail);
        }
    }

    pub fn failure_count(&self) -> u32 {
        self.failures.load(Relaxed)
    }
}

impl CircuitBreakerPort for CircuitBreaker {
    fn allow_request(&self) -> bool {
        self.try_acquire().is_ok()
    }

    fn record_success(&self) {
        match self.raw_state() {
            RawState::Closed => {
                self.failures.store(0, Relaxed);
            }
            RawState::HalfOpen => {
                let succ = self.successes.fetch_add(1, Relaxed) + 1;
                if succ >= self.cfg.success_threshold {
                    self.state.store(RawState::Closed as u8, Relaxed);
                    self.failures.store(0, Relaxed);
                    self.successes.store(0, Relaxed);
                }
            }
            RawState::Open => {}
        }
    }

    fn record_failure(&self) {
        match self.raw_state() {
            RawState::Closed => {
                let f = self.failures.fetch_add(1, Relaxed) + 1;
                if f >= self.cfg.failure_threshold {
                    self.trip_open();
                }
            }
            RawState::HalfOpen => self.trip_open(),
            RawState::Open => {}
        }
    }

    fn state(&self) -> CircuitState {
        self.raw_state().into()
    }
}

/// Runs `f` guarded by `breaker`: fails fast with
/// [`beacon_types::BeaconError::TransientNetwork`] if the circuit rejects
/// the call, otherwise records the outcome against the breaker.
pub async fn guarded_call<T, Fut>(
    breaker: &CircuitBreaker,
    f: impl FnOnce() -> Fut,
) -> beacon_types::Result<T>
where
    Fut: std::future::Future<Output = beacon_types::Result<T>>,
{
    let permit = breaker.try_acquire().map_err(|reason| {
        beacon_types::BeaconError::TransientNetwork(format!(
            "{} circuit breaker: {reason}",
            breaker.name()
        ))
    })?;

    let result = f().await;
    match &result {
        Ok(_) => breaker.record_success(),
        Err(_) => breaker.record_failure(),
    }
    drop(permit);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64 as StdAtomicU64;

    #[derive(Default, Debug)]
    struct TestClock {
        now: StdAtomicU64,
    }

    impl TestClock {
        fn advance(&self, ms: u64) {
            self.now.fetch_add(ms, Relaxed);
        }
    }

    impl Clock for TestClock {
        fn now_ms(&self) -> u64 {
            self.now.load(Relaxed)
        }
    }

    #[test]
    fn opens_after_failure_threshold_and_closes_after_success_threshold() {
        let clock = Arc::new(TestClock::default());
        let cb = CircuitBreaker::with_clock(
            "test-relay",
            Config {
                failure_threshold: 3,
                success_threshold: 2,
                reset_timeout_ms: 1_000,
            },
            clock.clone(),
        );

        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow_request());

        clock.advance(1_000);
        assert!(cb.allow_request());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let clock = Arc::new(TestClock::default());
        let cb = CircuitBreaker::with_clock(
            "test-provider",
            Config {
                failure_threshold: 1,
                success_threshold: 1,
                reset_timeout_ms: 500,
            },
            clock.clone(),
        );

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        clock.advance(500);
        assert!(cb.allow_request());
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn guarded_call_fails_fast_when_open() {
        let cb = CircuitBreaker::new(
            "svc",
            Config {
                failure_threshold: 1,
                success_threshold: 1,
                reset_timeout_ms: 60_000,
            },
        );
        let _: beacon_types::Result<()> =
            guarded_call(&cb, || async { Err(beacon_types::BeaconError::custom("boom")) }).await;
        assert_eq!(cb.state(), CircuitState::Open);

        let result: beacon_types::Result<()> = guarded_call(&cb, || async { Ok(()) }).await;
        assert!(matches!(result, Err(beacon_types::BeaconError::TransientNetwork(_))));
    }
}
