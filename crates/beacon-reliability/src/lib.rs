//! Circuit breaker, token-bucket rate limiter, and reliable HTTP client
//! shared by the relay pool and every FRPEI search provider.

pub mod circuit_breaker;
pub mod http_client;
pub mod rate_limit;

pub use circuit_breaker::{guarded_call, CircuitBreaker, Clock, Config as CircuitBreakerConfig, RealClock};
pub use http_client::{FetchOptions, HttpConfig, ReliableHttpClient};
pub use rate_limit::{as_rate_limit_signal, TokenBucketRateLimiter};
