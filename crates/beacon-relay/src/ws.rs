//! NIP-01 wire client: opens a short-lived websocket to a relay, sends a
//! single `REQ`, collects `EVENT` frames until `EOSE` or `batch_size` is
//! reached, then sends `CLOSE` and drops the connection.
//!
//! One connection per `fetch_from_relay` call rather than a pooled/kept-
//! alive subscription — the crawler's access pattern is one bounded
//! paginated batch per relay per cursor step, not a long-lived live feed.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use beacon_types::{BeaconError, NostrEvent, NostrFilter, Result};

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Injectable wire transport so [`crate::pool::RelayPoolManager`]'s
/// rate-limit/breaker/dedup bookkeeping can be unit-tested without a real
/// relay socket. [`WebsocketWireClient`] is the only production
/// implementation.
#[async_trait]
pub trait RelayWireClient: Send + Sync {
    async fn fetch(&self, url: &str, filter: &NostrFilter, batch_size: u32, timeout_ms: u64) -> Result<Vec<NostrEvent>>;
}

#[derive(Debug, Clone, Default)]
pub struct WebsocketWireClient;

#[async_trait]
impl RelayWireClient for WebsocketWireClient {
    async fn fetch(&self, url: &str, filter: &NostrFilter, batch_size: u32, timeout_ms: u64) -> Result<Vec<NostrEvent>> {
        fetch_req(url, filter, batch_size, timeout_ms).await
    }
}

/// Opens `url`, issues `REQ <sub_id> <filter>`, and collects `EVENT`
/// messages for that subscription until either `EOSE` arrives, `limit`
/// events have been collected, or `timeout_ms` elapses. Always sends
/// `CLOSE` before dropping the socket, best-effort.
pub async fn fetch_req(url: &str, filter: &NostrFilter, limit: u32, timeout_ms: u64) -> Result<Vec<NostrEvent>> {
    let deadline = Duration::from_millis(if timeout_ms == 0 { DEFAULT_TIMEOUT_MS } else { timeout_ms });
    timeout(deadline, run_req(url, filter, limit))
        .await
        .map_err(|_| BeaconError::ProviderTimeout(deadline.as_millis() as u64))?
}

async fn run_req(url: &str, filter: &NostrFilter, limit: u32) -> Result<Vec<NostrEvent>> {
    let (mut socket, _response) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| BeaconError::TransientNetwork(format!("websocket connect to {url} failed: {e}")))?;

    let sub_id = subscription_id();
    let req = serde_json::json!(["REQ", sub_id, filter]);
    socket
        .send(Message::Text(req.to_string()))
        .await
        .map_err(|e| BeaconError::TransientNetwork(format!("REQ send to {url} failed: {e}")))?;

    let mut events = Vec::new();
    let result = loop {
        if events.len() >= limit as usize {
            break Ok(events);
        }
        match socket.next().await {
            Some(Ok(Message::Text(text))) => match parse_frame(&text, &sub_id) {
                Some(Frame::Event(event)) => events.push(event),
                Some(Frame::Eose) => break Ok(events),
                Some(Frame::Notice(msg)) => {
                    tracing::debug!(url, notice = %msg, "relay NOTICE during REQ");
                }
                None => {}
            },
            Some(Ok(Message::Close(_))) | None => break Ok(events),
            Some(Ok(_)) => {}
            Some(Err(e)) => break Err(BeaconError::TransientNetwork(format!("websocket read from {url} failed: {e}"))),
        }
    };

    let _ = socket.send(Message::Text(serde_json::json!(["CLOSE", sub_id]).to_string())).await;
    let _ = socket.close(None).await;
    result
}

enum Frame {
    Event(NostrEvent),
    Eose,
    Notice(String),
}

fn parse_frame(text: &str, sub_id: &str) -> Option<Frame> {
    let value: Value = serde_json::from_str(text).ok()?;
    let array = value.as_array()?;
    let tag = array.first()?.as_str()?;
    match tag {
        "EVENT" if array.len() >= 3 && array.get(1)?.as_str() == Some(sub_id) => {
            serde_json::from_value::<NostrEvent>(array[2].clone()).ok().map(Frame::Event)
        }
        "EOSE" if array.get(1).and_then(Value::as_str) == Some(sub_id) => Some(Frame::Eose),
        "NOTICE" => Some(Frame::Notice(array.get(1).and_then(Value::as_str).unwrap_or_default().to_string())),
        _ => None,
    }
}

fn subscription_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!("beacon-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}
