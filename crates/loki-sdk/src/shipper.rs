//! Batch delivery to the Loki push API.
//!
//! The core hands drained batches to a [`LogShipper`], the collaborator
//! boundary for the actual network push. [`LokiShipper`] is the bundled
//! implementation: it groups entries by label set into Loki streams, POSTs
//! the push payload, and retries failed batches within a bounded budget.
//!
//! Failures are typed rather than swallowed: the flush boundary inspects
//! [`ShipError`] to decide log-and-continue, and the retry loop inspects
//! [`ShipError::is_retryable`] so a `400` from the backend is dropped
//! immediately while a `500` or a transport error burns retry budget.

use crate::entry::LogEntry;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use std::time::{Duration, UNIX_EPOCH};
use tracing::{debug, warn};

/// Delivery failure for one batch.
#[derive(Debug, thiserror::Error)]
pub enum ShipError {
    /// The batch could not be encoded into a push payload. Permanent.
    #[error("failed to encode push payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The request never produced a response (connect, timeout, DNS).
    #[error("failed to reach log backend: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("log backend rejected push ({status}): {body}")]
    Backend { status: StatusCode, body: String },
}

impl ShipError {
    /// Whether retrying the same batch can plausibly succeed.
    ///
    /// 4xx responses are permanent rejections (malformed payload, bad
    /// stream), except 429 which signals transient backpressure.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ShipError::Payload(_) => false,
            ShipError::Transport(_) => true,
            ShipError::Backend { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
        }
    }
}

/// How a failed batch is retried before being dropped.
///
/// The attempt count is tracked per batch, not per entry.
#[derive(Debug, Clone)]
pub enum RetryStrategy {
    /// Up to `n` attempts with no delay between them.
    Immediate(u32),
    /// Up to `n` attempts, sleeping `attempt * delay_ms` before each retry.
    LinearBackoff(u32, u64),
}

impl RetryStrategy {
    fn max_attempts(&self) -> u32 {
        match self {
            RetryStrategy::Immediate(n) | RetryStrategy::LinearBackoff(n, _) => (*n).max(1),
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        match self {
            RetryStrategy::Immediate(_) => Duration::ZERO,
            RetryStrategy::LinearBackoff(_, delay_ms) => {
                Duration::from_millis(delay_ms * u64::from(attempt))
            }
        }
    }
}

/// Collaborator boundary for pushing a batch of entries to the backend.
///
/// The core only calls this with non-empty batches and isolates every
/// failure at the flush boundary; implementations do not need to defend
/// against empty input or catch their own errors.
#[async_trait]
pub trait LogShipper: Send + Sync {
    async fn ship(&self, batch: &[LogEntry]) -> Result<(), ShipError>;
}

/// HTTP shipper for the Loki push API.
///
/// Owns the `reqwest::Client` whose connection pool is the shared delivery
/// resource; it is released when the shipper is dropped at shutdown.
#[derive(Debug, Clone)]
pub struct LokiShipper {
    client: reqwest::Client,
    endpoint: String,
    retry_strategy: RetryStrategy,
}

impl LokiShipper {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, retry_strategy: RetryStrategy) -> Self {
        LokiShipper {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            retry_strategy,
        }
    }

    async fn push_once(&self, payload: &serde_json::Value) -> Result<(), ShipError> {
        let response = self.client.post(&self.endpoint).json(payload).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ShipError::Backend { status, body })
    }
}

#[async_trait]
impl LogShipper for LokiShipper {
    async fn ship(&self, batch: &[LogEntry]) -> Result<(), ShipError> {
        if batch.is_empty() {
            return Ok(());
        }
        let payload = build_push_payload(batch)?;
        let max_attempts = self.retry_strategy.max_attempts();

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.push_once(&payload).await {
                Ok(()) => {
                    debug!("shipped batch of {} entries", batch.len());
                    return Ok(());
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    warn!("push attempt {attempt}/{max_attempts} failed, retrying: {err}");
                    let delay = self.retry_strategy.delay(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Builds the Loki push body, grouping entries by identical label set into
/// streams. Value order within a stream follows batch order, which is FIFO
/// by construction.
fn build_push_payload(batch: &[LogEntry]) -> Result<serde_json::Value, ShipError> {
    let mut streams: Vec<(&LogEntry, Vec<serde_json::Value>)> = Vec::new();

    for entry in batch {
        let ts = entry
            .timestamp
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
            .to_string();
        let line = if entry.metadata.is_empty() {
            entry.message.clone()
        } else {
            serde_json::to_string(&json!({
                "message": entry.message,
                "metadata": entry.metadata,
            }))?
        };
        let value = json!([ts, line]);

        match streams
            .iter()
            .position(|(stream, _)| stream.labels == entry.labels)
        {
            Some(idx) => streams[idx].1.push(value),
            None => streams.push((entry, vec![value])),
        }
    }

    let streams: Vec<serde_json::Value> = streams
        .into_iter()
        .map(|(stream, values)| json!({"stream": stream.labels, "values": values}))
        .collect();

    Ok(json!({ "streams": streams }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Fields, Level};
    use serde_json::json;

    fn entry(level: Level, message: &str, fields: Fields) -> LogEntry {
        LogEntry::build(level, message, fields, "my-app", "test")
    }

    #[test]
    fn test_payload_groups_by_label_set() {
        let batch = vec![
            entry(Level::Info, "one", Fields::new()),
            entry(Level::Info, "two", Fields::new()),
            entry(Level::Error, "boom", Fields::new()),
        ];

        let payload = build_push_payload(&batch).unwrap();
        let streams = payload["streams"].as_array().unwrap();
        assert_eq!(streams.len(), 2);

        // INFO stream carries both entries in FIFO order.
        assert_eq!(streams[0]["stream"]["level"], "INFO");
        let values = streams[0]["values"].as_array().unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0][1], "one");
        assert_eq!(values[1][1], "two");

        assert_eq!(streams[1]["stream"]["level"], "ERROR");
        assert_eq!(streams[1]["values"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_payload_carries_identity_labels() {
        let batch = vec![entry(Level::Info, "one", Fields::new())];
        let payload = build_push_payload(&batch).unwrap();
        let stream = &payload["streams"][0]["stream"];
        assert_eq!(stream["app"], "my-app");
        assert_eq!(stream["environment"], "test");
    }

    #[test]
    fn test_payload_timestamps_are_nanosecond_strings() {
        let batch = vec![entry(Level::Info, "one", Fields::new())];
        let payload = build_push_payload(&batch).unwrap();
        let ts = payload["streams"][0]["values"][0][0].as_str().unwrap();
        let ns: u128 = ts.parse().unwrap();
        // Sanity: sometime after 2020 in nanoseconds.
        assert!(ns > 1_577_836_800_000_000_000);
    }

    #[test]
    fn test_payload_line_includes_metadata_when_present() {
        let mut fields = Fields::new();
        fields.insert("request_id".to_string(), json!("abc-123"));
        let batch = vec![entry(Level::Info, "handled", fields)];

        let payload = build_push_payload(&batch).unwrap();
        let line = payload["streams"][0]["values"][0][1].as_str().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(parsed["message"], "handled");
        assert_eq!(parsed["metadata"]["request_id"], "abc-123");
    }

    #[test]
    fn test_backend_error_retryability() {
        let server_err = ShipError::Backend {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: String::new(),
        };
        assert!(server_err.is_retryable());

        let throttled = ShipError::Backend {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
        };
        assert!(throttled.is_retryable());

        let rejected = ShipError::Backend {
            status: StatusCode::BAD_REQUEST,
            body: String::new(),
        };
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn test_retry_strategy_attempts_and_delay() {
        let immediate = RetryStrategy::Immediate(3);
        assert_eq!(immediate.max_attempts(), 3);
        assert_eq!(immediate.delay(2), Duration::ZERO);

        let backoff = RetryStrategy::LinearBackoff(4, 100);
        assert_eq!(backoff.max_attempts(), 4);
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(3), Duration::from_millis(300));

        // A zero budget still means one attempt.
        assert_eq!(RetryStrategy::Immediate(0).max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_ship_empty_batch_is_noop() {
        let shipper = LokiShipper::new("http://127.0.0.1:9/never", RetryStrategy::Immediate(1));
        assert!(shipper.ship(&[]).await.is_ok());
    }
}
