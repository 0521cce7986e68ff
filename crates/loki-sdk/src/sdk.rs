//! SDK instance lifecycle: initialization, log intake, shutdown.
//!
//! A [`LokiSdk`] is a cheaply cloneable handle owning at most one live
//! pipeline: the configuration snapshot, the bounded buffer, the shipper,
//! and the flush loop supervising them. `init` builds the pipeline (and
//! stops any previous one first, so re-initialization never leaves two
//! schedulers running); `shutdown` tears it down exactly once with a final
//! flush before the shipper's connection resources are released.
//!
//! Construct one instance per application component and pass it explicitly;
//! the process-wide default in the crate root exists only for drop-in
//! convenience.

use crate::buffer::EntryBuffer;
use crate::config::Config;
use crate::entry::{Fields, Level, LogEntry};
use crate::error::ConfigError;
use crate::flusher::Flusher;
use crate::shipper::{LogShipper, LokiShipper, RetryStrategy};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, warn};

/// Base delay between batch retry attempts.
const RETRY_BACKOFF_MS: u64 = 250;

/// Everything one initialized instance owns.
struct Pipeline {
    config: Arc<Config>,
    buffer: Arc<EntryBuffer>,
    shipper: Arc<dyn LogShipper>,
    flusher: Flusher,
}

/// Handle to one SDK instance.
///
/// Starts uninitialized; log calls before [`LokiSdk::init`] are dropped
/// with a local warning. All methods are safe to call from any number of
/// concurrent tasks.
#[derive(Clone, Default)]
pub struct LokiSdk {
    pipeline: Arc<RwLock<Option<Pipeline>>>,
}

impl LokiSdk {
    /// Creates an uninitialized instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration and brings up the delivery pipeline,
    /// with a [`LokiShipper`] pointed at `config.endpoint`.
    ///
    /// Re-initializing replaces the previous pipeline: its flusher is
    /// stopped (final flush included) before the new one starts, so two
    /// schedulers are never live at once.
    pub async fn init(&self, config: Config) -> Result<(), ConfigError> {
        config.validate()?;
        let shipper = Arc::new(LokiShipper::new(
            config.endpoint.clone(),
            RetryStrategy::LinearBackoff(config.max_retries + 1, RETRY_BACKOFF_MS),
        ));
        self.init_with_shipper(config, shipper).await
    }

    /// Like [`LokiSdk::init`], but with a caller-supplied delivery adapter.
    pub async fn init_with_shipper(
        &self,
        config: Config,
        shipper: Arc<dyn LogShipper>,
    ) -> Result<(), ConfigError> {
        config.validate()?;

        let mut slot = self.pipeline.write().await;
        if let Some(old) = slot.take() {
            old.flusher.stop().await;
        }

        let config = Arc::new(config);
        let buffer = Arc::new(EntryBuffer::new(config.buffer_capacity));
        let flusher = Flusher::new(
            Arc::clone(&buffer),
            Arc::clone(&shipper),
            config.flush_interval,
        );
        if config.enable_offline_buffer {
            flusher.start().await;
        }

        *slot = Some(Pipeline {
            config,
            buffer,
            shipper,
            flusher,
        });
        Ok(())
    }

    /// Whether `init` has completed on this instance.
    pub async fn is_initialized(&self) -> bool {
        self.pipeline.read().await.is_some()
    }

    /// Records one log entry.
    ///
    /// With the offline buffer enabled this only touches the queue and
    /// never waits on I/O. With buffering disabled the entry is shipped at
    /// call time: fire-and-forget when `use_send_beacon` is set, awaited
    /// inline otherwise. Delivery problems are logged locally and never
    /// surfaced to the caller.
    pub async fn log(&self, level: Level, message: &str, fields: Fields) {
        let slot = self.pipeline.read().await;
        let Some(pipeline) = slot.as_ref() else {
            warn!("log call before init, dropping entry: {message}");
            return;
        };

        let entry = LogEntry::build(
            level,
            message,
            fields,
            &pipeline.config.app_name,
            &pipeline.config.environment,
        );

        if pipeline.config.enable_offline_buffer {
            pipeline.buffer.push(entry);
            return;
        }

        // Buffer bypass: single-entry batch straight to the shipper. The
        // read guard is released before delivery so a slow push (retry
        // budget included) never stalls a concurrent init or shutdown.
        let beacon = pipeline.config.use_send_beacon;
        let shipper = Arc::clone(&pipeline.shipper);
        drop(slot);

        if beacon {
            tokio::spawn(async move {
                if let Err(e) = shipper.ship(&[entry]).await {
                    error!("beacon delivery failed, entry dropped: {e}");
                }
            });
        } else if let Err(e) = shipper.ship(&[entry]).await {
            error!("synchronous delivery failed, entry dropped: {e}");
        }
    }

    pub async fn debug(&self, message: &str, fields: Fields) {
        self.log(Level::Debug, message, fields).await;
    }

    pub async fn info(&self, message: &str, fields: Fields) {
        self.log(Level::Info, message, fields).await;
    }

    pub async fn warning(&self, message: &str, fields: Fields) {
        self.log(Level::Warning, message, fields).await;
    }

    pub async fn error(&self, message: &str, fields: Fields) {
        self.log(Level::Error, message, fields).await;
    }

    pub async fn critical(&self, message: &str, fields: Fields) {
        self.log(Level::Critical, message, fields).await;
    }

    /// Forces one drain+deliver pass. No-op before init or on an empty
    /// buffer; delivery errors are logged and the batch dropped.
    pub async fn flush(&self) {
        let slot = self.pipeline.read().await;
        if let Some(pipeline) = slot.as_ref() {
            if let Err(e) = pipeline.flusher.flush_now().await {
                error!("forced flush failed, batch dropped: {e}");
            }
        }
    }

    /// Tears down the pipeline: stops the flush loop (bounded-wait join plus
    /// final flush) and drops the shipper, releasing its connection pool
    /// even when the final flush fails.
    ///
    /// One-shot: the pipeline is taken out of the instance first, so a
    /// second call finds nothing and is a no-op.
    pub async fn shutdown(&self) {
        let taken = self.pipeline.write().await.take();
        if let Some(pipeline) = taken {
            pipeline.flusher.stop().await;
        }
    }
}
