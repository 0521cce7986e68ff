//! Background flush loop draining the buffer into the shipper.
//!
//! One flusher runs per initialized pipeline. Its worker task wakes on a
//! fixed interval, drains the buffer, and hands the batch to the shipper;
//! delivery errors are logged and the batch is dropped after the shipper's
//! own retry budget; they never terminate the loop and never reach
//! producers. Forced flushes may run at any time, including concurrently
//! with a periodic tick: the buffer lock guarantees each drained entry is
//! delivered by exactly one caller.
//!
//! Lifecycle: `Stopped → Running → Stopping → Stopped`. Shutdown cancels
//! the worker through its token, joins it with a bounded timeout
//! (proceeding anyway on expiry), then runs one final drain+deliver pass.

use crate::buffer::EntryBuffer;
use crate::shipper::{LogShipper, ShipError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// How long `stop` waits for the worker task before proceeding without it.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause after a failed periodic pass before the next tick is honored.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// State of the flush loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlusherStatus {
    /// No worker task is live.
    Stopped,
    /// The periodic loop is running.
    Running,
    /// Shutdown in progress: the worker has been signalled to exit.
    Stopping,
}

/// Periodic flush scheduler for one buffer/shipper pair.
pub struct Flusher {
    buffer: Arc<EntryBuffer>,
    shipper: Arc<dyn LogShipper>,
    interval: Duration,
    status: Arc<RwLock<FlusherStatus>>,
    // Token and handle live and die with one worker; a restart mints a
    // fresh pair, so an old cancellation never kills a new worker.
    worker: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl Flusher {
    #[must_use]
    pub fn new(buffer: Arc<EntryBuffer>, shipper: Arc<dyn LogShipper>, interval: Duration) -> Self {
        Flusher {
            buffer,
            shipper,
            interval,
            status: Arc::new(RwLock::new(FlusherStatus::Stopped)),
            worker: Mutex::new(None),
        }
    }

    pub async fn status(&self) -> FlusherStatus {
        *self.status.read().await
    }

    /// Starts the periodic loop. Idempotent: only the `Stopped → Running`
    /// transition spawns a worker.
    pub async fn start(&self) {
        {
            let mut status = self.status.write().await;
            if *status != FlusherStatus::Stopped {
                debug!("flush loop already running");
                return;
            }
            *status = FlusherStatus::Running;
        }

        let buffer = Arc::clone(&self.buffer);
        let shipper = Arc::clone(&self.shipper);
        let interval = self.interval;
        let token = CancellationToken::new();
        let cancel = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // the immediate first tick is not a flush
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = flush_pass(&buffer, shipper.as_ref()).await {
                            error!("periodic flush failed, dropping batch: {e}");
                            tokio::time::sleep(ERROR_BACKOFF).await;
                        }
                    }
                    () = cancel.cancelled() => {
                        debug!("flush loop received stop signal");
                        break;
                    }
                }
            }
        });

        *self.worker.lock().await = Some((token, handle));
    }

    /// Performs one drain+deliver pass, regardless of loop state.
    ///
    /// Returns the number of entries delivered; the shipper is not invoked
    /// for an empty drain.
    pub async fn flush_now(&self) -> Result<usize, ShipError> {
        flush_pass(&self.buffer, self.shipper.as_ref()).await
    }

    /// Stops the loop: signals the worker, joins it with a bounded timeout,
    /// then runs one final drain+deliver pass.
    ///
    /// One-shot: only the first call while `Running` does any of this;
    /// later calls are no-ops, so shutdown never delivers twice.
    pub async fn stop(&self) {
        {
            let mut status = self.status.write().await;
            if *status != FlusherStatus::Running {
                return;
            }
            *status = FlusherStatus::Stopping;
        }

        if let Some((token, handle)) = self.worker.lock().await.take() {
            token.cancel();
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
                warn!(
                    "flush worker did not exit within {SHUTDOWN_TIMEOUT:?}, proceeding with shutdown"
                );
            }
        }

        if let Err(e) = self.flush_now().await {
            error!("final flush failed, dropping remaining entries: {e}");
        }

        *self.status.write().await = FlusherStatus::Stopped;
    }
}

/// One drain+deliver pass shared by the periodic loop and forced flushes.
pub(crate) async fn flush_pass(
    buffer: &EntryBuffer,
    shipper: &dyn LogShipper,
) -> Result<usize, ShipError> {
    let batch = buffer.drain(buffer.capacity());
    if batch.is_empty() {
        return Ok(0);
    }
    debug!("flushing {} buffered entries", batch.len());
    shipper.ship(&batch).await?;
    Ok(batch.len())
}
