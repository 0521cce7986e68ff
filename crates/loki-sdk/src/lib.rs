//! Buffered, batching client for shipping structured logs to Grafana Loki.
//!
//! Applications emit structured entries through this crate and a background
//! flush loop delivers them to a Loki push endpoint in batches, tolerating
//! backend unavailability without ever blocking or crashing the host. This
//! is a best-effort shipper, not a durable log store: entries may be dropped
//! under sustained overload and are lost on crash.
//!
//! # Architecture
//!
//! ```text
//!    Application
//!        │  log / debug / info / ...
//!        v
//!   ┌─────────────┐
//!   │ EntryBuilder│  (labels + metadata composition)
//!   └──────┬──────┘
//!          │
//!          v
//!   ┌─────────────┐      bypass (buffer disabled)
//!   │ EntryBuffer │ ───────────────┐
//!   └──────┬──────┘                │
//!          │ periodic / forced     │
//!          v                       v
//!   ┌─────────────┐        ┌─────────────┐
//!   │   Flusher   │ ─────> │  LogShipper │  (HTTP push, retries)
//!   └─────────────┘        └──────┬──────┘
//!                                 │
//!                                 v
//!                            Loki intake
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use loki_sdk::{Config, Fields, LokiSdk};
//!
//! # async fn example() -> Result<(), loki_sdk::ConfigError> {
//! let sdk = LokiSdk::new();
//! sdk.init(Config::new("checkout").with_environment("staging")).await?;
//!
//! let mut fields = Fields::new();
//! fields.insert("label_region".into(), "eu-west".into());
//! fields.insert("order_id".into(), 4711.into());
//! sdk.info("order placed", fields).await;
//!
//! // Before process exit: final flush + resource release.
//! sdk.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! Prefer constructing a [`LokiSdk`] per component and passing it
//! explicitly. For drop-in use, the free functions below operate on a
//! lazily created process-wide default instance.

pub mod buffer;
pub mod config;
pub mod entry;
pub mod error;
pub mod flusher;
pub mod sdk;
pub mod shipper;

pub use config::Config;
pub use entry::{Fields, Level, LogEntry};
pub use error::ConfigError;
pub use flusher::{Flusher, FlusherStatus};
pub use sdk::LokiSdk;
pub use shipper::{LogShipper, LokiShipper, RetryStrategy, ShipError};

use std::sync::OnceLock;

static DEFAULT_SDK: OnceLock<LokiSdk> = OnceLock::new();

/// Process-wide default instance, lazily created uninitialized.
///
/// All free functions in this crate resolve to it. Its lifecycle is:
/// created on first access, configured by [`init`], torn down once by
/// [`shutdown`].
pub fn default_sdk() -> &'static LokiSdk {
    DEFAULT_SDK.get_or_init(LokiSdk::new)
}

/// Initializes the default instance. See [`LokiSdk::init`].
pub async fn init(config: Config) -> Result<(), ConfigError> {
    default_sdk().init(config).await
}

/// Logs through the default instance. See [`LokiSdk::log`].
pub async fn log(level: Level, message: &str, fields: Fields) {
    default_sdk().log(level, message, fields).await;
}

pub async fn debug(message: &str, fields: Fields) {
    default_sdk().log(Level::Debug, message, fields).await;
}

pub async fn info(message: &str, fields: Fields) {
    default_sdk().log(Level::Info, message, fields).await;
}

pub async fn warning(message: &str, fields: Fields) {
    default_sdk().log(Level::Warning, message, fields).await;
}

pub async fn error(message: &str, fields: Fields) {
    default_sdk().log(Level::Error, message, fields).await;
}

pub async fn critical(message: &str, fields: Fields) {
    default_sdk().log(Level::Critical, message, fields).await;
}

/// Forces one drain+deliver pass on the default instance.
pub async fn flush() {
    default_sdk().flush().await;
}

/// Tears down the default instance: final flush, bounded-wait worker join,
/// connection release. Call once before process exit.
pub async fn shutdown() {
    default_sdk().shutdown().await;
}
