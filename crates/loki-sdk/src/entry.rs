//! Structured log entries and label composition.
//!
//! An entry is built once per log call and is immutable afterwards: it sits
//! in the buffer until a flush drains it, then it is handed to the shipper
//! and discarded. Construction is pure, with no queue or network side
//! effects.
//!
//! # Label composition
//!
//! Every entry carries two key/value collections:
//!
//! - **labels**: string pairs the backend indexes on. Seeded with `app`,
//!   `environment`, and `level`, then extended from the caller's fields.
//! - **metadata**: free-form JSON values kept verbatim, informational only.
//!
//! Caller fields are routed by key:
//!
//! 1. A key starting with `label_` becomes a label with the prefix stripped
//!    and the value coerced to a string.
//! 2. A key named exactly `labels` whose value is a JSON object is merged
//!    into the label set, overwriting on collision.
//! 3. Everything else lands in metadata untouched.
//!
//! Fields iterate in map order, which places `label_x` before `labels`; an
//! explicit `labels` object therefore wins a key collision. That precedence
//! is pinned by test, not left to chance.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

/// Extra arguments attached to a log call, routed into labels or metadata.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    /// Uppercase name as it appears in the `level` label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown level name.
#[derive(Debug, thiserror::Error)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(String);

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Case-insensitive parse, normalizing to the five canonical levels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARNING" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" => Ok(Level::Critical),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// A single structured log entry awaiting delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// When the log call happened.
    pub timestamp: SystemTime,
    pub level: Level,
    pub message: String,
    /// Indexed key/value pairs. Always contains `app`, `environment`, `level`.
    pub labels: BTreeMap<String, String>,
    /// Free-form values carried alongside the entry, not used for routing.
    pub metadata: Fields,
}

impl LogEntry {
    /// Builds an entry from a log call, applying the label composition rules
    /// described in the module docs.
    ///
    /// Unknown or oddly-shaped fields are accepted permissively: a `labels`
    /// field that is not a JSON object simply lands in metadata.
    #[must_use]
    pub fn build(
        level: Level,
        message: &str,
        fields: Fields,
        app_name: &str,
        environment: &str,
    ) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), app_name.to_string());
        labels.insert("environment".to_string(), environment.to_string());
        labels.insert("level".to_string(), level.to_string());

        let mut metadata = Fields::new();
        for (key, value) in fields {
            if key == "labels" {
                if let serde_json::Value::Object(map) = value {
                    for (k, v) in map {
                        labels.insert(k, coerce_label_value(&v));
                    }
                } else {
                    metadata.insert(key, value);
                }
            } else if let Some(label_key) = key.strip_prefix("label_") {
                labels.insert(label_key.to_string(), coerce_label_value(&value));
            } else {
                metadata.insert(key, value);
            }
        }

        LogEntry {
            timestamp: SystemTime::now(),
            level,
            message: message.to_string(),
            labels,
            metadata,
        }
    }
}

/// Label values are always strings; JSON strings are taken as-is, everything
/// else keeps its JSON rendering.
fn coerce_label_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
