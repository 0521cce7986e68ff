use crate::error::ConfigError;
use std::time::Duration;

/// Default Loki push endpoint for a local Loki instance.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3100/loki/api/v1/push";

/// Default number of entries held in the offline buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1000;

/// Default wake period for the background flush loop.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Default retry budget for a failed batch delivery.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Configuration snapshot for one SDK instance.
///
/// Built once, validated by [`Config::validate`], and immutable afterwards:
/// `init` stores it behind an `Arc` and every component reads from that
/// shared snapshot.
#[derive(Debug, Clone)]
pub struct Config {
    /// Application name, attached as the `app` label to every entry.
    pub app_name: String,
    /// Deployment environment (production, staging, ...), attached as the
    /// `environment` label.
    pub environment: String,
    /// Loki push URL.
    pub endpoint: String,
    /// On the buffer-bypass path, send fire-and-forget instead of awaiting
    /// delivery inline. Ignored while the offline buffer is enabled.
    pub use_send_beacon: bool,
    /// Queue entries for batched background delivery instead of sending at
    /// call time.
    pub enable_offline_buffer: bool,
    /// Maximum number of entries held before drop-oldest eviction kicks in.
    pub buffer_capacity: usize,
    /// Wake period of the background flush loop.
    pub flush_interval: Duration,
    /// How many times a failed batch is retried before being dropped.
    pub max_retries: u32,
}

impl Config {
    /// Creates a configuration for the given application with defaults for
    /// everything else.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            environment: "production".to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            use_send_beacon: true,
            enable_offline_buffer: true,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_send_beacon(mut self, use_send_beacon: bool) -> Self {
        self.use_send_beacon = use_send_beacon;
        self
    }

    #[must_use]
    pub fn with_offline_buffer(mut self, enable_offline_buffer: bool) -> Self {
        self.enable_offline_buffer = enable_offline_buffer;
        self
    }

    #[must_use]
    pub fn with_buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    #[must_use]
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_name.trim().is_empty() {
            return Err(ConfigError::MissingAppName);
        }
        if self.environment.trim().is_empty() {
            return Err(ConfigError::MissingEnvironment);
        }
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroBufferCapacity);
        }
        if self.flush_interval.is_zero() {
            return Err(ConfigError::ZeroFlushInterval);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::new("my-app");
        assert!(config.validate().is_ok());
        assert_eq!(config.environment, "production");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.use_send_beacon);
        assert!(config.enable_offline_buffer);
        assert_eq!(config.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
        assert_eq!(config.flush_interval, DEFAULT_FLUSH_INTERVAL);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_validate_empty_app_name() {
        assert!(matches!(
            Config::new("").validate(),
            Err(ConfigError::MissingAppName)
        ));
        assert!(matches!(
            Config::new("   ").validate(),
            Err(ConfigError::MissingAppName)
        ));
    }

    #[test]
    fn test_validate_empty_environment() {
        let config = Config::new("my-app").with_environment("");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEnvironment)
        ));
    }

    #[test]
    fn test_validate_empty_endpoint() {
        let config = Config::new("my-app").with_endpoint("");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEndpoint)
        ));
    }

    #[test]
    fn test_validate_zero_buffer_capacity() {
        let config = Config::new("my-app").with_buffer_capacity(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroBufferCapacity)
        ));
    }

    #[test]
    fn test_validate_zero_flush_interval() {
        let config = Config::new("my-app").with_flush_interval(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroFlushInterval)
        ));
    }

    #[test]
    fn test_builder_setters() {
        let config = Config::new("my-app")
            .with_environment("staging")
            .with_endpoint("http://loki:3100/loki/api/v1/push")
            .with_send_beacon(false)
            .with_offline_buffer(false)
            .with_buffer_capacity(50)
            .with_flush_interval(Duration::from_secs(1))
            .with_max_retries(0);

        assert_eq!(config.environment, "staging");
        assert_eq!(config.endpoint, "http://loki:3100/loki/api/v1/push");
        assert!(!config.use_send_beacon);
        assert!(!config.enable_offline_buffer);
        assert_eq!(config.buffer_capacity, 50);
        assert_eq!(config.flush_interval, Duration::from_secs(1));
        assert_eq!(config.max_retries, 0);
        assert!(config.validate().is_ok());
    }
}
