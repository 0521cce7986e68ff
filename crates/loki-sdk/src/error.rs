/// Errors surfaced by SDK initialization.
///
/// Delivery failures are deliberately absent here: they are caught at the
/// flush boundary and logged, never returned to producers. See
/// [`crate::shipper::ShipError`] for the delivery-side taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("app_name must not be empty")]
    MissingAppName,

    #[error("environment must not be empty")]
    MissingEnvironment,

    #[error("endpoint must not be empty")]
    MissingEndpoint,

    #[error("buffer_capacity must be greater than zero")]
    ZeroBufferCapacity,

    #[error("flush_interval must be greater than zero")]
    ZeroFlushInterval,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ConfigError::MissingAppName;
        assert_eq!(error.to_string(), "app_name must not be empty");
    }

    #[test]
    fn test_error_debug() {
        let error = ConfigError::ZeroBufferCapacity;
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("ZeroBufferCapacity"));
    }

    #[test]
    fn test_all_error_variants() {
        // Ensure all variants can be constructed
        let _e1 = ConfigError::MissingAppName;
        let _e2 = ConfigError::MissingEnvironment;
        let _e3 = ConfigError::MissingEndpoint;
        let _e4 = ConfigError::ZeroBufferCapacity;
        let _e5 = ConfigError::ZeroFlushInterval;
    }
}
