//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.default_workers == 0 {
            return Err(ConfigError::ValidationError(
                "scan.default_workers must be > 0".into(),
            ));
        }
        if self.scan.default_target_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "scan.default_target_dimension must be > 0".into(),
            ));
        }
        if self.scan.supported_formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "scan.supported_formats must not be empty".into(),
            ));
        }
        if self.pipeline.buffer_size == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.buffer_size must be > 0".into(),
            ));
        }
        if self.limits.probe_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.probe_timeout_ms must be > 0".into(),
            ));
        }
        if self.jobs.history_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "jobs.history_capacity must be > 0".into(),
            ));
        }
        if self.output.prefix.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "output.prefix must not be empty".into(),
            ));
        }
        Ok(())
    }
}
