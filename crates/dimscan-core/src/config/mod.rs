//! Configuration management for dimscan.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. All config structs implement `Default` with the values the
//! scanner has always used (330px target, 4 workers, `lte` mode).

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for dimscan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scan defaults
    pub scan: ScanConfig,

    /// Pipeline settings
    pub pipeline: PipelineConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Report output settings
    pub output: OutputConfig,

    /// Job registry settings
    pub jobs: JobsConfig,

    /// HTTP front-end settings
    pub server: ServerConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.dimscan.dimscan/config.toml
    /// - Linux: ~/.config/dimscan/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\dimscan\config\config.toml
    ///
    /// Falls back to ~/.dimscan/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "dimscan", "dimscan")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".dimscan").join("config.toml")
            })
    }

    /// Get the resolved report output directory (with ~ expansion).
    pub fn output_dir(&self) -> PathBuf {
        let path_str = self.output.dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MatchMode;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scan.default_workers, 4);
        assert_eq!(config.scan.default_target_dimension, 330);
        assert_eq!(config.scan.default_mode, MatchMode::Lte);
        assert_eq!(config.pipeline.buffer_size, 100);
        assert_eq!(config.jobs.history_capacity, 10);
        assert_eq!(config.server.port, 5001);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[scan]"));
        assert!(toml.contains("[output]"));
        assert!(toml.contains("default_mode = \"lte\""));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [scan]
            default_target_dimension = 512
            default_mode = "exact"

            [jobs]
            history_capacity = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.scan.default_target_dimension, 512);
        assert_eq!(config.scan.default_mode, MatchMode::Exact);
        assert_eq!(config.scan.default_workers, 4);
        assert_eq!(config.jobs.history_capacity, 3);
        assert_eq!(config.limits.probe_timeout_ms, 5000);
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pipeline]\nbuffer_size = 0\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("buffer_size"));
    }

    #[test]
    fn test_output_dir_expands_tilde() {
        let mut config = Config::default();
        config.output.dir = PathBuf::from("~/reports");
        let resolved = config.output_dir();
        assert!(!resolved.to_string_lossy().starts_with('~'));
        assert!(resolved.ends_with("reports"));
    }
}
