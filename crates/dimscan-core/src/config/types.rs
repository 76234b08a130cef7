//! Sub-configuration structs with the scanner's defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::MatchMode;

/// Image extensions the planner considers, compared case-insensitively.
pub const DEFAULT_SUPPORTED_FORMATS: [&str; 8] =
    ["jpg", "jpeg", "png", "tiff", "tif", "bmp", "gif", "webp"];

/// Scan defaults applied when a request leaves a field unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Target dimension in pixels
    pub default_target_dimension: u32,

    /// Match mode ("lte" or "exact")
    pub default_mode: MatchMode,

    /// Number of parallel probe workers
    pub default_workers: usize,

    /// Supported input extensions
    pub supported_formats: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            default_target_dimension: 330,
            default_mode: MatchMode::Lte,
            default_workers: 4,
            supported_formats: DEFAULT_SUPPORTED_FORMATS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Pipeline settings for backpressure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Max paths and outcomes buffered between pipeline stages
    pub buffer_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { buffer_size: 100 }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Per-file probe timeout in milliseconds
    pub probe_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 5000,
        }
    }
}

/// Report artifact settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory where job artifacts are written
    pub dir: PathBuf,

    /// File name prefix for generated artifacts
    pub prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("analysis_results"),
            prefix: "image_analysis".to_string(),
        }
    }
}

/// Job registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Number of jobs kept in the recent-jobs history
    pub history_capacity: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            history_capacity: 10,
        }
    }
}

/// HTTP front-end settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port (5001 avoids the AirPlay receiver on macOS)
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
