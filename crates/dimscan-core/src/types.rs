//! Core data types for the dimscan pipeline.
//!
//! These types flow from the probe through the aggregator into the report
//! artifacts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Bytes per megabyte used for `file_size_mb`.
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Dimensions and size of one successfully probed image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Path to the source file as discovered
    pub file_path: PathBuf,

    /// Just the filename portion
    pub filename: String,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Whether the image satisfies the job's dimension criterion.
    /// Always `false` when it leaves the probe; set by the aggregator.
    pub matches: bool,

    /// File size in bytes, as reported by the filesystem
    pub file_size_bytes: u64,

    /// File size in megabytes (1 MB = 1024 * 1024 bytes)
    pub file_size_mb: f64,

    /// Detected format ("jpeg", "png", "webp", etc.)
    pub format: String,
}

/// Why a single file could not be probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProbeFailure {
    /// Permission denied when opening or stat-ing the file
    Unreadable,
    /// The content is an image container the reader cannot decode
    Unsupported,
    /// Header is corrupt or the decoder rejected it
    DecodeFailure,
    /// File missing, read failure or timeout
    IoError,
}

impl ProbeFailure {
    /// The stable name written to the error artifact.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeFailure::Unreadable => "UNREADABLE",
            ProbeFailure::Unsupported => "UNSUPPORTED",
            ProbeFailure::DecodeFailure => "DECODE_FAILURE",
            ProbeFailure::IoError => "IO_ERROR",
        }
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-file probe failure. Recorded and skipped, never retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{reason} for {}: {detail}", .file_path.display())]
pub struct ProbeError {
    /// The file that failed
    pub file_path: PathBuf,
    /// Failure class
    pub reason: ProbeFailure,
    /// Human-readable detail from the underlying error
    pub detail: String,
}

impl ProbeError {
    pub fn new(
        file_path: impl Into<PathBuf>,
        reason: ProbeFailure,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            reason,
            detail: detail.into(),
        }
    }
}

/// What a worker reports for one planned path.
pub type ProbeOutcome = Result<ImageRecord, ProbeError>;

/// Policy for comparing an image's sides against the target dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Either side is less than or equal to the target
    #[default]
    Lte,
    /// Either side equals the target
    Exact,
}

impl MatchMode {
    /// Parse mode from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "lte" | "le" | "<=" => Some(Self::Lte),
            "exact" | "eq" | "=" => Some(Self::Exact),
            _ => None,
        }
    }

    /// Comparison symbol used in summaries ("≤330px", "=330px").
    pub fn symbol(&self) -> &'static str {
        match self {
            MatchMode::Lte => "≤",
            MatchMode::Exact => "=",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Lte => write!(f, "lte"),
            MatchMode::Exact => write!(f, "exact"),
        }
    }
}

/// Statistics gathered over a completed scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Matching images whose width satisfied the criterion
    pub width_hits: u64,

    /// Matching images whose height satisfied the criterion
    pub height_hits: u64,

    /// Total bytes across successfully probed images
    pub total_bytes: u64,
}
