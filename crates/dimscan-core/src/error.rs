//! Error types for the dimscan job engine.
//!
//! Errors are split by where they surface: configuration loading, the job
//! engine contract, and pipeline faults that abort a whole job. Per-file
//! failures are not errors in this sense; they are
//! [`ProbeError`](crate::types::ProbeError) values carried through the result
//! stream and written to the error artifact.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for dimscan operations.
#[derive(Error, Debug)]
pub enum DimscanError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Job engine errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Pipeline faults
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors returned by the [`JobEngine`](crate::JobEngine) contract.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The job spec was rejected before the job was accepted.
    #[error("INVALID_SPEC: {0}")]
    InvalidSpec(String),

    /// No job with this id is known (never submitted, or evicted from history).
    #[error("NOT_FOUND: job {0}")]
    NotFound(String),

    /// The job has not completed, so its artifacts are not ready.
    #[error("NOT_READY: job {id} is {status}")]
    NotReady { id: String, status: String },

    /// The job completed but was configured not to produce this artifact.
    #[error("NOT_PRODUCED: job {id} did not produce the {kind} artifact")]
    NotProduced { id: String, kind: String },

    /// Failed to prepare or open an artifact.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Faults that abort a whole job (SYSTEM_FAULT).
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The scan root could not be walked.
    #[error("Cannot read scan root {path}: {message}")]
    Root { path: PathBuf, message: String },

    /// Writing a report artifact failed.
    #[error("Report write failed for {path}: {message}")]
    Report { path: PathBuf, message: String },

    /// A pipeline task ended abnormally.
    #[error("Pipeline task failed in {stage}: {message}")]
    Task { stage: String, message: String },
}

/// Convenience type alias for dimscan results.
pub type Result<T> = std::result::Result<T, DimscanError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Convenience type alias for engine results.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
