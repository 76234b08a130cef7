//! Dimscan Core - find images by pixel dimension across a directory tree.
//!
//! A scan job walks a directory, reads each image's width and height from its
//! header, classifies it against a target dimension, and streams the results
//! into CSV reports while progress is observable.
//!
//! # Architecture
//!
//! ```text
//! Plan → WorkerPool (Probe) → Aggregator (Match) → CSV reports
//!                    ↑                 │
//!               CancelFlag         JobState
//! ```
//!
//! Per-file failures never abort a job; they are counted and written to the
//! error report. Only a fault that stops the pipeline as a whole ends a job in
//! `ERROR`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dimscan_core::{Config, JobEngine, JobSpec};
//!
//! #[tokio::main]
//! async fn main() -> dimscan_core::Result<()> {
//!     let config = Config::load()?;
//!     let engine = JobEngine::new(config.clone());
//!
//!     let id = engine.submit(JobSpec::new("./photos", &config.scan))?;
//!     let state = engine.wait(&id).await?;
//!     println!("{} of {} images match", state.matched_count, state.scanned_count);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{
    ConfigError, DimscanError, EngineError, EngineResult, PipelineError, PipelineResult, Result,
};
pub use job::{
    Artifact, FailureReason, JobEngine, JobId, JobSpec, JobState, JobStatus, ReportOverrides,
};
pub use output::{ArtifactKind, ReportPaths};
pub use pipeline::{DimensionMatcher, ImageProbe, ScanCounts, ScanPlanner};
pub use types::{ImageRecord, MatchMode, ProbeError, ProbeFailure, ScanSummary};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
