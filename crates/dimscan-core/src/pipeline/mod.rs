//! Scan pipeline components.
//!
//! This module contains the stages a scan job flows through:
//! - **discovery**: Plan the candidate files under a root
//! - **validate**: Header sniffing before the decoder runs
//! - **probe**: Read dimensions and size of one file
//! - **matcher**: Apply the dimension criterion
//! - **pool**: Probe planned paths concurrently
//! - **aggregator**: Fold outcomes into counters and report rows
//! - **channel**: Bounded channels for backpressure

pub mod aggregator;
pub mod channel;
pub mod discovery;
pub mod matcher;
pub mod pool;
pub mod probe;
pub mod validate;

// Re-exports for convenient access
pub use aggregator::{progress_percent, Aggregator, ScanCounts};
pub use discovery::{Plan, ScanPlanner};
pub use matcher::{DimensionHits, DimensionMatcher};
pub use pool::{dispatch, CancelFlag, WorkerPool};
pub use probe::ImageProbe;
pub use validate::{HeaderKind, Validator};
