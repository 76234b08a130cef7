//! Scan jobs: specification, lifecycle, registry and the engine facade.

pub mod engine;
mod runner;
pub mod state;
pub mod store;

pub use engine::{Artifact, JobEngine, ReportOverrides};
pub use state::{FailureReason, JobId, JobSpec, JobState, JobStatus};
pub use store::{JobHandle, JobStore};
