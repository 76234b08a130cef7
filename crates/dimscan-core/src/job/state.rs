//! Job specification and the job state machine.
//!
//! ```text
//! PENDING → RUNNING → COMPLETED
//!    │         │
//!    └─────────┴────→ ERROR (CANCELLED | SYSTEM_FAULT)
//! ```
//!
//! COMPLETED and ERROR are terminal. Once a job is terminal its counters,
//! status and timestamps never change again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::config::ScanConfig;
use crate::error::{EngineError, EngineResult};
use crate::output::ReportPaths;
use crate::pipeline::{progress_percent, ScanCounts};
use crate::types::{MatchMode, ScanSummary};

/// Opaque job identifier.
pub type JobId = uuid::Uuid;

/// What to scan and how to judge it. Immutable once a job is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Directory tree to scan
    pub root_directory: PathBuf,
    /// Target side length in pixels
    pub target_dimension: u32,
    /// Comparison policy
    pub mode: MatchMode,
    /// Concurrent probes
    pub worker_count: usize,
    /// Whether the matching-only artifact is written
    pub emit_filtered: bool,
}

impl JobSpec {
    /// A spec for `root` using the configured scan defaults.
    pub fn new(root: impl Into<PathBuf>, defaults: &ScanConfig) -> Self {
        Self {
            root_directory: root.into(),
            target_dimension: defaults.default_target_dimension,
            mode: defaults.default_mode,
            worker_count: defaults.default_workers,
            emit_filtered: true,
        }
    }

    /// Reject specs that can never run.
    pub fn validate(&self) -> EngineResult<()> {
        let root = &self.root_directory;
        if !root.exists() {
            return Err(EngineError::InvalidSpec(format!(
                "Directory does not exist: {}",
                root.display()
            )));
        }
        if !root.is_dir() {
            return Err(EngineError::InvalidSpec(format!(
                "Not a directory: {}",
                root.display()
            )));
        }
        if let Err(e) = std::fs::read_dir(root) {
            return Err(EngineError::InvalidSpec(format!(
                "Directory is not readable: {}: {e}",
                root.display()
            )));
        }
        if self.target_dimension == 0 {
            return Err(EngineError::InvalidSpec(
                "target_dimension must be > 0".to_string(),
            ));
        }
        if self.worker_count == 0 {
            return Err(EngineError::InvalidSpec(
                "worker_count must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Lifecycle position of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Running) | (Pending, Error) | (Running, Completed) | (Running, Error)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

/// Why a job ended in ERROR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// Cancelled on request
    Cancelled,
    /// A fault that stopped the pipeline as a whole
    SystemFault(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Cancelled => write!(f, "CANCELLED"),
            FailureReason::SystemFault(detail) => write!(f, "SYSTEM_FAULT: {detail}"),
        }
    }
}

/// Observable state of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub id: JobId,
    pub spec: JobSpec,
    pub status: JobStatus,

    /// Outcomes received so far
    pub scanned_count: u64,
    /// Records matching the criterion
    pub matched_count: u64,
    /// Probe failures
    pub errored_count: u64,

    /// Exact number of candidate files, once counted
    pub total_estimate: Option<u64>,
    /// Percentage in [0, 100]; `None` while the total is unknown
    pub progress: Option<f64>,

    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,

    /// Set on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ScanSummary>,

    /// Artifact locations, present once COMPLETED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<ReportPaths>,
}

impl JobState {
    /// A freshly accepted job.
    pub fn new(id: JobId, spec: JobSpec) -> Self {
        Self {
            id,
            spec,
            status: JobStatus::Pending,
            scanned_count: 0,
            matched_count: 0,
            errored_count: 0,
            total_estimate: None,
            progress: None,
            submitted_at: Utc::now(),
            started_at: None,
            finished_at: None,
            failure_reason: None,
            summary: None,
            artifacts: None,
        }
    }

    fn transition(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            tracing::debug!("Job {} ignoring {} -> {}", self.id, self.status, next);
            return false;
        }
        self.status = next;
        let now = Utc::now();
        match next {
            JobStatus::Running => self.started_at = Some(now),
            s if s.is_terminal() => self.finished_at = Some(now),
            _ => {}
        }
        true
    }

    /// PENDING → RUNNING.
    pub fn start(&mut self) -> bool {
        self.transition(JobStatus::Running)
    }

    /// Record the exact candidate total once planning has counted it.
    pub fn set_total(&mut self, total: u64) {
        if self.status.is_terminal() {
            return;
        }
        self.total_estimate = Some(total);
        self.progress = progress_percent(self.scanned_count, self.total_estimate);
    }

    /// Publish the aggregator's counters. Ignored once terminal.
    pub fn record(&mut self, counts: ScanCounts) {
        if self.status.is_terminal() {
            return;
        }
        self.scanned_count = counts.scanned;
        self.matched_count = counts.matched;
        self.errored_count = counts.errored;
        self.progress = progress_percent(self.scanned_count, self.total_estimate);
    }

    /// RUNNING → COMPLETED, publishing the finished artifacts.
    pub fn complete(&mut self, summary: ScanSummary, artifacts: ReportPaths) -> bool {
        if !self.transition(JobStatus::Completed) {
            return false;
        }
        self.progress = progress_percent(self.scanned_count, self.total_estimate);
        self.summary = Some(summary);
        self.artifacts = Some(artifacts);
        true
    }

    /// PENDING/RUNNING → ERROR.
    pub fn fail(&mut self, reason: FailureReason) -> bool {
        if !self.transition(JobStatus::Error) {
            return false;
        }
        self.failure_reason = Some(reason);
        true
    }

    /// Counters as an aggregate, for the scan summary.
    pub fn counts(&self) -> ScanCounts {
        ScanCounts {
            scanned: self.scanned_count,
            matched: self.matched_count,
            errored: self.errored_count,
        }
    }
}
