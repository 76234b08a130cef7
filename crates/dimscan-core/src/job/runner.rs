//! Drives one job from PENDING to a terminal state.

use std::sync::Arc;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::output::{ReportPaths, ReportSinks};
use crate::pipeline::{dispatch, Aggregator, ImageProbe, ScanPlanner, WorkerPool};
use crate::pipeline::channel::bounded_channel;
use crate::types::ScanSummary;

use super::state::FailureReason;
use super::store::JobHandle;

/// Runs the scan pipeline for one job handle.
pub(crate) struct JobRunner {
    config: Config,
    handle: Arc<JobHandle>,
}

impl JobRunner {
    pub(crate) fn new(config: Config, handle: Arc<JobHandle>) -> Self {
        Self { config, handle }
    }

    /// Execute the job. Always leaves the job terminal and finished.
    pub(crate) async fn run(self) {
        let handle = self.handle.clone();
        let snapshot = handle.snapshot();
        let id = snapshot.id;

        if !handle.update(|s| s.start()) {
            // Cancelled while pending
            tracing::info!("Job {} cancelled before start", id);
            handle.reports().remove_all();
            handle.mark_finished();
            return;
        }

        tracing::info!(
            "Job {} started: {:?} ({}{}px, {} workers)",
            id,
            snapshot.spec.root_directory,
            snapshot.spec.mode.symbol(),
            snapshot.spec.target_dimension,
            snapshot.spec.worker_count
        );

        let reports = handle.reports().clone();
        let result = self.execute(&reports).await;
        let cancelled = handle.cancel_flag().is_cancelled();

        let completed = match result {
            Ok(summary) if !cancelled => {
                handle.update(|s| s.complete(summary, reports.clone()))
            }
            Ok(_) => {
                handle.update(|s| s.fail(FailureReason::Cancelled));
                false
            }
            Err(e) => {
                tracing::error!("Job {} failed: {}", id, e);
                handle.update(|s| s.fail(FailureReason::SystemFault(e.to_string())));
                false
            }
        };

        let final_state = handle.snapshot();
        if completed {
            tracing::info!(
                "Job {} completed: {} scanned, {} matched, {} errors",
                id,
                final_state.scanned_count,
                final_state.matched_count,
                final_state.errored_count
            );
        } else {
            tracing::info!(
                "Job {} ended in error ({}); removing partial artifacts",
                id,
                final_state
                    .failure_reason
                    .as_ref()
                    .map(|r| r.to_string())
                    .unwrap_or_default()
            );
            reports.remove_all();
        }

        handle.mark_finished();
    }

    async fn execute(&self, artifacts: &ReportPaths) -> PipelineResult<ScanSummary> {
        let spec = self.handle.snapshot().spec;
        let cancel = self.handle.cancel_flag().clone();
        let planner = ScanPlanner::new(&self.config.scan);

        // Exact total from a full planning pass
        let total = {
            let planner = planner.clone();
            let root = spec.root_directory.clone();
            tokio::task::spawn_blocking(move || planner.count(&root))
                .await
                .map_err(|e| task_error("count", e))??
        };
        tracing::info!("Found {} image files to analyze", total);
        self.handle.update(|s| s.set_total(total));

        let sinks = ReportSinks::create(artifacts).map_err(|e| PipelineError::Report {
            path: artifacts.all.clone(),
            message: e.to_string(),
        })?;
        let mut aggregator = Aggregator::new(spec.target_dimension, spec.mode, sinks);

        let (paths_tx, paths_rx) = bounded_channel(&self.config.pipeline);
        let pool = WorkerPool::new(
            spec.worker_count,
            &self.config.pipeline,
            ImageProbe::new(self.config.limits.clone()),
            cancel.clone(),
        );
        let mut results = pool.run(paths_rx);

        let dispatcher = {
            let plan = planner.plan(&spec.root_directory);
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || dispatch(plan, total, paths_tx, &cancel))
        };

        while let Some(outcome) = results.recv().await {
            if let Err(e) = aggregator.ingest(outcome) {
                // Dropping the receiver stops the workers
                return Err(PipelineError::Report {
                    path: artifacts.all.clone(),
                    message: e.to_string(),
                });
            }
            let counts = aggregator.counts();
            self.handle.update(|s| s.record(counts));
        }

        let dispatched = dispatcher.await.map_err(|e| task_error("dispatch", e))??;
        tracing::debug!("Dispatched {} of {} planned files", dispatched, total);

        // The root must outlive the scan; losing it mid-run is a job fault
        if let Err(e) = std::fs::read_dir(&spec.root_directory) {
            return Err(PipelineError::Root {
                path: spec.root_directory.clone(),
                message: e.to_string(),
            });
        }

        let (counts, summary, _) = aggregator.finish().map_err(|e| PipelineError::Report {
            path: artifacts.all.clone(),
            message: e.to_string(),
        })?;
        self.handle.update(|s| s.record(counts));

        Ok(summary)
    }
}

fn task_error(stage: &str, e: tokio::task::JoinError) -> PipelineError {
    PipelineError::Task {
        stage: stage.to_string(),
        message: e.to_string(),
    }
}
