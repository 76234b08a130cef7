//! Bounded worker pool that probes planned paths concurrently.
//!
//! Paths arrive on a bounded channel fed by the planner; `worker_count`
//! workers each claim the next unclaimed path and probe it on the blocking
//! thread pool. Outcomes are delivered unordered on a second channel, which
//! closes only after every worker has exited, so consumers see the pool fully
//! drained when the stream ends.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::types::ProbeOutcome;

use super::channel::{bounded_channel, SharedReceiver};
use super::discovery::Plan;
use super::probe::ImageProbe;

/// Cooperative cancellation flag shared by a job's dispatcher and workers.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Concurrent probe executor.
pub struct WorkerPool {
    workers: usize,
    config: PipelineConfig,
    probe: ImageProbe,
    cancel: CancelFlag,
}

impl WorkerPool {
    /// Create a pool with `workers` concurrent probes (at least one).
    pub fn new(
        workers: usize,
        config: &PipelineConfig,
        probe: ImageProbe,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            workers: workers.max(1),
            config: config.clone(),
            probe,
            cancel,
        }
    }

    /// Spawn the workers and return the outcome stream.
    ///
    /// Once cancellation is observed a worker stops claiming paths; a probe
    /// already in flight still finishes and is delivered.
    pub fn run(self, paths: mpsc::Receiver<PathBuf>) -> mpsc::Receiver<ProbeOutcome> {
        let (results_tx, results_rx) = bounded_channel(&self.config);
        let paths = SharedReceiver::new(paths);

        for worker_id in 0..self.workers {
            let paths = paths.clone();
            let results = results_tx.clone();
            let probe = self.probe.clone();
            let cancel = self.cancel.clone();

            tokio::spawn(async move {
                let mut probed = 0usize;
                while let Some(path) = paths.recv().await {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let outcome = probe.probe_with_timeout(path).await;
                    probed += 1;
                    if results.send(outcome).await.is_err() {
                        // Aggregator gone, stop claiming work
                        break;
                    }
                }
                tracing::trace!("Worker {} exiting after {} probes", worker_id, probed);
            });
        }

        results_rx
    }
}

/// Feed planned paths to the pool. Runs on a blocking thread.
///
/// Dispatches at most `limit` paths and stops early on cancellation or when
/// the pool hangs up. A fault reading the scan root is returned as an error.
pub fn dispatch(
    plan: Plan,
    limit: u64,
    paths: mpsc::Sender<PathBuf>,
    cancel: &CancelFlag,
) -> PipelineResult<u64> {
    let mut sent = 0u64;
    for entry in plan {
        let path = entry?;
        if cancel.is_cancelled() || sent >= limit {
            break;
        }
        if paths.blocking_send(path).is_err() {
            break;
        }
        sent += 1;
    }
    Ok(sent)
}
