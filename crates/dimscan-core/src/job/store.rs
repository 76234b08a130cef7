//! Bounded registry of jobs.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::Notify;

use crate::output::ReportPaths;
use crate::pipeline::CancelFlag;

use super::state::{JobId, JobState, JobStatus};

/// Shared handle on one job: its state, where its reports go, its cancel flag
/// and a completion signal for waiters.
#[derive(Debug)]
pub struct JobHandle {
    state: RwLock<JobState>,
    reports: ReportPaths,
    cancel: CancelFlag,
    finished: AtomicBool,
    notify: Notify,
}

impl JobHandle {
    pub fn new(state: JobState, reports: ReportPaths) -> Self {
        Self {
            state: RwLock::new(state),
            reports,
            cancel: CancelFlag::new(),
            finished: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn id(&self) -> JobId {
        self.snapshot().id
    }

    /// A consistent copy of the current state.
    pub fn snapshot(&self) -> JobState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status(&self) -> JobStatus {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    /// Mutate the state under the write lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut JobState) -> R) -> R {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Artifact locations, whether or not they have been written yet.
    pub fn reports(&self) -> &ReportPaths {
        &self.reports
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Signal that the job's pipeline has fully stopped and its artifacts
    /// are settled.
    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Wait until [`mark_finished`](Self::mark_finished) has been called and
    /// return the final state.
    pub async fn wait(&self) -> JobState {
        loop {
            let notified = self.notify.notified();
            if self.is_finished() {
                return self.snapshot();
            }
            notified.await;
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    jobs: HashMap<JobId, Arc<JobHandle>>,
    /// Newest first
    order: VecDeque<JobId>,
}

/// Keeps at most `capacity` finished jobs. Live jobs are never evicted, so
/// the store can grow past capacity until they reach a terminal state.
#[derive(Debug)]
pub struct JobStore {
    inner: Mutex<Registry>,
    capacity: usize,
}

impl JobStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Registry::default()),
            capacity: capacity.max(1),
        }
    }

    /// Register a job, then trim the history.
    pub fn insert(&self, handle: Arc<JobHandle>) {
        let id = handle.id();
        let mut registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        registry.jobs.insert(id, handle);
        registry.order.push_front(id);
        Self::evict(&mut registry, self.capacity);
    }

    /// Evict the oldest terminal jobs beyond capacity.
    pub fn trim(&self) {
        let mut registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Self::evict(&mut registry, self.capacity);
    }

    fn evict(registry: &mut Registry, capacity: usize) {
        while registry.order.len() > capacity {
            let oldest_terminal = registry.order.iter().rposition(|id| {
                registry
                    .jobs
                    .get(id)
                    .map_or(true, |h| h.status().is_terminal())
            });
            let Some(index) = oldest_terminal else {
                break;
            };
            if let Some(evicted) = registry.order.remove(index) {
                registry.jobs.remove(&evicted);
                tracing::debug!("Evicted job {} from history", evicted);
            }
        }
    }

    pub fn get(&self, id: &JobId) -> Option<Arc<JobHandle>> {
        let registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        registry.jobs.get(id).cloned()
    }

    /// Snapshots of up to `limit` jobs, most recently submitted first.
    pub fn recent(&self, limit: usize) -> Vec<JobState> {
        let handles: Vec<Arc<JobHandle>> = {
            let registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            registry
                .order
                .iter()
                .take(limit)
                .filter_map(|id| registry.jobs.get(id).cloned())
                .collect()
        };
        handles.iter().map(|h| h.snapshot()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .jobs
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
