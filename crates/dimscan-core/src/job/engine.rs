//! The job engine: submit, observe, cancel and collect scan jobs.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::output::{ArtifactKind, ReportPaths};

use super::runner::JobRunner;
use super::state::{FailureReason, JobId, JobSpec, JobState, JobStatus};
use super::store::{JobHandle, JobStore};

/// Caller-chosen artifact locations. Unset entries get generated names in
/// the configured output directory.
#[derive(Debug, Clone, Default)]
pub struct ReportOverrides {
    pub all: Option<PathBuf>,
    pub matching: Option<PathBuf>,
    pub errors: Option<PathBuf>,
}

/// A produced artifact of a completed job.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

impl Artifact {
    /// Open the artifact for streaming.
    pub fn open(&self) -> std::io::Result<std::fs::File> {
        std::fs::File::open(&self.path)
    }

    /// Read the whole artifact.
    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }

    /// File name for downloads.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.csv", self.kind))
    }
}

/// Accepts scan jobs and runs each on the tokio runtime.
///
/// Jobs are independent: each owns its pipeline, counters, sinks and cancel
/// flag. The engine must be used from within a tokio runtime.
#[derive(Clone)]
pub struct JobEngine {
    config: Arc<Config>,
    store: Arc<JobStore>,
}

impl JobEngine {
    pub fn new(config: Config) -> Self {
        let store = Arc::new(JobStore::new(config.jobs.history_capacity));
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Arc<JobStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validate and accept a job, writing artifacts to generated paths.
    pub fn submit(&self, spec: JobSpec) -> EngineResult<JobId> {
        self.submit_with_reports(spec, ReportOverrides::default())
    }

    /// Validate and accept a job with explicit artifact paths.
    ///
    /// Returns as soon as the job is registered; scanning happens in the
    /// background.
    pub fn submit_with_reports(
        &self,
        spec: JobSpec,
        overrides: ReportOverrides,
    ) -> EngineResult<JobId> {
        spec.validate()?;

        let id = uuid::Uuid::new_v4();
        let artifacts = self.report_paths(&spec, &id, overrides);
        tracing::debug!("Job {} artifacts: {:?}", id, artifacts);

        let handle = Arc::new(JobHandle::new(JobState::new(id, spec), artifacts));
        self.store.insert(handle.clone());

        let runner = JobRunner::new((*self.config).clone(), handle);
        let store = self.store.clone();
        tokio::spawn(async move {
            runner.run().await;
            store.trim();
        });

        tracing::info!("Submitted job {}", id);
        Ok(id)
    }

    fn report_paths(&self, spec: &JobSpec, id: &JobId, overrides: ReportOverrides) -> ReportPaths {
        let tag = id.simple().to_string();
        let generated = ReportPaths::generate(
            &self.config.output_dir(),
            &self.config.output.prefix,
            spec.target_dimension,
            spec.emit_filtered,
            &tag[..8],
            Utc::now(),
        );
        ReportPaths {
            all: overrides.all.unwrap_or(generated.all),
            matching: if spec.emit_filtered {
                overrides.matching.or(generated.matching)
            } else {
                None
            },
            errors: overrides.errors.unwrap_or(generated.errors),
        }
    }

    fn handle(&self, id: &JobId) -> EngineResult<Arc<JobHandle>> {
        self.store
            .get(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    /// Current state of a job.
    pub fn status(&self, id: &JobId) -> EngineResult<JobState> {
        Ok(self.handle(id)?.snapshot())
    }

    /// Request cancellation.
    ///
    /// A PENDING or RUNNING job moves to ERROR(CANCELLED) immediately and its
    /// workers stop claiming new paths. Cancelling a terminal job is a no-op.
    pub fn cancel(&self, id: &JobId) -> EngineResult<JobState> {
        let handle = self.handle(id)?;
        let cancelled = handle.update(|s| s.fail(FailureReason::Cancelled));
        if cancelled {
            handle.cancel_flag().cancel();
            tracing::info!("Cancelled job {}", id);
        }
        Ok(handle.snapshot())
    }

    /// Location of one artifact of a completed job.
    pub fn artifacts(&self, id: &JobId, kind: ArtifactKind) -> EngineResult<Artifact> {
        let state = self.status(id)?;
        if state.status != JobStatus::Completed {
            return Err(EngineError::NotReady {
                id: id.to_string(),
                status: state.status.to_string(),
            });
        }
        let path = state
            .artifacts
            .as_ref()
            .and_then(|paths| paths.get(kind))
            .map(Path::to_path_buf)
            .ok_or_else(|| EngineError::NotProduced {
                id: id.to_string(),
                kind: kind.to_string(),
            })?;
        Ok(Artifact { kind, path })
    }

    /// Up to `limit` jobs, most recently submitted first.
    pub fn recent(&self, limit: usize) -> Vec<JobState> {
        self.store.recent(limit)
    }

    /// Wait for a job's pipeline to stop and return its final state.
    pub async fn wait(&self, id: &JobId) -> EngineResult<JobState> {
        let handle = self.handle(id)?;
        Ok(handle.wait().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MatchMode;
    use image::{Rgb, RgbImage};
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_image(path: &Path, width: u32, height: u32) {
        RgbImage::from_pixel(width, height, Rgb([200, 10, 10]))
            .save(path)
            .unwrap();
    }

    fn engine(out: &TempDir) -> JobEngine {
        let mut config = Config::default();
        config.output.dir = out.path().to_path_buf();
        JobEngine::new(config)
    }

    fn spec(root: &Path, target: u32, mode: MatchMode, workers: usize) -> JobSpec {
        JobSpec {
            root_directory: root.to_path_buf(),
            target_dimension: target,
            mode,
            worker_count: workers,
            emit_filtered: true,
        }
    }

    fn csv_rows(path: &Path) -> Vec<csv::StringRecord> {
        csv::Reader::from_path(path)
            .unwrap()
            .records()
            .map(|r| r.unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_corrupt_file_is_isolated() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        for i in 0..9 {
            write_image(&root.path().join(format!("img_{i}.png")), 330, 200);
        }
        std::fs::write(root.path().join("broken.jpg"), b"not an image at all").unwrap();

        let engine = engine(&out);
        let id = engine
            .submit(spec(root.path(), 330, MatchMode::Exact, 4))
            .unwrap();
        let state = engine.wait(&id).await.unwrap();

        assert_eq!(state.status, JobStatus::Completed);
        assert_eq!(state.scanned_count, 10);
        assert_eq!(state.matched_count, 9);
        assert_eq!(state.errored_count, 1);
        assert_eq!(state.total_estimate, Some(10));
        assert_eq!(state.progress, Some(100.0));

        let errors = engine.artifacts(&id, ArtifactKind::Errors).unwrap();
        let rows = csv_rows(&errors.path);
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1], "DECODE_FAILURE");
        assert!(rows[0][0].ends_with("broken.jpg"));

        let summary = state.summary.unwrap();
        assert_eq!(summary.width_hits, 9);
        assert_eq!(summary.height_hits, 0);
    }

    #[tokio::test]
    async fn test_artifact_rows_match_counts() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_image(&root.path().join("small.png"), 200, 150);
        write_image(&root.path().join("large.png"), 800, 600);
        std::fs::create_dir(root.path().join("nested")).unwrap();
        write_image(&root.path().join("nested/tall.png"), 500, 200);
        std::fs::write(root.path().join("notes.txt"), "ignored").unwrap();

        let engine = engine(&out);
        let id = engine
            .submit(spec(root.path(), 330, MatchMode::Lte, 2))
            .unwrap();
        let state = engine.wait(&id).await.unwrap();
        assert_eq!(state.status, JobStatus::Completed);
        assert_eq!(state.scanned_count, 3);
        assert_eq!(state.matched_count, 2);

        let all = engine.artifacts(&id, ArtifactKind::All).unwrap();
        let matching = engine.artifacts(&id, ArtifactKind::Matching).unwrap();
        let errors = engine.artifacts(&id, ArtifactKind::Errors).unwrap();

        let all_rows = csv_rows(&all.path);
        assert_eq!(
            all_rows.len() as u64 + state.errored_count,
            state.scanned_count
        );
        assert_eq!(csv_rows(&matching.path).len() as u64, state.matched_count);
        assert_eq!(csv_rows(&errors.path).len(), 0);
        assert!(all_rows.iter().all(|r| (&r[4] == "true") == {
            let w: u32 = r[2].parse().unwrap();
            let h: u32 = r[3].parse().unwrap();
            w <= 330 || h <= 330
        }));
        assert!(matching.file_name().starts_with("image_analysis_330px_"));
    }

    #[tokio::test]
    async fn test_empty_directory_completes() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let engine = engine(&out);

        let id = engine
            .submit(spec(root.path(), 330, MatchMode::Lte, 4))
            .unwrap();
        let state = engine.wait(&id).await.unwrap();

        assert_eq!(state.status, JobStatus::Completed);
        assert_eq!(state.scanned_count, 0);
        assert_eq!(state.total_estimate, Some(0));
        assert_eq!(state.progress, Some(100.0));

        let all = engine.artifacts(&id, ArtifactKind::All).unwrap();
        let content = String::from_utf8(all.read().unwrap()).unwrap();
        assert_eq!(
            content,
            "file_path,filename,width,height,has_target_dimension,file_size_mb\n"
        );
    }

    #[tokio::test]
    async fn test_worker_count_does_not_change_results() {
        let root = tempfile::tempdir().unwrap();
        for (i, (w, h)) in [(100, 100), (330, 500), (640, 480), (331, 331), (50, 900)]
            .into_iter()
            .enumerate()
        {
            write_image(&root.path().join(format!("{i}.png")), w, h);
        }
        std::fs::write(root.path().join("bad.png"), b"\x89PNG\r\n\x1a\ntruncated").unwrap();

        let mut results = Vec::new();
        for workers in [1, 8] {
            let out = tempfile::tempdir().unwrap();
            let engine = engine(&out);
            let id = engine
                .submit(spec(root.path(), 330, MatchMode::Lte, workers))
                .unwrap();
            let state = engine.wait(&id).await.unwrap();
            let all = engine.artifacts(&id, ArtifactKind::All).unwrap();
            let mut rows: Vec<Vec<String>> = csv_rows(&all.path)
                .iter()
                .map(|r| r.iter().map(str::to_string).collect())
                .collect();
            rows.sort();
            results.push((state.scanned_count, state.matched_count, state.errored_count, rows));
        }

        assert_eq!(results[0], results[1]);
        assert_eq!(results[0].0, 6);
        assert_eq!(results[0].1, 3);
        assert_eq!(results[0].2, 1);
    }

    #[tokio::test]
    async fn test_repeat_scan_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_image(&root.path().join("a.png"), 330, 10);
        write_image(&root.path().join("b.png"), 900, 900);
        let engine = engine(&out);

        let mut counts = Vec::new();
        for _ in 0..2 {
            let id = engine
                .submit(spec(root.path(), 330, MatchMode::Lte, 3))
                .unwrap();
            let state = engine.wait(&id).await.unwrap();
            counts.push((state.scanned_count, state.matched_count, state.errored_count));
        }
        assert_eq!(counts[0], counts[1]);
        assert_eq!(engine.recent(10).len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_is_terminal_and_removes_artifacts() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        for i in 0..40 {
            write_image(&root.path().join(format!("{i}.png")), 64, 64);
        }
        let engine = engine(&out);

        let id = engine
            .submit(spec(root.path(), 330, MatchMode::Lte, 1))
            .unwrap();
        let cancelled = engine.cancel(&id).unwrap();
        assert_eq!(cancelled.status, JobStatus::Error);
        assert_eq!(cancelled.failure_reason, Some(FailureReason::Cancelled));

        let state = engine.wait(&id).await.unwrap();
        assert_eq!(state.status, JobStatus::Error);
        assert!(state.scanned_count <= 40);

        // Stays terminal and frozen
        tokio::time::sleep(Duration::from_millis(50)).await;
        let later = engine.status(&id).unwrap();
        assert_eq!(later, state);

        // Cancelling again is a no-op
        assert_eq!(engine.cancel(&id).unwrap(), state);

        assert!(matches!(
            engine.artifacts(&id, ArtifactKind::All),
            Err(EngineError::NotReady { .. })
        ));
        assert!(state.artifacts.is_none());
        let leftovers = std::fs::read_dir(out.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    /// A job slow enough to observe mid-run: one worker, one-slot queues.
    fn slow_engine(out: &TempDir) -> JobEngine {
        let mut config = Config::default();
        config.output.dir = out.path().to_path_buf();
        config.pipeline.buffer_size = 1;
        JobEngine::new(config)
    }

    async fn wait_for_progress(engine: &JobEngine, id: &JobId, scanned: u64) {
        loop {
            let state = engine.status(id).unwrap();
            if state.scanned_count >= scanned || state.status.is_terminal() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_running_job() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        for i in 0..300 {
            write_image(&root.path().join(format!("{i}.png")), 8, 8);
        }
        let engine = slow_engine(&out);

        let id = engine
            .submit(spec(root.path(), 330, MatchMode::Lte, 1))
            .unwrap();
        wait_for_progress(&engine, &id, 1).await;
        assert_eq!(engine.status(&id).unwrap().status, JobStatus::Running);

        let cancelled = engine.cancel(&id).unwrap();
        assert_eq!(cancelled.failure_reason, Some(FailureReason::Cancelled));

        let state = engine.wait(&id).await.unwrap();
        assert_eq!(state.status, JobStatus::Error);
        assert_eq!(state.failure_reason, Some(FailureReason::Cancelled));
        assert!(state.started_at.is_some());
        assert!(state.scanned_count > 0);
        assert!(state.scanned_count < state.total_estimate.unwrap());
        assert!(matches!(
            engine.artifacts(&id, ArtifactKind::All),
            Err(EngineError::NotReady { .. })
        ));
        let leftovers = std::fs::read_dir(out.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_root_removed_mid_scan_is_system_fault() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        for i in 0..300 {
            write_image(&root.path().join(format!("{i}.png")), 8, 8);
        }
        let engine = slow_engine(&out);

        let id = engine
            .submit(spec(root.path(), 330, MatchMode::Lte, 1))
            .unwrap();
        wait_for_progress(&engine, &id, 5).await;
        std::fs::remove_dir_all(root.path()).unwrap();

        let state = engine.wait(&id).await.unwrap();
        assert_eq!(state.status, JobStatus::Error);
        assert!(matches!(
            state.failure_reason,
            Some(FailureReason::SystemFault(_))
        ));
        assert!(state.artifacts.is_none());
        let leftovers = std::fs::read_dir(out.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_invalid_spec_rejected() {
        let out = tempfile::tempdir().unwrap();
        let engine = engine(&out);

        let missing = spec(Path::new("/no/such/dir"), 330, MatchMode::Lte, 4);
        assert!(matches!(
            engine.submit(missing),
            Err(EngineError::InvalidSpec(_))
        ));

        let root = tempfile::tempdir().unwrap();
        let zero_target = spec(root.path(), 0, MatchMode::Lte, 4);
        assert!(matches!(
            engine.submit(zero_target),
            Err(EngineError::InvalidSpec(_))
        ));
        assert!(engine.recent(10).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let out = tempfile::tempdir().unwrap();
        let engine = engine(&out);
        let id = uuid::Uuid::new_v4();

        assert!(matches!(engine.status(&id), Err(EngineError::NotFound(_))));
        assert!(matches!(engine.cancel(&id), Err(EngineError::NotFound(_))));
        assert!(matches!(
            engine.artifacts(&id, ArtifactKind::All),
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unfiltered_job_has_no_matching_artifact() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_image(&root.path().join("a.png"), 10, 10);
        let engine = engine(&out);

        let mut spec = spec(root.path(), 330, MatchMode::Lte, 1);
        spec.emit_filtered = false;
        let id = engine.submit(spec).unwrap();
        engine.wait(&id).await.unwrap();

        assert!(matches!(
            engine.artifacts(&id, ArtifactKind::Matching),
            Err(EngineError::NotProduced { .. })
        ));
        assert!(engine.artifacts(&id, ArtifactKind::All).is_ok());
    }

    #[tokio::test]
    async fn test_report_overrides() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_image(&root.path().join("a.png"), 10, 10);
        let engine = engine(&out);

        let custom = out.path().join("custom/all.csv");
        let id = engine
            .submit_with_reports(
                spec(root.path(), 330, MatchMode::Lte, 1),
                ReportOverrides {
                    all: Some(custom.clone()),
                    ..Default::default()
                },
            )
            .unwrap();
        engine.wait(&id).await.unwrap();

        assert_eq!(engine.artifacts(&id, ArtifactKind::All).unwrap().path, custom);
        assert_eq!(csv_rows(&custom).len(), 1);
    }

    #[tokio::test]
    async fn test_history_eviction() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output.dir = out.path().to_path_buf();
        config.jobs.history_capacity = 2;
        let engine = JobEngine::new(config);

        let mut ids = Vec::new();
        for _ in 0..3 {
            let id = engine
                .submit(spec(root.path(), 330, MatchMode::Lte, 1))
                .unwrap();
            engine.wait(&id).await.unwrap();
            ids.push(id);
        }

        assert!(matches!(engine.status(&ids[0]), Err(EngineError::NotFound(_))));
        let recent: Vec<JobId> = engine.recent(10).iter().map(|s| s.id).collect();
        assert_eq!(recent, vec![ids[2], ids[1]]);
    }

    #[tokio::test]
    async fn test_live_job_outlasts_history_capacity() {
        let root = tempfile::tempdir().unwrap();
        let empty = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        for i in 0..20 {
            write_image(&root.path().join(format!("{i}.png")), 8, 8);
        }
        let mut config = Config::default();
        config.output.dir = out.path().to_path_buf();
        config.jobs.history_capacity = 2;
        let engine = JobEngine::new(config);

        // Nothing has yielded yet, so the first job is still live
        let long = engine
            .submit(spec(root.path(), 330, MatchMode::Lte, 1))
            .unwrap();
        let short: Vec<JobId> = (0..2)
            .map(|_| {
                engine
                    .submit(spec(empty.path(), 330, MatchMode::Lte, 1))
                    .unwrap()
            })
            .collect();

        assert_eq!(engine.recent(10).len(), 3);
        assert_eq!(engine.status(&long).unwrap().status, JobStatus::Pending);
        let cancelled = engine.cancel(&long).unwrap();
        assert_eq!(cancelled.failure_reason, Some(FailureReason::Cancelled));

        for id in std::iter::once(&long).chain(short.iter()) {
            engine.wait(id).await.unwrap();
        }
        tokio::task::yield_now().await;

        // Back within capacity; the oldest terminal job went first
        assert!(matches!(engine.status(&long), Err(EngineError::NotFound(_))));
        let recent: Vec<JobId> = engine.recent(10).iter().map(|s| s.id).collect();
        assert_eq!(recent, vec![short[1], short[0]]);
    }
}
