//! Live progress for a running scan job, driven by polling its status.

use std::time::Duration;

use dimscan_core::{JobEngine, JobId, JobState};
use indicatif::{ProgressBar, ProgressStyle};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Follow a job until it finishes. The first Ctrl-C cancels the job; the
/// watch then continues until the pipeline has stopped.
pub async fn watch(
    engine: &JobEngine,
    id: &JobId,
    show_progress: bool,
) -> anyhow::Result<JobState> {
    let progress = if show_progress {
        create_progress_bar()
    } else {
        ProgressBar::hidden()
    };

    let finished = engine.wait(id);
    tokio::pin!(finished);
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut interrupted = false;

    loop {
        tokio::select! {
            state = &mut finished => {
                progress.finish_and_clear();
                return Ok(state?);
            }
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                progress.set_message("cancelling...");
                tracing::warn!("Interrupted, cancelling job {}", id);
                engine.cancel(id)?;
            }
            _ = ticker.tick() => {
                update_progress(&progress, &engine.status(id)?);
            }
        }
    }
}

/// Create a progress bar whose length is filled in once the total is known.
fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    match ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        Ok(style) => pb.set_style(style.progress_chars("##-")),
        Err(e) => tracing::debug!("Falling back to default progress style: {e}"),
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("counting files...");
    pb
}

fn update_progress(progress: &ProgressBar, state: &JobState) {
    let Some(total) = state.total_estimate else {
        return;
    };
    progress.set_length(total);
    progress.set_position(state.scanned_count);
    progress.set_message(progress_message(state));
}

fn progress_message(state: &JobState) -> String {
    if state.errored_count > 0 {
        format!(
            "{} matched, {} failed",
            state.matched_count, state.errored_count
        )
    } else {
        format!("{} matched", state.matched_count)
    }
}
