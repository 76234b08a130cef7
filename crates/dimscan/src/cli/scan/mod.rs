//! The `dimscan scan` command: run one scan job in the foreground.

mod progress;
mod summary;
pub mod types;

pub use types::Mode;

use clap::Args;
use dimscan_core::output::read_records;
use dimscan_core::{
    ArtifactKind, Config, EngineError, ImageRecord, JobEngine, JobSpec, JobState, JobStatus,
    ReportOverrides,
};
use std::path::PathBuf;

use progress::watch;
use summary::write_summary;

/// Arguments for the `scan` command.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Directory to analyze
    #[arg(default_value = ".")]
    pub directory: PathBuf,

    /// Output CSV file for all results
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output CSV file for matching images only
    #[arg(short = 'm', long)]
    pub matches_output: Option<PathBuf>,

    /// Output CSV file for files that could not be read
    #[arg(long)]
    pub errors_output: Option<PathBuf>,

    /// Number of parallel workers [default: scan.default_workers]
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Target dimension in pixels [default: scan.default_target_dimension]
    #[arg(short, long)]
    pub dimension: Option<u32>,

    /// Match mode [default: scan.default_mode]
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Skip the matching-only report
    #[arg(long)]
    pub no_filtered: bool,

    /// Print the final job state as JSON instead of the summary
    #[arg(long)]
    pub json: bool,
}

/// Execute the scan command.
pub async fn execute(args: ScanArgs, config: Config) -> anyhow::Result<()> {
    let spec = build_spec(&args, &config);
    let overrides = ReportOverrides {
        all: args.output.clone(),
        matching: args.matches_output.clone(),
        errors: args.errors_output.clone(),
    };

    tracing::info!("Starting analysis of {:?}", spec.root_directory);
    tracing::info!(
        "Looking for images with {}{}px dimension",
        spec.mode.symbol(),
        spec.target_dimension
    );

    let engine = JobEngine::new(config);
    let id = match engine.submit_with_reports(spec, overrides) {
        Ok(id) => id,
        Err(EngineError::InvalidSpec(reason)) => {
            anyhow::bail!("{reason}\n\n  Hint: Check the directory path and options.")
        }
        Err(e) => return Err(e.into()),
    };

    let state = watch(&engine, &id, !args.json).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else if state.status == JobStatus::Completed {
        let matching = matching_records(&engine, &state)?;
        write_summary(&mut std::io::stderr().lock(), &state, &matching)?;
    }

    match (&state.status, &state.failure_reason) {
        (JobStatus::Completed, _) => {
            tracing::info!("Analysis complete");
            Ok(())
        }
        (_, Some(reason)) => anyhow::bail!("Scan did not complete: {reason}"),
        (status, None) => anyhow::bail!("Scan ended in unexpected state: {status}"),
    }
}

/// Merge CLI flags over the configured scan defaults.
fn build_spec(args: &ScanArgs, config: &Config) -> JobSpec {
    let expanded = shellexpand::tilde(&args.directory.to_string_lossy()).into_owned();
    let directory = PathBuf::from(expanded);
    // Resolve to an absolute path when possible; validation reports missing roots
    let directory = std::fs::canonicalize(&directory).unwrap_or(directory);

    let mut spec = JobSpec::new(directory, &config.scan);
    if let Some(dimension) = args.dimension {
        spec.target_dimension = dimension;
    }
    if let Some(mode) = args.mode {
        spec.mode = mode.into();
    }
    if let Some(workers) = args.workers {
        spec.worker_count = workers;
    }
    spec.emit_filtered = !args.no_filtered;
    spec
}

/// Matching records of a completed job, from the filtered report when it
/// exists and from the full report otherwise.
fn matching_records(engine: &JobEngine, state: &JobState) -> anyhow::Result<Vec<ImageRecord>> {
    match engine.artifacts(&state.id, ArtifactKind::Matching) {
        Ok(artifact) => Ok(read_records(artifact.open()?)?),
        Err(EngineError::NotProduced { .. }) => {
            let all = engine.artifacts(&state.id, ArtifactKind::All)?;
            Ok(read_records(all.open()?)?
                .into_iter()
                .filter(|record| record.matches)
                .collect())
        }
        Err(e) => Err(e.into()),
    }
}
