//! Human-readable report printed after a scan.

use std::io::{self, Write};

use dimscan_core::{ImageRecord, JobState};

const RULE_WIDTH: usize = 60;

/// Write the scan summary: counts, every matching image, and the per-side
/// statistics.
pub fn write_summary<W: Write>(
    out: &mut W,
    state: &JobState,
    matching: &[ImageRecord],
) -> io::Result<()> {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let spec = &state.spec;
    let criterion = format!("{}{}px", spec.mode.symbol(), spec.target_dimension);

    writeln!(out)?;
    writeln!(out, "{heavy}")?;
    writeln!(out, "ANALYSIS SUMMARY")?;
    writeln!(out, "{heavy}")?;
    writeln!(
        out,
        "Total images analyzed: {}",
        state.scanned_count - state.errored_count
    )?;
    writeln!(
        out,
        "Images matching criteria ({criterion}): {}",
        state.matched_count
    )?;
    if state.errored_count > 0 {
        writeln!(out, "Images that could not be read: {}", state.errored_count)?;
    }

    if !matching.is_empty() {
        writeln!(out)?;
        writeln!(out, "Matching images ({}):", matching.len())?;
        writeln!(out, "{light}")?;
        for record in matching {
            writeln!(out, "  {}", record.filename)?;
            writeln!(out, "    Path: {}", record.file_path.display())?;
            writeln!(out, "    Dimensions: {}x{} px", record.width, record.height)?;
            writeln!(out, "    Size: {:.2} MB", record.file_size_mb)?;
            writeln!(out)?;
        }

        if let Some(summary) = &state.summary {
            writeln!(out, "{light}")?;
            writeln!(out, "Statistics:")?;
            writeln!(out, "  Images with width {criterion}: {}", summary.width_hits)?;
            writeln!(out, "  Images with height {criterion}: {}", summary.height_hits)?;
        }
    }

    if let Some(artifacts) = &state.artifacts {
        writeln!(out, "{light}")?;
        writeln!(out, "Reports:")?;
        writeln!(out, "  All:      {}", artifacts.all.display())?;
        if let Some(matching) = &artifacts.matching {
            writeln!(out, "  Matching: {}", matching.display())?;
        }
        writeln!(out, "  Errors:   {}", artifacts.errors.display())?;
    }

    if let (Some(started), Some(finished)) = (state.started_at, state.finished_at) {
        let secs = (finished - started).num_milliseconds() as f64 / 1000.0;
        let rate = if secs > 0.0 {
            state.scanned_count as f64 / secs
        } else {
            0.0
        };
        writeln!(out, "  Duration: {secs:.1}s ({rate:.1} img/sec)")?;
    }

    writeln!(out, "{heavy}")?;
    Ok(())
}
