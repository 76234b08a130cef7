//! Fan-in aggregation of probe outcomes.
//!
//! The aggregator is the single owner of a job's counters and sinks. Workers
//! deliver outcomes over a channel and every mutation happens here, one
//! outcome at a time.

use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use crate::output::ReportSinks;
use crate::types::{MatchMode, ProbeOutcome, ScanSummary};

use super::matcher::DimensionMatcher;

/// Running counters of one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCounts {
    /// Outcomes received, successes and failures alike
    pub scanned: u64,
    /// Records matching the criterion
    pub matched: u64,
    /// Probe failures
    pub errored: u64,
}

/// Consumes outcomes, classifies records and streams rows into the sinks.
pub struct Aggregator<W: Write> {
    target: u32,
    mode: MatchMode,
    counts: ScanCounts,
    summary: ScanSummary,
    sinks: ReportSinks<W>,
}

impl<W: Write> Aggregator<W> {
    /// Create an aggregator for a job's criterion and sinks.
    ///
    /// Matching rows are only written when `sinks.matching` is present.
    pub fn new(target: u32, mode: MatchMode, sinks: ReportSinks<W>) -> Self {
        Self {
            target,
            mode,
            counts: ScanCounts::default(),
            summary: ScanSummary::default(),
            sinks,
        }
    }

    /// Account for one outcome and append it to the right sinks.
    pub fn ingest(&mut self, outcome: ProbeOutcome) -> io::Result<()> {
        self.counts.scanned += 1;

        match outcome {
            Ok(mut record) => {
                let hits = DimensionMatcher::dimension_hits(
                    record.width,
                    record.height,
                    self.target,
                    self.mode,
                );
                record.matches = hits.any();
                self.summary.total_bytes += record.file_size_bytes;

                self.sinks.all.write(&record)?;
                if record.matches {
                    self.counts.matched += 1;
                    self.summary.width_hits += u64::from(hits.width);
                    self.summary.height_hits += u64::from(hits.height);
                    if let Some(matching) = &mut self.sinks.matching {
                        matching.write(&record)?;
                    }
                    tracing::debug!(
                        "Found match: {} ({}x{})",
                        record.filename,
                        record.width,
                        record.height
                    );
                }
            }
            Err(error) => {
                self.counts.errored += 1;
                tracing::warn!("Failed: {:?} - {}", error.file_path, error.detail);
                self.sinks.errors.write(&error)?;
            }
        }

        Ok(())
    }

    /// Current counters.
    pub fn counts(&self) -> ScanCounts {
        self.counts
    }

    /// Flush the sinks and return the final counters and statistics.
    pub fn finish(mut self) -> io::Result<(ScanCounts, ScanSummary, ReportSinks<W>)> {
        self.sinks.flush()?;
        Ok((self.counts, self.summary, self.sinks))
    }
}

/// Progress percentage for `scanned` out of `total`, clamped to [0, 100].
///
/// `None` while the total is still unknown. An empty scan is complete.
pub fn progress_percent(scanned: u64, total: Option<u64>) -> Option<f64> {
    let total = total?;
    if total == 0 {
        return Some(100.0);
    }
    Some((scanned as f64 / total as f64 * 100.0).clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{ErrorWriter, RecordWriter};
    use crate::types::{ImageRecord, ProbeError, ProbeFailure};
    use std::path::PathBuf;

    fn sinks(emit_filtered: bool) -> ReportSinks<Vec<u8>> {
        ReportSinks {
            all: RecordWriter::new(Vec::new()).unwrap(),
            matching: emit_filtered.then(|| RecordWriter::new(Vec::new()).unwrap()),
            errors: ErrorWriter::new(Vec::new()).unwrap(),
        }
    }

    fn record(name: &str, width: u32, height: u32) -> ProbeOutcome {
        Ok(ImageRecord {
            file_path: PathBuf::from(format!("/imgs/{name}")),
            filename: name.to_string(),
            width,
            height,
            matches: false,
            file_size_bytes: 1024 * 1024,
            file_size_mb: 1.0,
            format: "png".to_string(),
        })
    }

    fn failure(name: &str) -> ProbeOutcome {
        Err(ProbeError::new(
            format!("/imgs/{name}"),
            ProbeFailure::DecodeFailure,
            "corrupt",
        ))
    }

    #[test]
    fn test_counts_and_sinks() {
        let mut agg = Aggregator::new(330, MatchMode::Lte, sinks(true));
        agg.ingest(record("small_both.jpg", 200, 150)).unwrap();
        agg.ingest(record("large_both.png", 800, 600)).unwrap();
        agg.ingest(record("small_height.jpg", 500, 200)).unwrap();
        agg.ingest(failure("corrupt.jpg")).unwrap();

        assert_eq!(
            agg.counts(),
            ScanCounts {
                scanned: 4,
                matched: 2,
                errored: 1
            }
        );

        let (counts, summary, sinks) = agg.finish().unwrap();
        assert_eq!(counts.scanned, 4);
        assert_eq!(summary.width_hits, 1);
        assert_eq!(summary.height_hits, 2);
        assert_eq!(summary.total_bytes, 3 * 1024 * 1024);
        assert_eq!(sinks.all.rows_written(), 3);
        assert_eq!(sinks.matching.as_ref().unwrap().rows_written(), 2);
        assert_eq!(sinks.errors.rows_written(), 1);

        let all = String::from_utf8(sinks.all.into_inner().unwrap()).unwrap();
        assert!(all.contains("/imgs/small_both.jpg,small_both.jpg,200,150,true,1"));
        assert!(all.contains("/imgs/large_both.png,large_both.png,800,600,false,1"));
    }

    #[test]
    fn test_without_filtered_sink() {
        let mut agg = Aggregator::new(330, MatchMode::Exact, sinks(false));
        agg.ingest(record("exact.png", 330, 500)).unwrap();
        agg.ingest(record("miss.png", 331, 500)).unwrap();

        let (counts, _, sinks) = agg.finish().unwrap();
        assert_eq!(counts.matched, 1);
        assert!(sinks.matching.is_none());
        assert_eq!(sinks.all.rows_written(), 2);
    }

    #[test]
    fn test_total_bytes_is_exact() {
        let mut agg = Aggregator::new(330, MatchMode::Lte, sinks(false));
        for (name, bytes) in [("a.png", 1_234_567u64), ("b.png", 3), ("c.png", 999)] {
            agg.ingest(Ok(ImageRecord {
                file_path: PathBuf::from(name),
                filename: name.to_string(),
                width: 10,
                height: 10,
                matches: false,
                file_size_bytes: bytes,
                file_size_mb: bytes as f64 / 1_048_576.0,
                format: "png".to_string(),
            }))
            .unwrap();
        }
        let (_, summary, _) = agg.finish().unwrap();
        assert_eq!(summary.total_bytes, 1_234_567 + 3 + 999);
    }

    #[test]
    fn test_errors_do_not_match() {
        let mut agg = Aggregator::new(330, MatchMode::Lte, sinks(true));
        agg.ingest(failure("a.jpg")).unwrap();
        agg.ingest(failure("b.jpg")).unwrap();

        let counts = agg.counts();
        assert_eq!(counts.scanned, 2);
        assert_eq!(counts.matched, 0);
        assert_eq!(counts.errored, 2);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, None), None);
        assert_eq!(progress_percent(0, Some(0)), Some(100.0));
        assert_eq!(progress_percent(5, Some(10)), Some(50.0));
        assert_eq!(progress_percent(10, Some(10)), Some(100.0));
        assert_eq!(progress_percent(12, Some(10)), Some(100.0));
    }
}
