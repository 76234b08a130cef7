//! Report artifacts: CSV writers for image records and probe errors.
//!
//! Every writer emits its header row on construction, so an artifact with no
//! rows is still a valid CSV file. Rows are appended as they arrive and
//! fields containing delimiters or quotes are quoted by the `csv` crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::types::{ImageRecord, ProbeError, BYTES_PER_MB};

/// Column order of the "all" and "matching" artifacts.
pub const RECORD_COLUMNS: [&str; 6] = [
    "file_path",
    "filename",
    "width",
    "height",
    "has_target_dimension",
    "file_size_mb",
];

/// Column order of the error artifact.
pub const ERROR_COLUMNS: [&str; 3] = ["file_path", "reason", "detail"];

/// The artifacts a job can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Every successfully probed image
    All,
    /// Only images matching the criterion
    Matching,
    /// Per-file probe failures
    Errors,
}

impl ArtifactKind {
    /// Parse kind from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" => Some(Self::All),
            "matching" | "matches" => Some(Self::Matching),
            "errors" | "error" => Some(Self::Errors),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::All => write!(f, "all"),
            ArtifactKind::Matching => write!(f, "matching"),
            ArtifactKind::Errors => write!(f, "errors"),
        }
    }
}

/// Streams [`ImageRecord`] rows to a CSV sink.
pub struct RecordWriter<W: Write> {
    writer: csv::Writer<W>,
    rows_written: usize,
}

impl<W: Write> RecordWriter<W> {
    /// Create a writer and emit the header row.
    pub fn new(inner: W) -> io::Result<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(RECORD_COLUMNS)?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Append one record.
    pub fn write(&mut self, record: &ImageRecord) -> io::Result<()> {
        self.writer.write_record([
            &*record.file_path.to_string_lossy(),
            record.filename.as_str(),
            record.width.to_string().as_str(),
            record.height.to_string().as_str(),
            if record.matches { "true" } else { "false" },
            record.file_size_mb.to_string().as_str(),
        ])?;
        self.rows_written += 1;
        Ok(())
    }

    /// Get the number of rows written, excluding the header.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> io::Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| io::Error::other(e.error().to_string()))
    }
}

/// Streams [`ProbeError`] rows to a CSV sink.
pub struct ErrorWriter<W: Write> {
    writer: csv::Writer<W>,
    rows_written: usize,
}

impl<W: Write> ErrorWriter<W> {
    /// Create a writer and emit the header row.
    pub fn new(inner: W) -> io::Result<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(ERROR_COLUMNS)?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Append one probe failure.
    pub fn write(&mut self, error: &ProbeError) -> io::Result<()> {
        self.writer.write_record([
            &*error.file_path.to_string_lossy(),
            error.reason.as_str(),
            error.detail.as_str(),
        ])?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| io::Error::other(e.error().to_string()))
    }
}

/// Read the rows of an "all" or "matching" artifact back into records.
///
/// `format` is not stored in the CSV; it is recovered from the extension.
pub fn read_records<R: Read>(inner: R) -> io::Result<Vec<ImageRecord>> {
    let mut reader = csv::Reader::from_reader(inner);
    let mut records = Vec::new();
    for row in reader.records() {
        records.push(parse_record(&row?)?);
    }
    Ok(records)
}

fn parse_record(row: &csv::StringRecord) -> io::Result<ImageRecord> {
    let field = |i: usize| {
        row.get(i).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("missing column {}", RECORD_COLUMNS[i]),
            )
        })
    };
    let invalid = |column: &str, value: &str| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid {column}: {value:?}"),
        )
    };

    let file_path = PathBuf::from(field(0)?);
    let format = file_path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let width = field(2)?;
    let height = field(3)?;
    let matches = field(4)?;
    let size = field(5)?;

    let file_size_mb: f64 = size.parse().map_err(|_| invalid("file_size_mb", size))?;

    Ok(ImageRecord {
        filename: field(1)?.to_string(),
        width: width.parse().map_err(|_| invalid("width", width))?,
        height: height.parse().map_err(|_| invalid("height", height))?,
        matches: matches.parse().map_err(|_| invalid("has_target_dimension", matches))?,
        // The artifact only keeps megabytes
        file_size_bytes: (file_size_mb * BYTES_PER_MB).round() as u64,
        file_size_mb,
        file_path,
        format,
    })
}

/// Where a job writes its artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPaths {
    /// All probed images
    pub all: PathBuf,

    /// Matching images; `None` when the job does not emit the filtered report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching: Option<PathBuf>,

    /// Probe failures
    pub errors: PathBuf,
}

impl ReportPaths {
    /// Generate timestamped artifact names inside `dir`.
    ///
    /// `tag` keeps names unique when several jobs start in the same second.
    pub fn generate(
        dir: &Path,
        prefix: &str,
        target_dimension: u32,
        emit_filtered: bool,
        tag: &str,
        at: DateTime<Utc>,
    ) -> Self {
        let ts = at.format("%Y%m%d_%H%M%S");
        Self {
            all: dir.join(format!("{prefix}_all_{ts}_{tag}.csv")),
            matching: emit_filtered
                .then(|| dir.join(format!("{prefix}_{target_dimension}px_{ts}_{tag}.csv"))),
            errors: dir.join(format!("{prefix}_errors_{ts}_{tag}.csv")),
        }
    }

    /// Path of one artifact, if the job produces it.
    pub fn get(&self, kind: ArtifactKind) -> Option<&Path> {
        match kind {
            ArtifactKind::All => Some(&self.all),
            ArtifactKind::Matching => self.matching.as_deref(),
            ArtifactKind::Errors => Some(&self.errors),
        }
    }

    /// All artifact paths this job produces.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        [Some(self.all.as_path()), self.matching.as_deref(), Some(self.errors.as_path())]
            .into_iter()
            .flatten()
    }

    /// Best-effort removal of partially written artifacts.
    pub fn remove_all(&self) {
        for path in self.iter() {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!("Removed partial artifact {:?}", path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove partial artifact {:?}: {}", path, e),
            }
        }
    }
}

/// The open sinks of one running job.
pub struct ReportSinks<W: Write> {
    pub all: RecordWriter<W>,
    pub matching: Option<RecordWriter<W>>,
    pub errors: ErrorWriter<W>,
}

impl<W: Write> ReportSinks<W> {
    /// Flush every sink.
    pub fn flush(&mut self) -> io::Result<()> {
        self.all.flush()?;
        if let Some(matching) = &mut self.matching {
            matching.flush()?;
        }
        self.errors.flush()
    }
}

impl ReportSinks<BufWriter<File>> {
    /// Create (truncating) the artifact files, creating parent directories.
    pub fn create(paths: &ReportPaths) -> io::Result<Self> {
        for path in paths.iter() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }

        let open = |path: &Path| File::create(path).map(BufWriter::new);
        Ok(Self {
            all: RecordWriter::new(open(&paths.all)?)?,
            matching: match &paths.matching {
                Some(path) => Some(RecordWriter::new(open(path)?)?),
                None => None,
            },
            errors: ErrorWriter::new(open(&paths.errors)?)?,
        })
    }
}
