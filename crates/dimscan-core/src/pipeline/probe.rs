//! Image probing: dimensions and file size from the header, with timeout.

use image::{ImageError, ImageFormat};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::types::{ImageRecord, ProbeError, ProbeFailure, ProbeOutcome, BYTES_PER_MB};

use super::validate::{classify_io, Validator};

/// Reads image dimensions without decoding pixel data.
#[derive(Debug, Clone)]
pub struct ImageProbe {
    limits: LimitsConfig,
}

impl ImageProbe {
    /// Create a new probe with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Probe a file on the blocking pool, bounded by the configured timeout.
    ///
    /// Every failure, including a timeout or a panicking decoder, comes back
    /// as a [`ProbeError`] value.
    pub async fn probe_with_timeout(&self, path: PathBuf) -> ProbeOutcome {
        let timeout_ms = self.limits.probe_timeout_ms;
        let path_owned = path.clone();

        let result = timeout(
            Duration::from_millis(timeout_ms),
            tokio::task::spawn_blocking(move || Self::probe(&path_owned)),
        )
        .await;

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => Err(ProbeError::new(
                path,
                ProbeFailure::DecodeFailure,
                format!("Probe task failed: {e}"),
            )),
            Err(_) => Err(ProbeError::new(
                path,
                ProbeFailure::IoError,
                format!("Timed out after {timeout_ms}ms"),
            )),
        }
    }

    /// Synchronous probe: stat the file, sniff its header, read dimensions.
    pub fn probe(path: &Path) -> ProbeOutcome {
        let metadata = std::fs::metadata(path).map_err(|e| {
            ProbeError::new(path, classify_io(&e), format!("Cannot read metadata: {e}"))
        })?;
        if !metadata.is_file() {
            return Err(ProbeError::new(
                path,
                ProbeFailure::IoError,
                "Not a regular file",
            ));
        }

        Validator::check(path)?;

        let reader = image::ImageReader::open(path)
            .map_err(|e| ProbeError::new(path, classify_io(&e), format!("Cannot open file: {e}")))?
            .with_guessed_format()
            .map_err(|e| {
                ProbeError::new(
                    path,
                    classify_io(&e),
                    format!("Cannot detect image format: {e}"),
                )
            })?;

        let format = reader.format().ok_or_else(|| {
            ProbeError::new(path, ProbeFailure::Unsupported, "Unknown image format")
        })?;

        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| ProbeError::new(path, classify_image_error(&e), e.to_string()))?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string());

        tracing::trace!("Probed {:?}: {}x{}", path, width, height);

        Ok(ImageRecord {
            file_path: path.to_path_buf(),
            filename,
            width,
            height,
            matches: false,
            file_size_bytes: metadata.len(),
            file_size_mb: metadata.len() as f64 / BYTES_PER_MB,
            format: format_to_string(format),
        })
    }
}

/// Map a decoder error to a probe failure class.
fn classify_image_error(err: &ImageError) -> ProbeFailure {
    match err {
        ImageError::Unsupported(_) => ProbeFailure::Unsupported,
        // Truncated headers surface as EOF from the decoder
        ImageError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            ProbeFailure::DecodeFailure
        }
        ImageError::IoError(e) => classify_io(e),
        _ => ProbeFailure::DecodeFailure,
    }
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        _ => "unknown".to_string(),
    }
}
