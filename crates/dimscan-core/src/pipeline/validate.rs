//! Header sniffing before the dimension read.

use std::io::{self, Read};
use std::path::Path;

use crate::types::{ProbeError, ProbeFailure};

/// Image container recognised from a file's leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    Tiff,
    /// ISO base media (HEIC/HEIF/AVIF): recognised, but not probed
    IsoMedia,
}

impl HeaderKind {
    /// Whether the header reader can take dimensions from this container.
    pub fn is_probeable(&self) -> bool {
        !matches!(self, HeaderKind::IsoMedia)
    }
}

/// Validates file headers before probing.
pub struct Validator;

impl Validator {
    /// Read the first bytes of `path` and classify the container.
    ///
    /// Returns a [`ProbeError`] for unreadable files, files too short to hold
    /// a header, unrecognised magic bytes, and recognised but unprobeable
    /// containers.
    pub fn check(path: &Path) -> Result<HeaderKind, ProbeError> {
        let file = std::fs::File::open(path).map_err(|e| {
            ProbeError::new(path, classify_io(&e), format!("Cannot open file: {e}"))
        })?;

        let mut header = Vec::with_capacity(12);
        file.take(12).read_to_end(&mut header).map_err(|e| {
            ProbeError::new(path, classify_io(&e), format!("Cannot read header: {e}"))
        })?;

        if header.len() < 4 {
            return Err(ProbeError::new(
                path,
                ProbeFailure::DecodeFailure,
                "File too small to be a valid image",
            ));
        }

        match Self::sniff(&header) {
            Some(kind) if kind.is_probeable() => Ok(kind),
            Some(_) => Err(ProbeError::new(
                path,
                ProbeFailure::Unsupported,
                "HEIF/AVIF container is not supported",
            )),
            None => Err(ProbeError::new(
                path,
                ProbeFailure::DecodeFailure,
                "Unrecognized image format (invalid magic bytes)",
            )),
        }
    }

    /// Match header bytes against known image signatures.
    pub fn sniff(header: &[u8]) -> Option<HeaderKind> {
        if header.len() < 4 {
            return None;
        }

        // JPEG: FF D8 FF
        if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(HeaderKind::Jpeg);
        }

        // PNG: 89 50 4E 47
        if header.starts_with(&[0x89, b'P', b'N', b'G']) {
            return Some(HeaderKind::Png);
        }

        // GIF: GIF8
        if header.starts_with(b"GIF8") {
            return Some(HeaderKind::Gif);
        }

        // WebP: RIFF....WEBP
        if header.starts_with(b"RIFF") {
            if header.len() >= 12 && &header[8..12] == b"WEBP" {
                return Some(HeaderKind::WebP);
            }
            return None;
        }

        // BMP: BM
        if header.starts_with(b"BM") {
            return Some(HeaderKind::Bmp);
        }

        // TIFF: II (little-endian) or MM (big-endian) followed by version 42
        if header.starts_with(&[b'I', b'I', 0x2A, 0x00])
            || header.starts_with(&[b'M', b'M', 0x00, 0x2A])
        {
            return Some(HeaderKind::Tiff);
        }

        // HEIC/HEIF/AVIF: ftyp box at offset 4
        if header.len() >= 12 && &header[4..8] == b"ftyp" {
            return Some(HeaderKind::IsoMedia);
        }

        None
    }
}

/// Map an I/O error to a probe failure class.
pub(crate) fn classify_io(err: &io::Error) -> ProbeFailure {
    match err.kind() {
        io::ErrorKind::PermissionDenied => ProbeFailure::Unreadable,
        _ => ProbeFailure::IoError,
    }
}
