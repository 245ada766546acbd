//! File content classification.
//!
//! This module identifies the content type of a file from its leading bytes
//! (magic numbers), falling back to a plain-text check. Classification goes
//! through the [`Classifier`] trait, which takes `&mut self`: implementations
//! are assumed non-reentrant and are driven from a single thread by the
//! [`ContentTypeResolver`](crate::resolver::ContentTypeResolver).

use extcompress_core::{ContentType, ExtCompressError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Number of leading bytes inspected.
const HEAD_LEN: usize = 4096;

/// Something that can name the content type of a file.
pub trait Classifier {
    /// Classify the file at `path`, following symlinks.
    fn classify(&mut self, path: &Path) -> Result<ContentType>;
}

impl<F> Classifier for F
where
    F: FnMut(&Path) -> Result<ContentType>,
{
    fn classify(&mut self, path: &Path) -> Result<ContentType> {
        self(path)
    }
}

/// Payload formats recognized by their signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// Bzip2 compressed data.
    Bzip2,
    /// GZIP compressed data.
    Gzip,
    /// XZ compressed data.
    Xz,
    /// Zstandard compressed data.
    Zstd,
    /// LZ4 frame.
    Lz4,
    /// ZIP archive.
    Zip,
    /// 7-Zip archive.
    SevenZip,
    /// Microsoft Cabinet.
    Cab,
    /// POSIX tar archive.
    Tar,
    /// Zero-length file.
    Empty,
    /// Text without NUL bytes that decodes as UTF-8.
    Text,
    /// Anything else.
    Binary,
}

impl PayloadFormat {
    /// Detect format from the leading bytes of a file.
    ///
    /// `complete` tells whether `head` is the whole file; when it is not, a
    /// UTF-8 sequence cut off at the end of `head` does not disqualify text.
    pub fn from_head(head: &[u8], complete: bool) -> Self {
        if head.is_empty() {
            return Self::Empty;
        }

        // Bzip2: "BZh" followed by the block size digit
        if head.len() >= 4 && head.starts_with(b"BZh") && (b'1'..=b'9').contains(&head[3]) {
            return Self::Bzip2;
        }

        // GZIP: 0x1F 0x8B
        if head.starts_with(&[0x1F, 0x8B]) {
            return Self::Gzip;
        }

        // XZ: 0xFD '7zXZ' 0x00
        if head.starts_with(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00]) {
            return Self::Xz;
        }

        // Zstandard: 0xFD2FB528 little-endian
        if head.starts_with(&[0x28, 0xB5, 0x2F, 0xFD]) {
            return Self::Zstd;
        }

        // LZ4 frame: 0x184D2204 little-endian
        if head.starts_with(&[0x04, 0x22, 0x4D, 0x18]) {
            return Self::Lz4;
        }

        // ZIP: local file header, empty archive, or spanned marker
        if head.len() >= 4
            && head.starts_with(b"PK")
            && matches!(&head[2..4], [0x03, 0x04] | [0x05, 0x06] | [0x07, 0x08])
        {
            return Self::Zip;
        }

        // 7-Zip: '7z' 0xBC 0xAF 0x27 0x1C
        if head.starts_with(&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C]) {
            return Self::SevenZip;
        }

        // CAB: "MSCF"
        if head.starts_with(b"MSCF") {
            return Self::Cab;
        }

        // TAR: "ustar" at offset 257
        if head.len() >= 262 && &head[257..262] == b"ustar" {
            return Self::Tar;
        }

        if looks_like_text(head, complete) {
            return Self::Text;
        }

        Self::Binary
    }

    /// Get the MIME type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Bzip2 => "application/x-bzip2",
            Self::Gzip => "application/gzip",
            Self::Xz => "application/x-xz",
            Self::Zstd => "application/zstd",
            Self::Lz4 => "application/x-lz4",
            Self::Zip => "application/zip",
            Self::SevenZip => "application/x-7z-compressed",
            Self::Cab => "application/vnd.ms-cab-compressed",
            Self::Tar => "application/x-tar",
            Self::Empty => ContentType::EMPTY,
            Self::Text => ContentType::TEXT_PLAIN,
            Self::Binary => ContentType::OCTET_STREAM,
        }
    }

    /// Check if this is a single-stream compressed format.
    pub fn is_compressed(&self) -> bool {
        matches!(
            self,
            Self::Bzip2 | Self::Gzip | Self::Xz | Self::Zstd | Self::Lz4
        )
    }
}

impl std::fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bzip2 => write!(f, "Bzip2"),
            Self::Gzip => write!(f, "GZIP"),
            Self::Xz => write!(f, "XZ"),
            Self::Zstd => write!(f, "Zstandard"),
            Self::Lz4 => write!(f, "LZ4"),
            Self::Zip => write!(f, "ZIP"),
            Self::SevenZip => write!(f, "7-Zip"),
            Self::Cab => write!(f, "Cabinet"),
            Self::Tar => write!(f, "TAR"),
            Self::Empty => write!(f, "Empty"),
            Self::Text => write!(f, "Text"),
            Self::Binary => write!(f, "Binary"),
        }
    }
}

fn looks_like_text(head: &[u8], complete: bool) -> bool {
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        // error_len() is None only for a sequence truncated at the end
        Err(e) => !complete && e.error_len().is_none(),
    }
}

/// Signature-based classifier.
///
/// Keeps a scratch buffer between calls, which is why classification needs
/// exclusive access.
#[derive(Debug, Default)]
pub struct MagicClassifier {
    head: Vec<u8>,
}

impl MagicClassifier {
    /// Create a classifier.
    pub fn new() -> Self {
        Self {
            head: Vec::with_capacity(HEAD_LEN),
        }
    }

    /// Detect the payload format of the file at `path`.
    pub fn detect(&mut self, path: &Path) -> Result<PayloadFormat> {
        let file = File::open(path).map_err(|e| ExtCompressError::classification(path, e.to_string()))?;

        self.head.clear();
        file.take(HEAD_LEN as u64 + 1)
            .read_to_end(&mut self.head)
            .map_err(|e| ExtCompressError::classification(path, e.to_string()))?;

        let complete = self.head.len() <= HEAD_LEN;
        self.head.truncate(HEAD_LEN);
        Ok(PayloadFormat::from_head(&self.head, complete))
    }
}

impl Classifier for MagicClassifier {
    fn classify(&mut self, path: &Path) -> Result<ContentType> {
        self.detect(path).map(|format| ContentType::from(format.mime_type()))
    }
}
