//! Content-type identifiers.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// An opaque content-type string such as `application/x-bzip2`.
///
/// The only structure assumed is the `primary/secondary` split, which the
/// registry uses as a fallback bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentType(String);

impl ContentType {
    /// Content type reported for empty files.
    pub const EMPTY: &'static str = "application/x-empty";
    /// Content type reported for plain text.
    pub const TEXT_PLAIN: &'static str = "text/plain";
    /// Content type reported for unidentified binary data.
    pub const OCTET_STREAM: &'static str = "application/octet-stream";

    /// Create a content type from any string.
    pub fn new(content_type: impl Into<String>) -> Self {
        Self(content_type.into())
    }

    /// Get the full content type string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the primary type (the part before `/`).
    ///
    /// A string without `/` is its own primary type.
    pub fn primary(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(p, _)| p)
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ContentType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ContentType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContentType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ContentType {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ContentType {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
