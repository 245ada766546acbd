//! Operation modes of an external filter.
//!
//! Every filter is invoked in one of six shapes. The shape decides which
//! flags are passed, whether the target path is appended, where stdin comes
//! from, and whether stdout is handed back to the caller as a stream.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How an external filter program is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationMode {
    /// Compress bytes read from stdin to stdout.
    StreamCompress,
    /// Decompress bytes read from stdin to stdout.
    StreamDecompress,
    /// Compress a file given as argument, streaming the result to stdout.
    FileCompress,
    /// Decompress a file given as argument, streaming the result to stdout.
    FileDecompress,
    /// Compress a file in place using the program's own file handling.
    InPlaceCompress,
    /// Decompress a file in place using the program's own file handling.
    InPlaceDecompress,
}

impl OperationMode {
    /// All modes, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::StreamCompress,
        Self::StreamDecompress,
        Self::FileCompress,
        Self::FileDecompress,
        Self::InPlaceCompress,
        Self::InPlaceDecompress,
    ];

    /// Get the mode name as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StreamCompress => "stream-compress",
            Self::StreamDecompress => "stream-decompress",
            Self::FileCompress => "file-compress",
            Self::FileDecompress => "file-decompress",
            Self::InPlaceCompress => "in-place-compress",
            Self::InPlaceDecompress => "in-place-decompress",
        }
    }

    /// Check if the target path is appended to the argument list.
    pub fn takes_path(&self) -> bool {
        !self.takes_stdin()
    }

    /// Check if the caller's reader is piped to the program's stdin.
    pub fn takes_stdin(&self) -> bool {
        matches!(self, Self::StreamCompress | Self::StreamDecompress)
    }

    /// Check if the program's stdout is returned as a stream.
    pub fn produces_stream(&self) -> bool {
        !matches!(self, Self::InPlaceCompress | Self::InPlaceDecompress)
    }

    /// Check if this mode compresses (as opposed to decompresses).
    pub fn is_compress(&self) -> bool {
        matches!(
            self,
            Self::StreamCompress | Self::FileCompress | Self::InPlaceCompress
        )
    }
}

impl std::fmt::Display for OperationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for OperationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| format!("unknown operation mode: {}", s))
    }
}
