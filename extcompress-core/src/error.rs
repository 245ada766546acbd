//! Error types for extcompress operations.
//!
//! A single error enum covers every failure the filter layer can report:
//! spawning external programs, classifying files, resolving content types,
//! and reaping finished processes. A non-zero exit of a streaming job is
//! not an error; it is read back through the job's result.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for extcompress operations.
#[derive(Debug, Error)]
pub enum ExtCompressError {
    /// I/O error from an underlying pipe, file, or reader.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The external program could not be started.
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The classifier could not identify a file.
    #[error("Failed to classify {}: {message}", path.display())]
    Classification {
        /// File that was being classified.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// No filter is registered for a content type, not even by primary type.
    #[error("Unknown content type: {content_type}")]
    UnknownContentType {
        /// The content type that had no handler.
        content_type: String,
    },

    /// A registered filter program is missing from the search path.
    #[error("Filter program '{program}' for {content_type} not found in PATH")]
    ProgramNotFound {
        /// Program name as registered.
        program: String,
        /// Content type the program is registered for.
        content_type: String,
    },

    /// A blocking (in-place) filter run exited unsuccessfully.
    #[error("Filter '{program}' failed with exit code {code}")]
    FilterFailed {
        /// Program that failed.
        program: String,
        /// Exit code (128 + signal number when killed by a signal).
        code: i32,
    },

    /// Waiting for a child process failed; its state is unknown.
    #[error("Failed to reap process {pid}: {message}")]
    ReapFailed {
        /// Process id of the child.
        pid: u32,
        /// Description of the wait failure.
        message: String,
    },

    /// The content-type resolver worker is no longer running.
    #[error("Content-type resolver has stopped")]
    ResolverStopped,

    /// Filter configuration could not be parsed.
    #[error("Invalid filter configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },
}

/// Result type alias for extcompress operations.
pub type Result<T> = std::result::Result<T, ExtCompressError>;

impl ExtCompressError {
    /// Create a spawn error.
    pub fn spawn(program: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Create a classification error.
    pub fn classification(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Classification {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an unknown content type error.
    pub fn unknown_content_type(content_type: impl Into<String>) -> Self {
        Self::UnknownContentType {
            content_type: content_type.into(),
        }
    }

    /// Create a program not found error.
    pub fn program_not_found(program: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self::ProgramNotFound {
            program: program.into(),
            content_type: content_type.into(),
        }
    }

    /// Create a filter failed error.
    pub fn filter_failed(program: impl Into<String>, code: i32) -> Self {
        Self::FilterFailed {
            program: program.into(),
            code,
        }
    }

    /// Create a reap failure error.
    pub fn reap_failed(pid: u32, message: impl Into<String>) -> Self {
        Self::ReapFailed {
            pid,
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = ExtCompressError::unknown_content_type("application/x-totally-unknown");
        assert!(err.to_string().contains("application/x-totally-unknown"));

        let err = ExtCompressError::program_not_found("bzip2", "application/x-bzip2");
        assert!(err.to_string().contains("bzip2"));
        assert!(err.to_string().contains("PATH"));

        let err = ExtCompressError::filter_failed("xz", 1);
        assert!(err.to_string().contains("exit code 1"));

        let err = ExtCompressError::classification("/tmp/missing", "No such file");
        assert!(err.to_string().contains("/tmp/missing"));
    }

    #[test]
    fn test_spawn_error_keeps_source() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "not found");
        let err = ExtCompressError::spawn("no-such-filter", io_err);
        assert!(err.to_string().contains("no-such-filter"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let err: ExtCompressError = io_err.into();
        assert!(matches!(err, ExtCompressError::Io(_)));
    }
}
