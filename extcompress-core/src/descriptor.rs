//! Filter descriptors.
//!
//! A [`FilterDescriptor`] is the complete, data-only description of an
//! external filter: the program to run and the flags to pass for each
//! [`OperationMode`]. All filters share the same invocation shape, so no
//! per-filter code is needed beyond this table.

use crate::mode::OperationMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::Path;

/// Program name of the pass-through filter.
pub const PASSTHROUGH_PROGRAM: &str = "cat";

/// An external filter program and its flags per operation mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    /// Program name or path, resolved through the search path at spawn time.
    program: String,
    /// Flags per mode. Modes without an entry take no flags.
    #[serde(default)]
    args: BTreeMap<OperationMode, Vec<String>>,
}

impl FilterDescriptor {
    /// Create a descriptor with no flags for any mode.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: BTreeMap::new(),
        }
    }

    /// Set the flags for one mode.
    pub fn with_args<I, S>(mut self, mode: OperationMode, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args
            .insert(mode, args.into_iter().map(Into::into).collect());
        self
    }

    /// Descriptor for a program following the bzip2/gzip/xz conventions.
    ///
    /// `-d` selects decompression, `-c` writes to stdout, and a bare path
    /// argument is (de)compressed in place.
    pub fn unix_filter(program: impl Into<String>) -> Self {
        Self::new(program)
            .with_args(OperationMode::FileCompress, ["-c"])
            .with_args(OperationMode::FileDecompress, ["-d", "-c"])
            .with_args(OperationMode::StreamCompress, ["-c"])
            .with_args(OperationMode::StreamDecompress, ["-d", "-c"])
            .with_args(OperationMode::InPlaceCompress, Vec::<String>::new())
            .with_args(OperationMode::InPlaceDecompress, ["-d"])
    }

    /// Descriptor for the pass-through filter (`cat`).
    ///
    /// Compressing and decompressing both copy bytes unchanged; the in-place
    /// modes leave the file untouched.
    pub fn passthrough() -> Self {
        Self::new(PASSTHROUGH_PROGRAM)
    }

    /// Get the program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Get the flags for a mode.
    pub fn args(&self, mode: OperationMode) -> &[String] {
        self.args.get(&mode).map(Vec::as_slice).unwrap_or_default()
    }

    /// Build the full argument vector for a mode.
    ///
    /// The path is appended after the flags for modes that take one and
    /// ignored otherwise.
    pub fn argv(&self, mode: OperationMode, path: Option<&Path>) -> Vec<OsString> {
        let mut argv: Vec<OsString> = self.args(mode).iter().map(OsString::from).collect();
        if mode.takes_path() {
            if let Some(path) = path {
                argv.push(path.as_os_str().to_owned());
            }
        }
        argv
    }

    /// Render the command run for a mode, for display purposes.
    pub fn command_line(&self, mode: OperationMode) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args(mode).iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
