//! The filter facade.
//!
//! A [`Filter`] binds one registry entry to the process lifecycle manager.
//! All six operations share one engine; they differ only in which flags are
//! passed and how the standard streams are wired.

use crate::job::{InputStream, StreamJob, run_to_completion};
use extcompress_core::{ContentType, FilterDescriptor, OperationMode, Result};
use std::io::Read;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use tracing::info;

/// A handler for one content type, backed by an external program.
#[derive(Debug, Clone)]
pub struct Filter {
    content_type: ContentType,
    descriptor: Arc<FilterDescriptor>,
}

impl Filter {
    /// Create a handler for `content_type` running `descriptor`.
    pub fn new(content_type: impl Into<ContentType>, descriptor: Arc<FilterDescriptor>) -> Self {
        Self {
            content_type: content_type.into(),
            descriptor,
        }
    }

    /// The content type this handler was resolved for.
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// The program and flags this handler runs.
    pub fn descriptor(&self) -> &FilterDescriptor {
        &self.descriptor
    }

    /// Command line used for stream compression.
    pub fn command_stream_compress(&self) -> String {
        self.descriptor.command_line(OperationMode::StreamCompress)
    }

    /// Command line used for stream decompression.
    pub fn command_stream_decompress(&self) -> String {
        self.descriptor.command_line(OperationMode::StreamDecompress)
    }

    /// Compress the file at `path`, streaming the compressed bytes.
    pub fn compress(&self, path: impl AsRef<Path>) -> Result<StreamJob> {
        self.spawn(OperationMode::FileCompress, Some(path.as_ref()), None)
    }

    /// Decompress the file at `path`, streaming the decompressed bytes.
    pub fn decompress(&self, path: impl AsRef<Path>) -> Result<StreamJob> {
        self.spawn(OperationMode::FileDecompress, Some(path.as_ref()), None)
    }

    /// Compress everything read from `input`.
    pub fn compress_stream<R>(&self, input: R) -> Result<StreamJob>
    where
        R: Read + Send + 'static,
    {
        self.spawn(OperationMode::StreamCompress, None, Some(Box::new(input)))
    }

    /// Decompress everything read from `input`.
    pub fn decompress_stream<R>(&self, input: R) -> Result<StreamJob>
    where
        R: Read + Send + 'static,
    {
        self.spawn(OperationMode::StreamDecompress, None, Some(Box::new(input)))
    }

    /// Compress the file at `path` in place, blocking until done.
    ///
    /// Where the result ends up (e.g. `path` + `.bz2`) is the program's
    /// own convention.
    pub fn compress_file_in_place(&self, path: impl AsRef<Path>) -> Result<()> {
        self.run(OperationMode::InPlaceCompress, path.as_ref())
    }

    /// Decompress the file at `path` in place, blocking until done.
    pub fn decompress_file_in_place(&self, path: impl AsRef<Path>) -> Result<()> {
        self.run(OperationMode::InPlaceDecompress, path.as_ref())
    }

    fn command(&self, mode: OperationMode, path: Option<&Path>) -> Command {
        let mut command = Command::new(self.descriptor.program());
        command.args(self.descriptor.argv(mode, path));
        command
    }

    fn spawn(
        &self,
        mode: OperationMode,
        path: Option<&Path>,
        input: Option<InputStream>,
    ) -> Result<StreamJob> {
        debug_assert!(mode.produces_stream());
        debug_assert_eq!(mode.takes_stdin(), input.is_some());
        info!(
            content_type = %self.content_type,
            command = %self.descriptor.command_line(mode),
            path = ?path,
            "External {} command",
            mode
        );
        StreamJob::spawn(self.command(mode, path), input)
    }

    fn run(&self, mode: OperationMode, path: &Path) -> Result<()> {
        debug_assert!(!mode.produces_stream());
        info!(
            content_type = %self.content_type,
            command = %self.descriptor.command_line(mode),
            path = %path.display(),
            "External {} command",
            mode
        );
        run_to_completion(self.command(mode, Some(path)))
    }
}
