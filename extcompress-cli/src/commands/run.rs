//! Compress and decompress command implementation.

use extcompress_filter::{ContentTypeResolver, Filter, FilterRegistry, StreamJob};
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

/// Which way the filter runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Compress with the filter for the requested content type.
    Compress,
    /// Decompress with the filter for the file's detected content type.
    Decompress,
}

/// Options shared by the compress and decompress commands.
pub struct RunOptions<'a> {
    pub direction: Direction,
    /// Stream the result to stdout instead of rewriting the file.
    pub stdout: bool,
    /// Content type to use instead of detecting it.
    pub content_type: Option<&'a str>,
}

/// Run one filter over `file`, returning the process exit code to report.
pub fn cmd_run(
    registry: &FilterRegistry,
    resolver: &ContentTypeResolver,
    file: &Path,
    options: &RunOptions,
) -> Result<i32, Box<dyn std::error::Error>> {
    let filter = select_filter(registry, resolver, file, options)?;
    debug!(
        content_type = %filter.content_type(),
        program = filter.descriptor().program(),
        "Selected filter"
    );

    if !options.stdout {
        match options.direction {
            Direction::Compress => filter.compress_file_in_place(file)?,
            Direction::Decompress => filter.decompress_file_in_place(file)?,
        }
        return Ok(0);
    }

    let mut job = match options.direction {
        Direction::Compress => filter.compress(file)?,
        Direction::Decompress => filter.decompress(file)?,
    };
    stream_to_stdout(&mut job)
}

fn select_filter(
    registry: &FilterRegistry,
    resolver: &ContentTypeResolver,
    file: &Path,
    options: &RunOptions,
) -> Result<Filter, Box<dyn std::error::Error>> {
    if let Some(content_type) = options.content_type {
        return Ok(registry.lookup(content_type)?);
    }
    match options.direction {
        Direction::Compress => Err("compress needs a target content type (--type)".into()),
        Direction::Decompress => Ok(resolver.handler_for(registry, file)?),
    }
}

fn stream_to_stdout(job: &mut StreamJob) -> Result<i32, Box<dyn std::error::Error>> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match io::copy(job, &mut out).and_then(|_| out.flush()) {
        Ok(()) => {}
        // Reader went away (e.g. `| head`); stop the filter quietly.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!("Output closed early, stopping filter");
        }
        Err(e) => {
            job.close()?;
            return Err(e.into());
        }
    }

    job.close()?;
    Ok(job.result()?)
}
