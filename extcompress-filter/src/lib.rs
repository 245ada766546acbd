//! # extcompress Filter
//!
//! Compression and decompression through external Unix filter programs.
//!
//! This crate ties the pieces together:
//!
//! - [`detect`]: content classification from file signatures
//! - [`resolver`]: single-worker front end serializing classification
//! - [`registry`]: content type to filter lookup and startup health check
//! - [`filter`]: the six operations of one filter
//! - [`job`]: the process lifecycle behind every streaming operation
//!
//! ## Example
//!
//! ```rust,no_run
//! use extcompress_filter::{ContentTypeResolver, FilterRegistry};
//! use std::io::Read;
//!
//! let registry = FilterRegistry::with_defaults();
//! registry.check_programs().unwrap();
//!
//! let resolver = ContentTypeResolver::start().unwrap();
//! let filter = resolver.handler_for(&registry, "notes.txt.bz2").unwrap();
//!
//! let mut job = filter.decompress("notes.txt.bz2").unwrap();
//! let mut text = String::new();
//! job.read_to_string(&mut text).unwrap();
//! assert_eq!(job.result().unwrap(), 0);
//! ```
//!
//! ## Exit status
//!
//! Streaming operations return immediately with a [`StreamJob`]. The exit
//! status of the program is not an error; read it with
//! [`StreamJob::result`] once the output has been consumed or the job has
//! been closed.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod detect;
pub mod filter;
pub mod job;
pub mod registry;
pub mod resolver;

// Re-exports
pub use detect::{Classifier, MagicClassifier, PayloadFormat};
pub use extcompress_core::{ContentType, ExtCompressError, FilterDescriptor, OperationMode, Result};
pub use filter::Filter;
pub use job::{ExitHandle, InputStream, StreamJob, run_to_completion};
pub use registry::FilterRegistry;
pub use resolver::ContentTypeResolver;

#[cfg(unix)]
pub use job::TERMINATION_SIGNAL;
