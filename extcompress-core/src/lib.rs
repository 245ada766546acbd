//! # extcompress Core
//!
//! Core types for the extcompress filter library.
//!
//! This crate provides the data model shared by every layer:
//!
//! - [`mode`]: the six ways an external filter can be invoked
//! - [`descriptor`]: program + flags per mode for one filter
//! - [`content_type`]: content-type identifiers used to pick a filter
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ CLI                                                     │
//! │     extcompress compress/decompress/detect/check        │
//! ├─────────────────────────────────────────────────────────┤
//! │ Filter                                                  │
//! │     Registry, Resolver, Filter facade, StreamJob        │
//! ├─────────────────────────────────────────────────────────┤
//! │ Core (this crate)                                       │
//! │     FilterDescriptor, OperationMode, ContentType        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use extcompress_core::{FilterDescriptor, OperationMode};
//!
//! let bzip2 = FilterDescriptor::unix_filter("bzip2");
//! assert_eq!(bzip2.command_line(OperationMode::StreamDecompress), "bzip2 -d -c");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod content_type;
pub mod descriptor;
pub mod error;
pub mod mode;

// Re-exports for convenience
pub use content_type::ContentType;
pub use descriptor::{FilterDescriptor, PASSTHROUGH_PROGRAM};
pub use error::{ExtCompressError, Result};
pub use mode::OperationMode;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::content_type::ContentType;
    pub use crate::descriptor::FilterDescriptor;
    pub use crate::error::{ExtCompressError, Result};
    pub use crate::mode::OperationMode;
}
