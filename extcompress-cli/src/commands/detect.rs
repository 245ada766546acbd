//! Detect command implementation.

use extcompress_filter::{ContentTypeResolver, ExtCompressError, FilterRegistry};
use std::path::Path;

pub fn cmd_detect(
    registry: &FilterRegistry,
    resolver: &ContentTypeResolver,
    file: &Path,
) -> Result<i32, Box<dyn std::error::Error>> {
    let content_type = resolver.classify(file)?;

    println!("File: {}", file.display());
    println!("Content type: {}", content_type);

    match registry.lookup(content_type.as_str()) {
        Ok(filter) => {
            println!("Program: {}", filter.descriptor().program());
            println!("Stream compress: {}", filter.command_stream_compress());
            println!("Stream decompress: {}", filter.command_stream_decompress());
            Ok(0)
        }
        Err(ExtCompressError::UnknownContentType { .. }) => {
            println!("Handler: none");
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}
