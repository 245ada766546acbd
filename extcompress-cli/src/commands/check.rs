//! Check command implementation.

use extcompress_core::OperationMode;
use extcompress_filter::FilterRegistry;

pub fn cmd_check(registry: &FilterRegistry) -> Result<i32, Box<dyn std::error::Error>> {
    registry.check_programs()?;

    println!("All {} filters available:", registry.len());
    for (content_type, descriptor) in registry.iter() {
        println!(
            "  {:<28} {}",
            content_type,
            descriptor.command_line(OperationMode::StreamCompress)
        );
    }

    Ok(0)
}
