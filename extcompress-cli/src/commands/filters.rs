//! Filters command implementation.

use extcompress_core::{FilterDescriptor, OperationMode};
use extcompress_filter::FilterRegistry;
use serde::Serialize;

/// JSON serializable summary of one registered filter.
#[derive(Debug, Serialize)]
struct FilterJson {
    content_type: String,
    program: String,
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved_path: Option<String>,
    commands: Vec<CommandJson>,
}

#[derive(Debug, Serialize)]
struct CommandJson {
    mode: String,
    compress: bool,
    command: String,
}

impl FilterJson {
    fn from_descriptor(content_type: &str, descriptor: &FilterDescriptor) -> Self {
        let resolved = which::which(descriptor.program()).ok();
        Self {
            content_type: content_type.to_string(),
            program: descriptor.program().to_string(),
            available: resolved.is_some(),
            resolved_path: resolved.map(|p| p.display().to_string()),
            commands: OperationMode::ALL
                .into_iter()
                .map(|mode| CommandJson {
                    mode: mode.name().to_string(),
                    compress: mode.is_compress(),
                    command: descriptor.command_line(mode),
                })
                .collect(),
        }
    }
}

/// Output style for the filters listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiltersOutput {
    /// Human-readable table.
    Table,
    /// Machine-readable summary.
    Json,
    /// Registry in configuration-file format, usable with `--config`.
    Config,
}

pub fn cmd_filters(
    registry: &FilterRegistry,
    output: FiltersOutput,
) -> Result<i32, Box<dyn std::error::Error>> {
    match output {
        FiltersOutput::Config => {
            println!("{}", registry.to_json_pretty()?);
        }
        FiltersOutput::Json => {
            let filters: Vec<FilterJson> = registry
                .iter()
                .map(|(content_type, descriptor)| FilterJson::from_descriptor(content_type, descriptor))
                .collect();
            println!("{}", serde_json::to_string_pretty(&filters)?);
        }
        FiltersOutput::Table => {
            println!(
                "{:<28} {:<8} {:<10} {:<14} {:<14}",
                "Content type", "Program", "Available", "Compress", "Decompress"
            );
            println!("{}", "-".repeat(78));
            for (content_type, descriptor) in registry.iter() {
                let available = which::which(descriptor.program()).is_ok();
                println!(
                    "{:<28} {:<8} {:<10} {:<14} {:<14}",
                    content_type,
                    descriptor.program(),
                    if available { "yes" } else { "NO" },
                    descriptor.command_line(OperationMode::StreamCompress),
                    descriptor.command_line(OperationMode::StreamDecompress),
                );
            }
        }
    }
    Ok(0)
}
