//! extcompress CLI
//!
//! Compress and decompress files through external filter programs (bzip2,
//! gzip, xz, cat), picking the filter from the detected content type.

mod commands;
mod utils;

use clap::{Parser, Subcommand};
use commands::{
    Direction, FiltersOutput, RunOptions, cmd_check, cmd_detect, cmd_filters, cmd_run,
};
use extcompress_filter::{ContentTypeResolver, FilterRegistry};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "extcompress")]
#[command(
    author,
    version,
    about = "Compression through external filter programs"
)]
#[command(long_about = "
extcompress runs bzip2, gzip, xz, or cat on a file, chosen by the file's
detected content type. Every configured program must be in PATH; the tool
refuses to run otherwise.

Examples:
  extcompress check
  extcompress filters --json
  extcompress detect notes.txt.bz2
  extcompress compress --type application/x-bzip2 notes.txt
  extcompress decompress notes.txt.bz2
  extcompress decompress --stdout notes.txt.bz2 | less
  extcompress --config filters.json decompress data.zst
")]
struct Cli {
    /// Filter table (JSON) replacing the built-in filters
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify every configured filter program is in PATH
    Check,

    /// List configured filters
    #[command(alias = "ls")]
    Filters {
        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,

        /// Output the filter table in --config format
        #[arg(long, conflicts_with = "json")]
        export: bool,
    },

    /// Detect a file's content type and its filter
    Detect {
        /// File to detect
        file: PathBuf,
    },

    /// Compress a file
    #[command(alias = "c")]
    Compress {
        /// File to compress
        file: PathBuf,

        /// Target content type, e.g. application/x-bzip2
        #[arg(short = 't', long = "type")]
        content_type: Option<String>,

        /// Write to stdout and keep the file unchanged
        #[arg(short = 'c', long)]
        stdout: bool,
    },

    /// Decompress a file
    #[command(alias = "d")]
    Decompress {
        /// File to decompress
        file: PathBuf,

        /// Content type to assume instead of detecting it
        #[arg(short = 't', long = "type")]
        content_type: Option<String>,

        /// Write to stdout and keep the file unchanged
        #[arg(short = 'c', long)]
        stdout: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    utils::init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let registry = utils::load_registry(cli.config.as_deref())?;

    match cli.command {
        Commands::Check => cmd_check(&registry),
        Commands::Filters { json, export } => {
            let output = if export {
                FiltersOutput::Config
            } else if json {
                FiltersOutput::Json
            } else {
                FiltersOutput::Table
            };
            cmd_filters(&registry, output)
        }
        Commands::Detect { file } => {
            let resolver = start_resolver(&registry)?;
            cmd_detect(&registry, &resolver, &file)
        }
        Commands::Compress {
            file,
            content_type,
            stdout,
        } => {
            let resolver = start_resolver(&registry)?;
            let options = RunOptions {
                direction: Direction::Compress,
                stdout,
                content_type: content_type.as_deref(),
            };
            cmd_run(&registry, &resolver, &file, &options)
        }
        Commands::Decompress {
            file,
            content_type,
            stdout,
        } => {
            let resolver = start_resolver(&registry)?;
            let options = RunOptions {
                direction: Direction::Decompress,
                stdout,
                content_type: content_type.as_deref(),
            };
            cmd_run(&registry, &resolver, &file, &options)
        }
    }
}

/// Verify the filter programs and start classification, for commands that run filters.
fn start_resolver(registry: &FilterRegistry) -> Result<ContentTypeResolver, Box<dyn std::error::Error>> {
    // Fail fast on a missing program rather than on first use.
    registry.check_programs()?;
    Ok(ContentTypeResolver::start()?)
}
