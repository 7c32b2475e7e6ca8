//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Storyloom - illustrated, narrated stories from plain text
#[derive(Parser, Debug)]
#[command(name = "storyloom")]
#[command(about = "Illustrated, narrated stories from plain text", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file to use instead of the layered defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split a text file into generation segments
    Chunk {
        /// Text file to split
        file: PathBuf,

        /// Words per segment; defaults to the configured value
        #[arg(long)]
        words: Option<usize>,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Concatenate WAV files in the given order
    Merge {
        /// Merged output file
        #[arg(long)]
        output: PathBuf,

        /// Input WAV files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Show size, duration and format of a WAV file
    Inspect {
        /// WAV file to inspect
        file: PathBuf,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Delete an item's merged tracks older than a given age
    Cleanup {
        /// Content item id
        item: uuid::Uuid,

        /// Minimum age in seconds of files to delete
        #[arg(long, default_value = "86400")]
        max_age_secs: u64,
    },

    /// List the credentials found in the environment
    Credentials {
        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Print the effective configuration
    Config,
}

/// Output format for command results
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Human,
    /// JSON output
    Json,
}
