//! Storyloom CLI binary.
//!
//! Offline tooling around the pipeline:
//! - Preview how a text splits into segments
//! - Merge, inspect and clean up narration WAV files
//! - Check credentials and the effective configuration

use clap::Parser;
use storyloom::{LogFormat, StoryloomConfig};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = cli::Cli::parse();

    let log_format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    storyloom::init_telemetry_with_format(log_format)?;

    let config = match &cli.config {
        Some(path) => StoryloomConfig::from_file(path)?,
        None => StoryloomConfig::load()?,
    };

    let result = cli::run(cli.command, &config).await;
    storyloom::shutdown_telemetry();
    result
}
