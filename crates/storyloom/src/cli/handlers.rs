//! Command handlers.

use super::{Commands, OutputFormat};
use std::path::{Path, PathBuf};
use std::time::Duration;
use storyloom::{ItemId, StoryloomConfig, inspect, split};
use tracing::info;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Run one command against the loaded configuration.
pub async fn run(command: Commands, config: &StoryloomConfig) -> CliResult {
    match command {
        Commands::Chunk {
            file,
            words,
            format,
        } => chunk(&file, words.unwrap_or(*config.defaults.words_per_chunk()), format).await,
        Commands::Merge {
            output,
            inputs,
            format,
        } => merge(config, inputs, output, format).await,
        Commands::Inspect { file, format } => inspect_file(&file, format),
        Commands::Cleanup { item, max_age_secs } => {
            cleanup(config, ItemId::from(item), Duration::from_secs(max_age_secs)).await
        }
        Commands::Credentials { format } => credentials(config, format).await,
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(config)?);
            Ok(())
        }
    }
}

async fn chunk(file: &Path, words: usize, format: OutputFormat) -> CliResult {
    let text = tokio::fs::read_to_string(file).await?;
    let chunks = split(&text, words);
    info!(file = %file.display(), words, chunks = chunks.len(), "Text split");
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&chunks)?),
        OutputFormat::Human => {
            for (index, chunk) in chunks.iter().enumerate() {
                println!(
                    "[{index}] ({} words) {chunk}",
                    chunk.split_whitespace().count()
                );
            }
        }
    }
    Ok(())
}

async fn merge(
    config: &StoryloomConfig,
    inputs: Vec<PathBuf>,
    output: PathBuf,
    format: OutputFormat,
) -> CliResult {
    let merger = config.audio_merger();
    let summary = tokio::task::spawn_blocking(move || merger.merge(&inputs, &output)).await??;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Human => println!(
            "{}: {} segments, {:.2}s, {} bytes",
            summary.output().display(),
            summary.segment_count(),
            summary.total_duration_secs(),
            summary.byte_size()
        ),
    }
    Ok(())
}

fn inspect_file(file: &Path, format: OutputFormat) -> CliResult {
    let info = inspect(file);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info)?),
        OutputFormat::Human => {
            if !info.exists() {
                println!("{}: not found", file.display());
                return Ok(());
            }
            let duration = info
                .duration_secs()
                .map(|secs| format!("{secs:.2}s"))
                .unwrap_or_else(|| "unknown duration".to_string());
            let layout = info
                .format()
                .map(|layout| layout.to_string())
                .unwrap_or_else(|| "unreadable header".to_string());
            println!(
                "{}: {} bytes, {}, {}",
                file.display(),
                info.byte_size(),
                duration,
                layout
            );
        }
    }
    Ok(())
}

async fn cleanup(config: &StoryloomConfig, item: ItemId, max_age: Duration) -> CliResult {
    let merger = config.audio_merger();
    let removed =
        tokio::task::spawn_blocking(move || merger.cleanup_older_than(item, max_age)).await??;
    println!("Removed {removed} merged file(s) for item {item}");
    Ok(())
}

async fn credentials(config: &StoryloomConfig, format: OutputFormat) -> CliResult {
    let gate = config.credential_gate()?;
    let stats = gate.stats().await;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Human => {
            println!("{} credential(s), {} healthy", stats.total(), stats.healthy());
            for credential in stats.credentials() {
                println!(
                    "  #{} {} ({})",
                    credential.index(),
                    credential.key_preview(),
                    if *credential.healthy() { "healthy" } else { "cooling down" }
                );
            }
        }
    }
    Ok(())
}
