//! Layered application configuration.
//!
//! Sources, later ones overriding earlier ones:
//! - Bundled defaults (include_str! from storyloom.toml)
//! - `~/.config/storyloom/storyloom.toml`
//! - `./storyloom.toml`

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storyloom_audio::AudioMerger;
use storyloom_core::StageConfig;
use storyloom_error::{ConfigError, PipelineError, StoryloomError, StoryloomResult};
use storyloom_pipeline::PipelineConfig;
use storyloom_rate_limit::{CredentialGate, GateConfig};
use storyloom_storage::FileSystemArtifactStore;
use tracing::{debug, instrument};

/// Environment variable holding the first credential; numbered variants follow.
pub const CREDENTIAL_ENV_PREFIX: &str = "GEMINI_API_KEY";

const DEFAULT_CONFIG: &str = include_str!("../../../storyloom.toml");

/// Where generated files go.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct StorageConfig {
    /// Root of the artifact store
    #[serde(default = "default_artifact_dir")]
    artifact_dir: PathBuf,

    /// Root of merged narration tracks
    #[serde(default = "default_merge_dir")]
    merge_dir: PathBuf,
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("storyloom/artifacts")
}

fn default_merge_dir() -> PathBuf {
    PathBuf::from("storyloom/merged")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            merge_dir: default_merge_dir(),
        }
    }
}

/// Stage settings applied to new items.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct DefaultsConfig {
    /// Words per image and audio segment
    #[serde(default = "default_words_per_chunk")]
    words_per_chunk: usize,

    /// Narration voice
    #[serde(default = "default_voice")]
    voice: String,

    /// Requested image dimensions
    #[serde(default = "default_image_size")]
    image_size: String,

    /// Optional style applied to every image
    #[serde(default)]
    art_style: Option<String>,
}

fn default_words_per_chunk() -> usize {
    500
}

fn default_voice() -> String {
    "Kore".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            words_per_chunk: default_words_per_chunk(),
            voice: default_voice(),
            image_size: default_image_size(),
            art_style: None,
        }
    }
}

impl DefaultsConfig {
    /// Stage config for a new item with every stage enabled.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when `words_per_chunk` is zero.
    pub fn stage_config(&self) -> Result<StageConfig, PipelineError> {
        let mut builder = StageConfig::builder();
        builder
            .words_per_chunk_image(self.words_per_chunk)
            .words_per_chunk_audio(self.words_per_chunk)
            .voice(self.voice.clone())
            .image_size(self.image_size.clone());
        if let Some(style) = &self.art_style {
            builder.art_style(style.clone());
        }
        builder.build()
    }
}

/// Top-level Storyloom configuration.
///
/// # Example
///
/// ```no_run
/// use storyloom::StoryloomConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = StoryloomConfig::load()?;
/// println!("{} image workers", config.pipeline.image_workers());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoryloomConfig {
    /// Credential rotation
    #[serde(default)]
    pub gate: GateConfig,

    /// Worker pools
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Output locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Per-item stage defaults
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

impl StoryloomConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> StoryloomResult<Self> {
        debug!("Loading configuration from file");
        let path = path.as_ref();
        Config::builder()
            .add_source(File::from(path))
            .build()
            .map_err(|e| {
                StoryloomError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                StoryloomError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Parse configuration from TOML text layered over the bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema.
    pub fn from_toml(text: &str) -> StoryloomResult<Self> {
        Self::deserialize_builder(
            Config::builder()
                .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
                .add_source(File::from_str(text, FileFormat::Toml)),
        )
    }

    /// Load configuration with precedence: current dir > home dir > bundled defaults.
    ///
    /// Missing user files are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file fails to parse.
    #[instrument]
    pub fn load() -> StoryloomResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");
        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/storyloom/storyloom.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("storyloom").required(false));
        Self::deserialize_builder(builder)
    }

    fn deserialize_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> StoryloomResult<Self> {
        builder
            .build()
            .map_err(|e| {
                StoryloomError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                StoryloomError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Gate over the credentials found in the environment.
    ///
    /// # Errors
    ///
    /// Returns an error when no credential is set.
    pub fn credential_gate(&self) -> StoryloomResult<CredentialGate> {
        Ok(CredentialGate::from_env(
            CREDENTIAL_ENV_PREFIX,
            self.gate.clone(),
        )?)
    }

    /// Artifact store rooted at `storage.artifact_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn artifact_store(&self) -> StoryloomResult<FileSystemArtifactStore> {
        Ok(FileSystemArtifactStore::new(self.storage.artifact_dir())?)
    }

    /// Merger writing under `storage.merge_dir`.
    pub fn audio_merger(&self) -> AudioMerger {
        AudioMerger::new(self.storage.merge_dir())
    }
}
