//! Per-item stage configuration.

use crate::{PipelineStage, StageKind};
use serde::{Deserialize, Serialize};
use storyloom_error::{PipelineError, PipelineErrorKind};

/// Which stages run for an item and how their prompts are shaped.
///
/// # Examples
///
/// ```
/// use storyloom_core::{StageConfig, StageKind};
///
/// let config = StageConfig::builder()
///     .words_per_chunk_audio(250usize)
///     .voice("Puck")
///     .build()
///     .unwrap();
///
/// assert_eq!(config.words_per_chunk(StageKind::Audio), 250);
/// assert_eq!(config.words_per_chunk(StageKind::Image), 500);
/// assert_eq!(config.voice(), "Puck");
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default, setter(into), build_fn(private, name = "build_internal"))]
pub struct StageConfig {
    /// Run the image stage
    #[serde(default = "default_enabled")]
    generate_images: bool,
    /// Run the audio stage
    #[serde(default = "default_enabled")]
    generate_audio: bool,
    /// Merge narration clips once the audio stage completes
    #[serde(default = "default_enabled")]
    merge_audio: bool,
    /// Target words per image segment
    #[serde(default = "default_words_per_chunk")]
    words_per_chunk_image: usize,
    /// Target words per audio segment
    #[serde(default = "default_words_per_chunk")]
    words_per_chunk_audio: usize,
    /// Instruction for the text stage
    #[serde(default)]
    #[builder(setter(into, strip_option))]
    text_prompt: Option<String>,
    /// Extra direction folded into the image master prompt
    #[serde(default)]
    #[builder(setter(into, strip_option))]
    image_prompt: Option<String>,
    /// Narration instruction for the audio stage
    #[serde(default)]
    #[builder(setter(into, strip_option))]
    audio_prompt: Option<String>,
    /// Speech voice name
    #[serde(default = "default_voice")]
    voice: String,
    /// Requested image dimensions, e.g. `1024x1024`
    #[serde(default = "default_image_size")]
    image_size: String,
    /// Illustration style
    #[serde(default)]
    #[builder(setter(into, strip_option))]
    art_style: Option<String>,
}

fn default_enabled() -> bool {
    true
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

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            generate_images: default_enabled(),
            generate_audio: default_enabled(),
            merge_audio: default_enabled(),
            words_per_chunk_image: default_words_per_chunk(),
            words_per_chunk_audio: default_words_per_chunk(),
            text_prompt: None,
            image_prompt: None,
            audio_prompt: None,
            voice: default_voice(),
            image_size: default_image_size(),
            art_style: None,
        }
    }
}

impl StageConfigBuilder {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a word count is zero.
    pub fn build(&self) -> Result<StageConfig, PipelineError> {
        let config = self
            .build_internal()
            .map_err(|e| PipelineError::new(PipelineErrorKind::InvalidConfig(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }
}

impl StageConfig {
    /// Creates a new stage config builder.
    pub fn builder() -> StageConfigBuilder {
        StageConfigBuilder::default()
    }

    /// Check that every word count is at least one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.words_per_chunk_image == 0 {
            return Err(PipelineError::new(PipelineErrorKind::InvalidConfig(
                "words_per_chunk_image must be at least 1".to_string(),
            )));
        }
        if self.words_per_chunk_audio == 0 {
            return Err(PipelineError::new(PipelineErrorKind::InvalidConfig(
                "words_per_chunk_audio must be at least 1".to_string(),
            )));
        }
        Ok(())
    }

    /// Target words per segment for a kind.
    pub fn words_per_chunk(&self, kind: StageKind) -> usize {
        match kind {
            StageKind::Image => self.words_per_chunk_image,
            StageKind::Audio => self.words_per_chunk_audio,
        }
    }

    /// Check whether a segment kind runs.
    pub fn kind_enabled(&self, kind: StageKind) -> bool {
        match kind {
            StageKind::Image => self.generate_images,
            StageKind::Audio => self.generate_audio,
        }
    }

    /// Check whether a pipeline stage runs.
    ///
    /// Text and Done always run; merge needs audio.
    pub fn stage_enabled(&self, stage: PipelineStage) -> bool {
        match stage {
            PipelineStage::Text | PipelineStage::Done => true,
            PipelineStage::Images => self.generate_images,
            PipelineStage::Audio => self.generate_audio,
            PipelineStage::Merge => self.generate_audio && self.merge_audio,
            PipelineStage::Pending | PipelineStage::Failed => false,
        }
    }
}
