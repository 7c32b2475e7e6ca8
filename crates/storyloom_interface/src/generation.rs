//! Remote generation traits.
//!
//! Every call receives the credential the gate handed out; implementations
//! report failures as [`GenerationError`] so the worker can pick a retry tier.

use crate::ImageOptions;
use async_trait::async_trait;
use storyloom_core::Credential;
use storyloom_error::GenerationError;

/// Rewrites source text into story text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text from `source_text`, steered by an optional instruction.
    async fn generate(
        &self,
        credential: &Credential,
        source_text: &str,
        custom_prompt: Option<&str>,
    ) -> Result<String, GenerationError>;

    /// Model identifier recorded in segment metadata.
    fn model_name(&self) -> &str;
}

/// Produces one image from a prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate encoded image bytes.
    async fn generate(
        &self,
        credential: &Credential,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<Vec<u8>, GenerationError>;

    /// Model identifier recorded in segment metadata.
    fn model_name(&self) -> &str;

    /// File extension for stored artifacts.
    fn file_extension(&self) -> &str {
        "png"
    }
}

/// Produces narration audio for a text.
#[async_trait]
pub trait SpeechGenerator: Send + Sync {
    /// Generate WAV bytes narrating `text` according to `prompt`.
    async fn generate(
        &self,
        credential: &Credential,
        prompt: &str,
        text: &str,
        voice: &str,
    ) -> Result<Vec<u8>, GenerationError>;

    /// Model identifier recorded in segment metadata.
    fn model_name(&self) -> &str;

    /// File extension for stored artifacts.
    fn file_extension(&self) -> &str {
        "wav"
    }
}

/// Rephrases a prompt so it no longer trips content filters.
#[async_trait]
pub trait PromptSanitizer: Send + Sync {
    /// Rewrite `prompt`, preserving its intent.
    async fn rewrite(&self, credential: &Credential, prompt: &str)
    -> Result<String, GenerationError>;
}

/// Reduces a prompt to subject, action and setting.
#[async_trait]
pub trait PromptSimplifier: Send + Sync {
    /// Strip stylistic and technical qualifiers from `prompt`.
    async fn simplify(
        &self,
        credential: &Credential,
        prompt: &str,
    ) -> Result<String, GenerationError>;
}
