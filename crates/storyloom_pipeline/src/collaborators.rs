//! Injected collaborators shared by the orchestrator and its workers.

use std::sync::Arc;
use storyloom_audio::AudioMerger;
use storyloom_error::{PipelineError, PipelineErrorKind};
use storyloom_interface::{
    ArtifactStore, ContentItemStore, EventBus, ImageGenerator, MergeRecordStore, PromptSanitizer,
    PromptSimplifier, SegmentStore, SpeechGenerator, TextGenerator,
};
use storyloom_rate_limit::CredentialGate;

/// Everything the pipeline calls out to.
///
/// Every field is required; cloning is cheap since each handle is shared.
///
/// # Example
///
/// ```rust,ignore
/// let collaborators = Collaborators::builder()
///     .gate(gate)
///     .text(Arc::new(text))
///     .image(Arc::new(image))
///     .speech(Arc::new(speech))
///     .sanitizer(Arc::new(sanitizer))
///     .simplifier(Arc::new(simplifier))
///     .items(Arc::new(InMemoryContentItemStore::new()))
///     .segments(Arc::new(InMemorySegmentStore::new()))
///     .merges(Arc::new(InMemoryMergeRecordStore::new()))
///     .artifacts(Arc::new(FileSystemArtifactStore::new("./artifacts")?))
///     .bus(Arc::new(BroadcastEventBus::new()))
///     .merger(AudioMerger::new("./merged"))
///     .build()?;
/// ```
#[derive(Clone, derive_builder::Builder)]
#[builder(build_fn(private, name = "build_internal"))]
pub struct Collaborators {
    /// Credential rotation for every remote call
    pub gate: CredentialGate,
    /// Rewrites the source text and produces the image master context
    pub text: Arc<dyn TextGenerator>,
    /// Illustrates image segments
    pub image: Arc<dyn ImageGenerator>,
    /// Narrates audio segments
    pub speech: Arc<dyn SpeechGenerator>,
    /// Second retry tier
    pub sanitizer: Arc<dyn PromptSanitizer>,
    /// Third retry tier
    pub simplifier: Arc<dyn PromptSimplifier>,
    /// Content item persistence
    pub items: Arc<dyn ContentItemStore>,
    /// Segment persistence
    pub segments: Arc<dyn SegmentStore>,
    /// Merge record persistence
    pub merges: Arc<dyn MergeRecordStore>,
    /// Generated artifact storage
    pub artifacts: Arc<dyn ArtifactStore>,
    /// Progress transport
    pub bus: Arc<dyn EventBus>,
    /// Narration concatenation
    pub merger: AudioMerger,
}

impl CollaboratorsBuilder {
    /// Build the collaborator set.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first collaborator left unset.
    pub fn build(&self) -> Result<Collaborators, PipelineError> {
        self.build_internal()
            .map_err(|e| PipelineError::new(PipelineErrorKind::InvalidConfig(e.to_string())))
    }
}

impl Collaborators {
    /// Creates a new collaborators builder.
    pub fn builder() -> CollaboratorsBuilder {
        CollaboratorsBuilder::default()
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("gate", &self.gate)
            .field("text_model", &self.text.model_name())
            .field("image_model", &self.image.model_name())
            .field("speech_model", &self.speech.model_name())
            .field("merger", &self.merger)
            .finish_non_exhaustive()
    }
}
