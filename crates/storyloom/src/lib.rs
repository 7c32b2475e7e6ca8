//! Storyloom - illustrated, narrated stories from plain text.
//!
//! A content item's text is rewritten once, split into sentence-aligned
//! segments, illustrated and narrated segment by segment through a rotating
//! pool of rate-limited credentials, and finally merged into one narration
//! track.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use storyloom::{Collaborators, Orchestrator, StoryloomConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     storyloom::init_telemetry()?;
//!     let config = StoryloomConfig::load()?;
//!     let collaborators = Collaborators::builder()
//!         .gate(config.credential_gate()?)
//!         // generators, stores and bus for your deployment
//!         .build()?;
//!     let orchestrator = Orchestrator::new(collaborators, config.pipeline.clone());
//!     let stage_config = config.defaults.stage_config()?;
//!     let item = orchestrator.create_item(text, stage_config.clone()).await?;
//!     orchestrator.start_pipeline(item, stage_config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `storyloom_error` - Error types
//! - `storyloom_core` - Data model, chunker and telemetry
//! - `storyloom_interface` - Collaborator traits
//! - `storyloom_rate_limit` - Credential gate
//! - `storyloom_storage` - Artifact store and in-memory repositories
//! - `storyloom_audio` - WAV merge engine
//! - `storyloom_pipeline` - Orchestrator, segment worker and progress channel
//!
//! This crate re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;

pub use config::{CREDENTIAL_ENV_PREFIX, DefaultsConfig, StorageConfig, StoryloomConfig};

// Error types
pub use storyloom_error::{
    ConfigError, GenerationError, GenerationErrorKind, MergeError, MergeErrorKind, PipelineError,
    PipelineErrorKind, RepositoryError, RepositoryErrorKind, RetryableError, StorageError,
    StorageErrorKind, StoryloomError, StoryloomErrorKind, StoryloomResult,
};

// Data model and telemetry
pub use storyloom_core::{
    ContentItem, Credential, ItemId, LogFormat, MergeOutcome, MergePhase, MergeRecord,
    PipelineStage, ProgressEvent, RetryTier, Segment, SegmentKey, SegmentMetadata, SegmentStatus,
    StageConfig, StageConfigBuilder, StageCounts, StageFlags, StageKind, StatusSnapshot,
    ends_sentence, init_telemetry, init_telemetry_with_format, shutdown_telemetry, split,
};

// Collaborator traits
pub use storyloom_interface::{
    ArtifactStore, ContentItemStore, EventBus, EventStream, ImageGenerator, ImageOptions,
    ImageOptionsBuilder, ItemMutation, MergeRecordStore, PromptSanitizer, PromptSimplifier,
    SegmentStore, SpeechGenerator, TextGenerator,
};

// Credential gate
pub use storyloom_rate_limit::{
    CredentialGate, CredentialStats, GateConfig, GateStats, credentials_from_env,
    credentials_from_lookup,
};

// Storage
pub use storyloom_storage::{
    FileSystemArtifactStore, InMemoryContentItemStore, InMemoryMergeRecordStore,
    InMemorySegmentStore,
};

// Audio
pub use storyloom_audio::{AudioFormat, AudioMerger, MergeSummary, WavInfo, inspect, wav_duration};

// Pipeline
pub use storyloom_pipeline::{
    BroadcastEventBus, Collaborators, CollaboratorsBuilder, MasterContextCache, Orchestrator,
    PipelineConfig, ProgressChannel, SegmentWorker, audio_merge_inputs, fallback_prompt,
};
