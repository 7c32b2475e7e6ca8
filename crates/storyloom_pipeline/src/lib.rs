//! The Storyloom pipeline: orchestrator, segment workers and progress channel.
//!
//! A [`ContentItem`](storyloom_core::ContentItem) moves through
//! `Text → Images → Audio → Merge → Done`. TEXT rewrites the source with one
//! gated call; IMAGES and AUDIO split the result into segments, each handled
//! by a [`SegmentWorker`] with tiered prompt degradation; MERGE concatenates
//! the narration when every audio segment completed.
//!
//! # Example
//!
//! ```rust,ignore
//! let orchestrator = Orchestrator::new(collaborators, PipelineConfig::default());
//! let item_id = orchestrator.create_item(text, StageConfig::default()).await?;
//! let mut events = orchestrator.subscribe(item_id);
//! orchestrator.start_pipeline(item_id, StageConfig::default()).await?;
//! while let Some(event) = events.next().await {
//!     println!("{event:?}");
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod collaborators;
mod config;
mod context;
mod merge;
mod orchestrator;
mod progress;
mod prompt;
mod worker;

pub use collaborators::{Collaborators, CollaboratorsBuilder};
pub use config::PipelineConfig;
pub use context::MasterContextCache;
pub use merge::audio_merge_inputs;
pub use orchestrator::Orchestrator;
pub use progress::{BroadcastEventBus, ProgressChannel};
pub use prompt::{
    DEFAULT_NARRATION_INSTRUCTION, MASTER_PROMPT_INSTRUCTION, audio_context, fallback_prompt,
    image_prompt, master_instruction,
};
pub use worker::SegmentWorker;
