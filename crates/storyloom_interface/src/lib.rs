//! Trait definitions for the collaborators the Storyloom pipeline depends on.
//!
//! Generators wrap remote AI calls, stores persist pipeline state, and the
//! event bus carries progress to subscribers. Every trait is object safe so
//! the pipeline can hold `Arc<dyn Trait>` handles.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod generation;
mod repository;
mod transport;
mod types;

pub use generation::{
    ImageGenerator, PromptSanitizer, PromptSimplifier, SpeechGenerator, TextGenerator,
};
pub use repository::{ArtifactStore, ContentItemStore, ItemMutation, MergeRecordStore, SegmentStore};
pub use transport::{EventBus, EventStream};
pub use types::{ImageOptions, ImageOptionsBuilder};
