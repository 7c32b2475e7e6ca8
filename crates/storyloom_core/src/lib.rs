//! Core data types for the Storyloom content-generation pipeline.
//!
//! This crate provides the data model shared by every pipeline stage, the
//! sentence-respecting text [`split`] used to cut generated text into segments,
//! and tracing initialisation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chunker;
mod credential;
mod item;
mod merge;
mod progress;
mod segment;
mod stage_config;
mod telemetry;

pub use chunker::{ends_sentence, split};
pub use credential::Credential;
pub use item::{ContentItem, ItemId, PipelineStage, StageFlags};
pub use merge::{MergeOutcome, MergeRecord};
pub use progress::{MergePhase, ProgressEvent, StageCounts, StatusSnapshot};
pub use segment::{RetryTier, Segment, SegmentKey, SegmentMetadata, SegmentStatus, StageKind};
pub use stage_config::{StageConfig, StageConfigBuilder};
pub use telemetry::{LogFormat, init_telemetry, init_telemetry_with_format, shutdown_telemetry};
