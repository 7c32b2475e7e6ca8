//! Content items and the per-item stage machine.

use crate::{MergeOutcome, StageConfig, StageKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of a content item.
///
/// Also used as the progress topic for the item.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[display("{_0}")]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

/// Stage of the pipeline an item currently occupies.
///
/// Stages are ordered; an item only ever moves forward through them.
/// `Failed` is reachable only from `Text`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PipelineStage {
    /// Created, pipeline not started
    Pending,
    /// Rewriting the source text
    Text,
    /// Generating one image per segment
    Images,
    /// Generating one narration clip per segment
    Audio,
    /// Concatenating narration clips
    Merge,
    /// No enabled stage remains
    Done,
    /// Text generation failed; nothing downstream ran
    Failed,
}

impl PipelineStage {
    /// Check if no automatic transition leaves this stage.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    /// The segment kind processed while in this stage, if any.
    pub fn segment_kind(&self) -> Option<StageKind> {
        match self {
            PipelineStage::Images => Some(StageKind::Image),
            PipelineStage::Audio => Some(StageKind::Audio),
            _ => None,
        }
    }

    /// The next enabled stage after this one under `config`.
    ///
    /// Disabled stages are bypassed. Merge is enabled only when audio is.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyloom_core::{PipelineStage, StageConfig};
    ///
    /// let config = StageConfig::builder().generate_images(false).build().unwrap();
    /// assert_eq!(PipelineStage::Text.next_enabled(&config), PipelineStage::Audio);
    /// ```
    pub fn next_enabled(&self, config: &StageConfig) -> PipelineStage {
        let mut stage = *self;
        loop {
            stage = match stage {
                PipelineStage::Pending => PipelineStage::Text,
                PipelineStage::Text => PipelineStage::Images,
                PipelineStage::Images => PipelineStage::Audio,
                PipelineStage::Audio => PipelineStage::Merge,
                PipelineStage::Merge | PipelineStage::Done => return PipelineStage::Done,
                PipelineStage::Failed => return PipelineStage::Failed,
            };
            if config.stage_enabled(stage) {
                return stage;
            }
        }
    }
}

/// Per-stage completion flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFlags {
    /// Text generation finished
    pub text_done: bool,
    /// Every image segment reached a terminal state
    pub images_done: bool,
    /// Every audio segment reached a terminal state
    pub audio_done: bool,
}

impl StageFlags {
    /// Mark the stage as finished.
    pub fn mark(&mut self, stage: PipelineStage) {
        match stage {
            PipelineStage::Text => self.text_done = true,
            PipelineStage::Images => self.images_done = true,
            PipelineStage::Audio => self.audio_done = true,
            _ => {}
        }
    }
}

/// One source document moving through the pipeline.
///
/// # Examples
///
/// ```
/// use storyloom_core::{ContentItem, PipelineStage, StageConfig};
///
/// let item = ContentItem::new("Once upon a time.", StageConfig::default());
/// assert_eq!(item.stage, PipelineStage::Pending);
/// assert!(item.generated_text.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Item identifier
    pub id: ItemId,
    /// Text supplied by the user
    pub source_text: String,
    /// Text produced by the text stage
    pub generated_text: Option<String>,
    /// Current pipeline stage
    pub stage: PipelineStage,
    /// Stage completion flags
    pub flags: StageFlags,
    /// Which stages run and how
    pub config: StageConfig,
    /// At least one segment ended in `failed`
    pub partially_failed: bool,
    /// Reason the item moved to `Failed`
    pub failure_reason: Option<String>,
    /// Result of the most recent merge attempt
    pub merge_outcome: Option<MergeOutcome>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Time of the last stage transition
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    /// Create a pending item with a fresh id.
    pub fn new(source_text: impl Into<String>, config: StageConfig) -> Self {
        let now = Utc::now();
        Self {
            id: ItemId::new(),
            source_text: source_text.into(),
            generated_text: None,
            stage: PipelineStage::Pending,
            flags: StageFlags::default(),
            config,
            partially_failed: false,
            failure_reason: None,
            merge_outcome: None,
            created_at: now,
            updated_at: now,
        }
    }
}
