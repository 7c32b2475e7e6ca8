//! Segments: chunk-sized units of image or audio generation.

use crate::ItemId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of artifact a segment produces.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StageKind {
    /// One illustration per segment
    Image,
    /// One narration clip per segment
    Audio,
}

/// Processing state of a segment.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SegmentStatus {
    /// Waiting for a worker
    Pending,
    /// Claimed by a worker
    Processing,
    /// Artifact stored
    Completed,
    /// Every retry tier failed
    Failed,
}

impl SegmentStatus {
    /// `Completed` and `Failed` are terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SegmentStatus::Completed | SegmentStatus::Failed)
    }
}

/// Prompt variant that produced (or last attempted) a segment's artifact.
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RetryTier {
    /// First attempt
    Original,
    /// Same prompt, second attempt
    Repeat,
    /// Prompt rewritten to avoid policy triggers
    Sanitized,
    /// Prompt reduced to subject, action and setting
    Simplified,
    /// Local deterministic simplification after the simplifier failed
    LocalFallback,
}

/// Unique address of a segment.
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
)]
#[display("{item_id}/{kind}/{index}")]
pub struct SegmentKey {
    /// Owning item
    pub item_id: ItemId,
    /// Artifact kind
    pub kind: StageKind,
    /// Zero-based position within the item and kind
    pub index: usize,
}

impl SegmentKey {
    /// Create a key.
    pub fn new(item_id: ItemId, kind: StageKind, index: usize) -> Self {
        Self {
            item_id,
            kind,
            index,
        }
    }
}

/// Details recorded about a finished generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct SegmentMetadata {
    /// Model reported by the generator
    model: Option<String>,
    /// Wall time spent across all attempts
    processing_ms: u64,
    /// Tier of the successful attempt
    tier: RetryTier,
    /// Prompt text of the successful attempt
    prompt: String,
    /// Clip length for audio segments, when the header could be read
    duration_secs: Option<f64>,
    /// Stored artifact size
    byte_size: u64,
}

impl SegmentMetadata {
    /// Create metadata for a successful attempt.
    pub fn new(
        model: Option<String>,
        processing_ms: u64,
        tier: RetryTier,
        prompt: impl Into<String>,
        duration_secs: Option<f64>,
        byte_size: u64,
    ) -> Self {
        Self {
            model,
            processing_ms,
            tier,
            prompt: prompt.into(),
            duration_secs,
            byte_size,
        }
    }
}

/// One chunk of an item's text and the artifact generated from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Owning item
    pub item_id: ItemId,
    /// Artifact kind
    pub kind: StageKind,
    /// Zero-based position within the item and kind
    pub index: usize,
    /// Text slice the artifact is generated from
    pub source_text: String,
    /// Stored artifact location
    pub artifact: Option<PathBuf>,
    /// Processing state
    pub status: SegmentStatus,
    /// Last error message when failed
    pub failure_reason: Option<String>,
    /// Generation details when completed
    pub metadata: Option<SegmentMetadata>,
    /// Time of the last status change
    pub updated_at: DateTime<Utc>,
}

impl Segment {
    /// Create a pending segment.
    pub fn pending(
        item_id: ItemId,
        kind: StageKind,
        index: usize,
        source_text: impl Into<String>,
    ) -> Self {
        Self {
            item_id,
            kind,
            index,
            source_text: source_text.into(),
            artifact: None,
            status: SegmentStatus::Pending,
            failure_reason: None,
            metadata: None,
            updated_at: Utc::now(),
        }
    }

    /// Build one pending segment per chunk, indexed from zero.
    pub fn from_chunks(item_id: ItemId, kind: StageKind, chunks: Vec<String>) -> Vec<Segment> {
        chunks
            .into_iter()
            .enumerate()
            .map(|(index, text)| Segment::pending(item_id, kind, index, text))
            .collect()
    }

    /// The segment's address.
    pub fn key(&self) -> SegmentKey {
        SegmentKey::new(self.item_id, self.kind, self.index)
    }

    /// Claim the segment for a worker.
    pub fn mark_processing(&mut self) {
        self.status = SegmentStatus::Processing;
        self.updated_at = Utc::now();
    }

    /// Record a stored artifact.
    pub fn mark_completed(&mut self, artifact: PathBuf, metadata: SegmentMetadata) {
        self.status = SegmentStatus::Completed;
        self.artifact = Some(artifact);
        self.metadata = Some(metadata);
        self.failure_reason = None;
        self.updated_at = Utc::now();
    }

    /// Record a terminal failure.
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = SegmentStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.updated_at = Utc::now();
    }

    /// Return a failed segment to the queue, keeping nothing from the failed run.
    pub fn reset(&mut self) {
        self.status = SegmentStatus::Pending;
        self.failure_reason = None;
        self.artifact = None;
        self.metadata = None;
        self.updated_at = Utc::now();
    }
}
