//! Progress events and status snapshots.

use crate::{ItemId, PipelineStage, RetryTier, SegmentStatus, StageKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Checkpoints reported while merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MergePhase {
    /// Checking segment completeness
    Validating,
    /// Concatenating sample data
    Merging,
    /// Writing the merge record
    Finalizing,
}

impl MergePhase {
    /// Percent complete reported for the phase.
    pub fn percent(&self) -> u8 {
        match self {
            MergePhase::Validating => 10,
            MergePhase::Merging => 30,
            MergePhase::Finalizing => 90,
        }
    }
}

/// An event published on an item's progress topic.
///
/// # Examples
///
/// ```
/// use storyloom_core::{ItemId, ProgressEvent, StageKind};
///
/// let id = ItemId::new();
/// let event = ProgressEvent::SegmentFailed {
///     item_id: id,
///     kind: StageKind::Image,
///     index: 2,
///     reason: "blocked".to_string(),
/// };
/// assert_eq!(event.item_id(), id);
/// let json = serde_json::to_string(&event).unwrap();
/// assert!(json.contains("\"event\":\"segment_failed\""));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A stage began work
    StageStarted {
        /// Item
        item_id: ItemId,
        /// Stage entered
        stage: PipelineStage,
        /// Segments dispatched, zero for text and merge
        segment_count: usize,
    },
    /// A segment stored its artifact
    SegmentCompleted {
        /// Item
        item_id: ItemId,
        /// Segment kind
        kind: StageKind,
        /// Segment index
        index: usize,
        /// Tier that succeeded
        tier: RetryTier,
        /// Stored artifact
        artifact: PathBuf,
    },
    /// A segment exhausted every retry tier
    SegmentFailed {
        /// Item
        item_id: ItemId,
        /// Segment kind
        kind: StageKind,
        /// Segment index
        index: usize,
        /// Last error message
        reason: String,
    },
    /// Every segment of a stage reached a terminal state
    StageCompleted {
        /// Item
        item_id: ItemId,
        /// Stage finished
        stage: PipelineStage,
        /// Completed segment count
        completed: usize,
        /// Failed segment count
        failed: usize,
    },
    /// Merge checkpoint
    MergeProgress {
        /// Item
        item_id: ItemId,
        /// Checkpoint reached
        phase: MergePhase,
        /// Percent complete
        percent: u8,
    },
    /// Merged track written
    MergeCompleted {
        /// Item
        item_id: ItemId,
        /// Merged file
        output: PathBuf,
        /// Total duration in seconds
        duration_secs: f64,
        /// Merged file size
        byte_size: u64,
        /// Segments merged
        segment_count: usize,
    },
    /// Merge refused because audio is incomplete
    MergeSkipped {
        /// Item
        item_id: ItemId,
        /// Failed precondition
        reason: String,
    },
    /// Merge engine error
    MergeFailed {
        /// Item
        item_id: ItemId,
        /// Engine error message
        reason: String,
    },
    /// Item reached `Done`
    PipelineCompleted {
        /// Item
        item_id: ItemId,
        /// Some segment failed along the way
        partially_failed: bool,
    },
    /// Item reached `Failed`
    PipelineFailed {
        /// Item
        item_id: ItemId,
        /// Failure message
        reason: String,
    },
}

impl ProgressEvent {
    /// The item this event belongs to.
    pub fn item_id(&self) -> ItemId {
        match self {
            ProgressEvent::StageStarted { item_id, .. }
            | ProgressEvent::SegmentCompleted { item_id, .. }
            | ProgressEvent::SegmentFailed { item_id, .. }
            | ProgressEvent::StageCompleted { item_id, .. }
            | ProgressEvent::MergeProgress { item_id, .. }
            | ProgressEvent::MergeCompleted { item_id, .. }
            | ProgressEvent::MergeSkipped { item_id, .. }
            | ProgressEvent::MergeFailed { item_id, .. }
            | ProgressEvent::PipelineCompleted { item_id, .. }
            | ProgressEvent::PipelineFailed { item_id, .. } => *item_id,
        }
    }

    /// Check if this event reports an error condition.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ProgressEvent::SegmentFailed { .. }
                | ProgressEvent::MergeFailed { .. }
                | ProgressEvent::PipelineFailed { .. }
        )
    }
}

/// Segment counts for one stage kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct StageCounts {
    /// Segments created
    total: usize,
    /// Waiting for a worker
    pending: usize,
    /// Claimed by a worker
    processing: usize,
    /// Artifact stored
    completed: usize,
    /// Exhausted retries
    failed: usize,
    /// Terminal share of the total, in percent
    progress: f64,
}

impl StageCounts {
    /// Tally a set of segment statuses.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyloom_core::{SegmentStatus, StageCounts};
    ///
    /// let counts = StageCounts::tally([
    ///     SegmentStatus::Completed,
    ///     SegmentStatus::Failed,
    ///     SegmentStatus::Pending,
    ///     SegmentStatus::Processing,
    /// ]);
    /// assert_eq!(*counts.total(), 4);
    /// assert_eq!(*counts.progress(), 50.0);
    /// ```
    pub fn tally(statuses: impl IntoIterator<Item = SegmentStatus>) -> Self {
        let mut counts = StageCounts::default();
        for status in statuses {
            counts.total += 1;
            match status {
                SegmentStatus::Pending => counts.pending += 1,
                SegmentStatus::Processing => counts.processing += 1,
                SegmentStatus::Completed => counts.completed += 1,
                SegmentStatus::Failed => counts.failed += 1,
            }
        }
        counts.progress = if counts.total == 0 {
            0.0
        } else {
            (counts.completed + counts.failed) as f64 / counts.total as f64 * 100.0
        };
        counts
    }

    /// Check if segments exist and none are pending or processing.
    pub fn all_terminal(&self) -> bool {
        self.total > 0 && self.pending == 0 && self.processing == 0
    }
}

/// Aggregate progress of one item, computed from the segment store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct StatusSnapshot {
    /// Item
    item_id: ItemId,
    /// Current stage, when the item is known
    stage: Option<PipelineStage>,
    /// Some segment failed
    partially_failed: bool,
    /// Image segment counts
    images: StageCounts,
    /// Audio segment counts
    audio: StageCounts,
}

impl StatusSnapshot {
    /// Assemble a snapshot.
    pub fn new(
        item_id: ItemId,
        stage: Option<PipelineStage>,
        images: StageCounts,
        audio: StageCounts,
    ) -> Self {
        Self {
            item_id,
            stage,
            partially_failed: images.failed > 0 || audio.failed > 0,
            images,
            audio,
        }
    }

    /// Counts for one kind.
    pub fn counts(&self, kind: StageKind) -> &StageCounts {
        match kind {
            StageKind::Image => &self.images,
            StageKind::Audio => &self.audio,
        }
    }
}
