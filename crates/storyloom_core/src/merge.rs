//! Merge results.

use crate::ItemId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The merged narration track for an item.
///
/// At most one exists per item; a re-merge replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct MergeRecord {
    /// Owning item
    item_id: ItemId,
    /// Merged file
    output: PathBuf,
    /// Sum of segment durations
    total_duration_secs: f64,
    /// Size of the merged file
    byte_size: u64,
    /// Number of segments merged
    segment_count: usize,
    /// When the merge finished
    created_at: DateTime<Utc>,
}

impl MergeRecord {
    /// Create a record stamped with the current time.
    pub fn new(
        item_id: ItemId,
        output: PathBuf,
        total_duration_secs: f64,
        byte_size: u64,
        segment_count: usize,
    ) -> Self {
        Self {
            item_id,
            output,
            total_duration_secs,
            byte_size,
            segment_count,
            created_at: Utc::now(),
        }
    }
}

/// What happened when the merge stage ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// Waiting for a merge worker
    Queued,
    /// A merge record was written
    Merged,
    /// Some audio segment failed or is missing
    SkippedIncomplete {
        /// Which precondition failed
        reason: String,
    },
    /// The merge engine returned an error
    Failed {
        /// Engine error message
        reason: String,
    },
}
