//! Merge preconditions.

use std::path::PathBuf;
use storyloom_core::{Segment, SegmentStatus};

/// Artifact paths of an item's audio segments in index order.
///
/// `segments` must be sorted by index, as the segment store returns them.
/// Merging requires at least one segment, indices `0..count` without gaps,
/// every segment completed, and every artifact recorded. Otherwise the
/// reason for skipping is returned.
pub fn audio_merge_inputs(segments: &[Segment]) -> Result<Vec<PathBuf>, String> {
    if segments.is_empty() {
        return Err("no audio segments".to_string());
    }
    let mut inputs = Vec::with_capacity(segments.len());
    for (expected, segment) in segments.iter().enumerate() {
        if segment.index != expected {
            return Err(format!("missing segment index {expected}"));
        }
        if segment.status != SegmentStatus::Completed {
            return Err(format!("segment {} is {}", segment.index, segment.status));
        }
        let Some(artifact) = &segment.artifact else {
            return Err(format!("segment {} has no artifact", segment.index));
        };
        inputs.push(artifact.clone());
    }
    Ok(inputs)
}
