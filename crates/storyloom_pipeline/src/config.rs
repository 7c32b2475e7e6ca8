//! Worker pool sizing.

use serde::{Deserialize, Serialize};

/// Concurrency limits for the per-stage worker pools.
///
/// # Example
///
/// ```toml
/// [pipeline]
/// text_workers = 2
/// image_workers = 4
/// audio_workers = 2
/// merge_workers = 1
/// queue_capacity = 256
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct PipelineConfig {
    /// Concurrent TEXT jobs
    #[serde(default = "default_text_workers")]
    text_workers: usize,

    /// Concurrent image segments
    #[serde(default = "default_image_workers")]
    image_workers: usize,

    /// Concurrent audio segments
    #[serde(default = "default_audio_workers")]
    audio_workers: usize,

    /// Concurrent merges
    #[serde(default = "default_merge_workers")]
    merge_workers: usize,

    /// Bound of each stage queue
    #[serde(default = "default_queue_capacity")]
    queue_capacity: usize,
}

fn default_text_workers() -> usize {
    2
}

fn default_image_workers() -> usize {
    4
}

fn default_audio_workers() -> usize {
    2
}

fn default_merge_workers() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            text_workers: default_text_workers(),
            image_workers: default_image_workers(),
            audio_workers: default_audio_workers(),
            merge_workers: default_merge_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}
