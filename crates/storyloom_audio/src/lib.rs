//! Audio merge engine for the Storyloom pipeline.
//!
//! Narration segments are PCM WAV files. [`AudioMerger`] concatenates them in
//! index order into one track with the first segment's format, refusing inputs
//! whose format differs.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod format;
mod merger;

pub use format::{AudioFormat, WavInfo, inspect, wav_duration};
pub use merger::{AudioMerger, MergeSummary};
