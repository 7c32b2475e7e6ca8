//! Artifact storage and in-memory repositories for the Storyloom pipeline.
//!
//! [`FileSystemArtifactStore`] keeps generated images and audio on disk with
//! atomic writes. The `InMemory*` stores implement the repository traits for
//! single-process deployments and tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod filesystem;
mod memory;

pub use filesystem::FileSystemArtifactStore;
pub use memory::{InMemoryContentItemStore, InMemoryMergeRecordStore, InMemorySegmentStore};
