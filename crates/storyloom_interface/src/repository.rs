//! Persistence traits for pipeline state and artifacts.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use storyloom_core::{
    ContentItem, ItemId, MergeRecord, PipelineStage, Segment, SegmentKey, StageCounts, StageKind,
};
use storyloom_error::{RepositoryError, StorageError};

/// In-place change applied to a stored content item.
pub type ItemMutation = Box<dyn FnOnce(&mut ContentItem) + Send>;

/// Storage for content items.
#[async_trait]
pub trait ContentItemStore: Send + Sync {
    /// Store a new item.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateItem` if the id is taken.
    async fn insert(&self, item: ContentItem) -> Result<(), RepositoryError>;

    /// Fetch an item.
    async fn get(&self, id: ItemId) -> Result<Option<ContentItem>, RepositoryError>;

    /// Move an item from `from` to `to` if it is still in `from`.
    ///
    /// Marks `from` done in the item's flags. Returns `false` without changes
    /// when another caller already moved the item.
    async fn advance(
        &self,
        id: ItemId,
        from: PipelineStage,
        to: PipelineStage,
    ) -> Result<bool, RepositoryError>;

    /// Apply `mutation` atomically and return the updated item.
    async fn modify(&self, id: ItemId, mutation: ItemMutation)
    -> Result<ContentItem, RepositoryError>;
}

/// Storage for segments, keyed by `{item, kind, index}`.
#[async_trait]
pub trait SegmentStore: Send + Sync {
    /// Store a batch of new segments.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateSegment` if any key already exists; nothing is stored
    /// then. Backend failures surface as `Backend`.
    async fn create_bulk(&self, segments: Vec<Segment>) -> Result<(), RepositoryError>;

    /// Fetch one segment.
    async fn get(&self, key: SegmentKey) -> Result<Option<Segment>, RepositoryError>;

    /// Replace a stored segment.
    ///
    /// # Errors
    ///
    /// Returns `SegmentNotFound` if the key does not exist.
    async fn update(&self, segment: Segment) -> Result<(), RepositoryError>;

    /// Atomically move a pending segment to processing.
    ///
    /// Returns `None` when the segment is not pending, which means another
    /// worker holds it or it already finished.
    async fn claim(&self, key: SegmentKey) -> Result<Option<Segment>, RepositoryError>;

    /// All segments of an item and kind, ordered by index.
    async fn find_for(&self, item: ItemId, kind: StageKind)
    -> Result<Vec<Segment>, RepositoryError>;

    /// Status counts for an item and kind.
    async fn count_by_status(
        &self,
        item: ItemId,
        kind: StageKind,
    ) -> Result<StageCounts, RepositoryError>;
}

/// Storage for merge records, one per item.
#[async_trait]
pub trait MergeRecordStore: Send + Sync {
    /// Insert or overwrite the record for its item.
    async fn upsert(&self, record: MergeRecord) -> Result<(), RepositoryError>;

    /// Fetch the record for an item.
    async fn get(&self, item: ItemId) -> Result<Option<MergeRecord>, RepositoryError>;
}

/// Binary artifact storage.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist bytes under a name derived from `suggested_name`.
    async fn save(&self, bytes: &[u8], suggested_name: &str) -> Result<PathBuf, StorageError>;

    /// Read a stored artifact.
    async fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError>;

    /// Remove a stored artifact.
    async fn delete(&self, path: &Path) -> Result<(), StorageError>;
}
