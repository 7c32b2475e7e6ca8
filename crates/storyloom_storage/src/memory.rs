//! In-memory repositories.
//!
//! Each store keeps its rows in a map behind a `tokio::sync::RwLock`. Writes
//! take the write lock for the whole read-modify-write, so per-row updates are
//! atomic. All data is lost when the store is dropped.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use storyloom_core::{
    ContentItem, ItemId, MergeRecord, PipelineStage, Segment, SegmentKey, SegmentStatus,
    StageCounts, StageKind,
};
use storyloom_error::{RepositoryError, RepositoryErrorKind};
use storyloom_interface::{ContentItemStore, ItemMutation, MergeRecordStore, SegmentStore};
use tokio::sync::RwLock;

fn item_not_found(id: ItemId) -> RepositoryError {
    RepositoryError::new(RepositoryErrorKind::ItemNotFound(id.to_string()))
}

/// In-memory content item store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContentItemStore {
    items: Arc<RwLock<HashMap<ItemId, ContentItem>>>,
}

impl InMemoryContentItemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl ContentItemStore for InMemoryContentItemStore {
    async fn insert(&self, item: ContentItem) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        if items.contains_key(&item.id) {
            return Err(RepositoryError::new(RepositoryErrorKind::DuplicateItem(
                item.id.to_string(),
            )));
        }
        items.insert(item.id, item);
        Ok(())
    }

    async fn get(&self, id: ItemId) -> Result<Option<ContentItem>, RepositoryError> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn advance(
        &self,
        id: ItemId,
        from: PipelineStage,
        to: PipelineStage,
    ) -> Result<bool, RepositoryError> {
        let mut items = self.items.write().await;
        let item = items.get_mut(&id).ok_or_else(|| item_not_found(id))?;
        if item.stage != from {
            tracing::debug!(
                item_id = %id,
                current = %item.stage,
                expected = %from,
                "Stale stage transition ignored"
            );
            return Ok(false);
        }
        item.flags.mark(from);
        item.stage = to;
        item.updated_at = Utc::now();
        tracing::debug!(item_id = %id, %from, %to, "Item advanced");
        Ok(true)
    }

    async fn modify(
        &self,
        id: ItemId,
        mutation: ItemMutation,
    ) -> Result<ContentItem, RepositoryError> {
        let mut items = self.items.write().await;
        let item = items.get_mut(&id).ok_or_else(|| item_not_found(id))?;
        mutation(item);
        item.updated_at = Utc::now();
        Ok(item.clone())
    }
}

/// In-memory segment store ordered by `{item, kind, index}`.
#[derive(Debug, Clone, Default)]
pub struct InMemorySegmentStore {
    segments: Arc<RwLock<BTreeMap<SegmentKey, Segment>>>,
}

impl InMemorySegmentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored segments across all items.
    pub async fn len(&self) -> usize {
        self.segments.read().await.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.segments.read().await.is_empty()
    }
}

fn range_for(item: ItemId, kind: StageKind) -> std::ops::RangeInclusive<SegmentKey> {
    SegmentKey::new(item, kind, 0)..=SegmentKey::new(item, kind, usize::MAX)
}

#[async_trait]
impl SegmentStore for InMemorySegmentStore {
    async fn create_bulk(&self, segments: Vec<Segment>) -> Result<(), RepositoryError> {
        let mut stored = self.segments.write().await;
        if let Some(existing) = segments.iter().find(|s| stored.contains_key(&s.key())) {
            return Err(RepositoryError::new(RepositoryErrorKind::DuplicateSegment(
                existing.key().to_string(),
            )));
        }
        let count = segments.len();
        for segment in segments {
            stored.insert(segment.key(), segment);
        }
        tracing::debug!(count, "Segments created");
        Ok(())
    }

    async fn get(&self, key: SegmentKey) -> Result<Option<Segment>, RepositoryError> {
        Ok(self.segments.read().await.get(&key).cloned())
    }

    async fn update(&self, segment: Segment) -> Result<(), RepositoryError> {
        let mut stored = self.segments.write().await;
        let key = segment.key();
        match stored.get_mut(&key) {
            Some(slot) => {
                *slot = segment;
                Ok(())
            }
            None => Err(RepositoryError::new(RepositoryErrorKind::SegmentNotFound(
                key.to_string(),
            ))),
        }
    }

    async fn claim(&self, key: SegmentKey) -> Result<Option<Segment>, RepositoryError> {
        let mut stored = self.segments.write().await;
        let segment = stored.get_mut(&key).ok_or_else(|| {
            RepositoryError::new(RepositoryErrorKind::SegmentNotFound(key.to_string()))
        })?;
        if segment.status != SegmentStatus::Pending {
            return Ok(None);
        }
        segment.mark_processing();
        Ok(Some(segment.clone()))
    }

    async fn find_for(
        &self,
        item: ItemId,
        kind: StageKind,
    ) -> Result<Vec<Segment>, RepositoryError> {
        Ok(self
            .segments
            .read()
            .await
            .range(range_for(item, kind))
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn count_by_status(
        &self,
        item: ItemId,
        kind: StageKind,
    ) -> Result<StageCounts, RepositoryError> {
        let stored = self.segments.read().await;
        Ok(StageCounts::tally(
            stored.range(range_for(item, kind)).map(|(_, s)| s.status),
        ))
    }
}

/// In-memory merge record store, one record per item.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMergeRecordStore {
    records: Arc<RwLock<HashMap<ItemId, MergeRecord>>>,
}

impl InMemoryMergeRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl MergeRecordStore for InMemoryMergeRecordStore {
    async fn upsert(&self, record: MergeRecord) -> Result<(), RepositoryError> {
        let replaced = self
            .records
            .write()
            .await
            .insert(*record.item_id(), record)
            .is_some();
        tracing::debug!(replaced, "Merge record stored");
        Ok(())
    }

    async fn get(&self, item: ItemId) -> Result<Option<MergeRecord>, RepositoryError> {
        Ok(self.records.read().await.get(&item).cloned())
    }
}
