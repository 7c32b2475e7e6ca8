//! Segment stores that misbehave on cue, wrapping the in-memory store.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use storyloom_core::{ItemId, Segment, SegmentKey, StageCounts, StageKind};
use storyloom_error::{RepositoryError, RepositoryErrorKind};
use storyloom_interface::SegmentStore;
use storyloom_storage::InMemorySegmentStore;
use tokio::sync::Notify;

/// Rejects the first `update` with a backend error.
#[derive(Debug, Default)]
pub struct FailFirstUpdate {
    inner: InMemorySegmentStore,
    failed: AtomicBool,
}

impl FailFirstUpdate {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SegmentStore for FailFirstUpdate {
    async fn create_bulk(&self, segments: Vec<Segment>) -> Result<(), RepositoryError> {
        self.inner.create_bulk(segments).await
    }

    async fn get(&self, key: SegmentKey) -> Result<Option<Segment>, RepositoryError> {
        self.inner.get(key).await
    }

    async fn update(&self, segment: Segment) -> Result<(), RepositoryError> {
        if !self.failed.swap(true, Ordering::SeqCst) {
            return Err(RepositoryError::new(RepositoryErrorKind::Backend(
                "disk full".to_string(),
            )));
        }
        self.inner.update(segment).await
    }

    async fn claim(&self, key: SegmentKey) -> Result<Option<Segment>, RepositoryError> {
        self.inner.claim(key).await
    }

    async fn find_for(
        &self,
        item: ItemId,
        kind: StageKind,
    ) -> Result<Vec<Segment>, RepositoryError> {
        self.inner.find_for(item, kind).await
    }

    async fn count_by_status(
        &self,
        item: ItemId,
        kind: StageKind,
    ) -> Result<StageCounts, RepositoryError> {
        self.inner.count_by_status(item, kind).await
    }
}

/// Holds the first audio listing for `delay` after reading it, so writes
/// can land between the read and its use.
#[derive(Debug)]
pub struct SlowAudioRead {
    inner: InMemorySegmentStore,
    delay: Duration,
    delayed: AtomicBool,
    read: Notify,
}

impl SlowAudioRead {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemorySegmentStore::new(),
            delay,
            delayed: AtomicBool::new(false),
            read: Notify::new(),
        }
    }

    /// Resolves once the delayed listing has been read.
    pub async fn first_audio_read(&self) {
        self.read.notified().await;
    }
}

#[async_trait]
impl SegmentStore for SlowAudioRead {
    async fn create_bulk(&self, segments: Vec<Segment>) -> Result<(), RepositoryError> {
        self.inner.create_bulk(segments).await
    }

    async fn get(&self, key: SegmentKey) -> Result<Option<Segment>, RepositoryError> {
        self.inner.get(key).await
    }

    async fn update(&self, segment: Segment) -> Result<(), RepositoryError> {
        self.inner.update(segment).await
    }

    async fn claim(&self, key: SegmentKey) -> Result<Option<Segment>, RepositoryError> {
        self.inner.claim(key).await
    }

    async fn find_for(
        &self,
        item: ItemId,
        kind: StageKind,
    ) -> Result<Vec<Segment>, RepositoryError> {
        let segments = self.inner.find_for(item, kind).await?;
        if kind == StageKind::Audio && !self.delayed.swap(true, Ordering::SeqCst) {
            self.read.notify_one();
            tokio::time::sleep(self.delay).await;
        }
        Ok(segments)
    }

    async fn count_by_status(
        &self,
        item: ItemId,
        kind: StageKind,
    ) -> Result<StageCounts, RepositoryError> {
        self.inner.count_by_status(item, kind).await
    }
}
