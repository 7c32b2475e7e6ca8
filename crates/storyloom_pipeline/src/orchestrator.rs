//! Stage Orchestrator: per-item state machine over per-stage work queues.

use crate::context::MasterContextCache;
use crate::merge::audio_merge_inputs;
use crate::progress::ProgressChannel;
use crate::worker::SegmentWorker;
use crate::{Collaborators, PipelineConfig};
use futures::future::{BoxFuture, FutureExt};
use std::fmt::Debug;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use storyloom_core::{
    ContentItem, ItemId, MergeOutcome, MergePhase, MergeRecord, PipelineStage, ProgressEvent,
    Segment, SegmentKey, SegmentStatus, StageConfig, StageKind, StatusSnapshot, split,
};
use storyloom_error::{
    PipelineError, PipelineErrorKind, RepositoryError, RepositoryErrorKind, StoryloomResult,
};
use storyloom_interface::EventStream;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, instrument, warn};

/// Drives content items through `Text → Images → Audio → Merge → Done`.
///
/// Each stage has its own bounded queue and worker pool. TEXT and MERGE jobs
/// are whole items; IMAGES and AUDIO jobs are single segments. A stage ends
/// when the segment store reports every segment of its kind terminal, and
/// the move to the next stage is a compare-and-set on the item, so exactly
/// one worker performs it.
///
/// Must be created inside a Tokio runtime. Dropping the last handle closes
/// the queues; jobs already running finish.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    collaborators: Collaborators,
    worker: SegmentWorker,
    progress: ProgressChannel,
    contexts: MasterContextCache,
    queues: Queues,
}

struct Queues {
    text: mpsc::Sender<ItemId>,
    image: mpsc::Sender<SegmentKey>,
    audio: mpsc::Sender<SegmentKey>,
    merge: mpsc::Sender<ItemId>,
}

fn queue_closed(stage: &str) -> PipelineError {
    PipelineError::new(PipelineErrorKind::QueueClosed(stage.to_string()))
}

fn kind_stage(kind: StageKind) -> PipelineStage {
    match kind {
        StageKind::Image => PipelineStage::Images,
        StageKind::Audio => PipelineStage::Audio,
    }
}

impl Orchestrator {
    /// Start the dispatchers and return a handle.
    pub fn new(collaborators: Collaborators, config: PipelineConfig) -> Self {
        let capacity = (*config.queue_capacity()).max(1);
        let (text_tx, text_rx) = mpsc::channel(capacity);
        let (image_tx, image_rx) = mpsc::channel(capacity);
        let (audio_tx, audio_rx) = mpsc::channel(capacity);
        let (merge_tx, merge_rx) = mpsc::channel(capacity);

        let progress = ProgressChannel::new(
            collaborators.bus.clone(),
            collaborators.items.clone(),
            collaborators.segments.clone(),
        );
        let contexts = MasterContextCache::new();
        let worker = SegmentWorker::new(collaborators.clone(), contexts.clone(), progress.clone());
        let inner = Arc::new(Inner {
            collaborators,
            worker,
            progress,
            contexts,
            queues: Queues {
                text: text_tx,
                image: image_tx,
                audio: audio_tx,
                merge: merge_tx,
            },
        });

        let weak = Arc::downgrade(&inner);
        tokio::spawn(dispatch(
            "text",
            text_rx,
            weak.clone(),
            *config.text_workers(),
            |inner, id| inner.run_text(id),
        ));
        tokio::spawn(dispatch(
            "image",
            image_rx,
            weak.clone(),
            *config.image_workers(),
            |inner, key| inner.run_segment(key),
        ));
        tokio::spawn(dispatch(
            "audio",
            audio_rx,
            weak.clone(),
            *config.audio_workers(),
            |inner, key| inner.run_segment(key),
        ));
        tokio::spawn(dispatch(
            "merge",
            merge_rx,
            weak,
            *config.merge_workers(),
            |inner, id| inner.run_merge(id),
        ));
        info!(?config, "Orchestrator started");

        Self { inner }
    }

    /// Store a new pending item.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a bad stage config, or the store's error.
    #[instrument(skip_all)]
    pub async fn create_item(
        &self,
        source_text: impl Into<String>,
        config: StageConfig,
    ) -> StoryloomResult<ItemId> {
        config.validate()?;
        let item = ContentItem::new(source_text, config);
        let id = item.id;
        self.inner.collaborators.items.insert(item).await?;
        info!(item_id = %id, "Content item created");
        Ok(id)
    }

    /// Trigger the TEXT stage for a pending item.
    ///
    /// Returns `false` without side effects when the item was already
    /// started. `config` replaces the item's stage config.
    ///
    /// # Errors
    ///
    /// Fails if the config is invalid, the item is unknown, or the text
    /// queue is closed.
    #[instrument(skip(self, config))]
    pub async fn start_pipeline(
        &self,
        item_id: ItemId,
        config: StageConfig,
    ) -> StoryloomResult<bool> {
        config.validate()?;
        let items = &self.inner.collaborators.items;
        if !items
            .advance(item_id, PipelineStage::Pending, PipelineStage::Text)
            .await?
        {
            debug!("Pipeline already started");
            return Ok(false);
        }
        items
            .modify(
                item_id,
                Box::new(move |item: &mut ContentItem| item.config = config),
            )
            .await?;
        self.inner.progress.publish(ProgressEvent::StageStarted {
            item_id,
            stage: PipelineStage::Text,
            segment_count: 0,
        });
        self.inner
            .queues
            .text
            .send(item_id)
            .await
            .map_err(|_| queue_closed("text"))?;
        info!("Pipeline started");
        Ok(true)
    }

    /// Aggregate counts per stage kind, read from the segment store.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn get_status(&self, item_id: ItemId) -> StoryloomResult<StatusSnapshot> {
        Ok(self.inner.progress.snapshot(item_id).await?)
    }

    /// Reset failed segments of `kind` to pending and queue them again.
    ///
    /// Completed siblings are left alone. Returns how many were queued.
    ///
    /// # Errors
    ///
    /// Propagates store failures and closed queues.
    #[instrument(skip(self))]
    pub async fn retry_failed_segments(
        &self,
        item_id: ItemId,
        kind: StageKind,
    ) -> StoryloomResult<usize> {
        let segments = &self.inner.collaborators.segments;
        let mut keys = Vec::new();
        for mut segment in segments
            .find_for(item_id, kind)
            .await?
            .into_iter()
            .filter(|segment| segment.status == SegmentStatus::Failed)
        {
            segment.reset();
            keys.push(segment.key());
            segments.update(segment).await?;
        }
        for key in &keys {
            self.inner.enqueue_segment(*key).await?;
        }
        info!(count = keys.len(), "Failed segments queued for retry");
        Ok(keys.len())
    }

    /// Events published for an item from now on.
    pub fn subscribe(&self, item_id: ItemId) -> EventStream {
        self.inner.progress.subscribe(item_id)
    }

    /// The item as currently stored.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn item(&self, item_id: ItemId) -> StoryloomResult<Option<ContentItem>> {
        Ok(self.inner.collaborators.items.get(item_id).await?)
    }

    /// All segments of one kind, in index order.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn segments(
        &self,
        item_id: ItemId,
        kind: StageKind,
    ) -> StoryloomResult<Vec<Segment>> {
        Ok(self.inner.collaborators.segments.find_for(item_id, kind).await?)
    }

    /// The item's merge record, if a merge succeeded.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn merge_record(&self, item_id: ItemId) -> StoryloomResult<Option<MergeRecord>> {
        Ok(self.inner.collaborators.merges.get(item_id).await?)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("collaborators", &self.inner.collaborators)
            .finish_non_exhaustive()
    }
}

/// Pull jobs off `rx` and run each on its own task, at most `workers` at once.
async fn dispatch<J, F, Fut>(
    stage: &'static str,
    mut rx: mpsc::Receiver<J>,
    inner: Weak<Inner>,
    workers: usize,
    handler: F,
) where
    J: Debug + Send + 'static,
    F: Fn(Arc<Inner>, J) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    debug!(stage, workers, "Dispatcher running");
    while let Some(job) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let Some(inner) = inner.upgrade() else {
            debug!(stage, ?job, "Orchestrator dropped, job discarded");
            break;
        };
        let task = handler(inner, job);
        tokio::spawn(async move {
            task.await;
            drop(permit);
        });
    }
    debug!(stage, "Dispatcher stopped");
}

impl Inner {
    async fn run_text(self: Arc<Self>, item_id: ItemId) {
        if let Err(e) = self.text_stage(item_id).await {
            error!(error = ?e, %item_id, "Text stage aborted");
        }
    }

    async fn run_segment(self: Arc<Self>, key: SegmentKey) {
        match self.worker.process(key).await {
            Ok(Some(status)) => debug!(%key, %status, "Segment reached terminal state"),
            Ok(None) => return,
            // The worker releases the segment as failed when the store allows it.
            Err(e) => error!(error = ?e, %key, "Segment processing aborted"),
        }
        if let Err(e) = self.on_segment_terminal(key).await {
            error!(error = ?e, %key, "Stage transition failed");
        }
    }

    async fn run_merge(self: Arc<Self>, item_id: ItemId) {
        if let Err(e) = self.merge_stage(item_id).await {
            error!(error = ?e, %item_id, "Merge stage aborted");
        }
    }

    async fn item(&self, item_id: ItemId) -> StoryloomResult<ContentItem> {
        Ok(self
            .collaborators
            .items
            .get(item_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::new(RepositoryErrorKind::ItemNotFound(item_id.to_string()))
            })?)
    }

    async fn enqueue_segment(&self, key: SegmentKey) -> StoryloomResult<()> {
        let (queue, name) = match key.kind {
            StageKind::Image => (&self.queues.image, "image"),
            StageKind::Audio => (&self.queues.audio, "audio"),
        };
        queue.send(key).await.map_err(|_| queue_closed(name))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn text_stage(&self, item_id: ItemId) -> StoryloomResult<()> {
        let item = self.item(item_id).await?;
        if item.stage != PipelineStage::Text {
            debug!(stage = %item.stage, "Item left TEXT, job ignored");
            return Ok(());
        }
        let generator = &self.collaborators.text;
        let source = item.source_text.as_str();
        let prompt = item.config.text_prompt().as_deref();
        let result = self
            .collaborators
            .gate
            .execute(|credential| async move {
                generator.generate(&credential, source, prompt).await
            })
            .await;

        match result {
            Ok(generated) => {
                info!(words = generated.split_whitespace().count(), "Text generated");
                self.collaborators
                    .items
                    .modify(
                        item_id,
                        Box::new(move |item: &mut ContentItem| {
                            item.generated_text = Some(generated)
                        }),
                    )
                    .await?;
                self.contexts.invalidate(item_id).await;
                self.advance_from(item_id, PipelineStage::Text).await
            }
            Err(e) => {
                let reason = e.kind.message().to_string();
                error!(error = %e.kind, "Text generation failed, item failed");
                let stored = reason.clone();
                self.collaborators
                    .items
                    .modify(
                        item_id,
                        Box::new(move |item: &mut ContentItem| item.failure_reason = Some(stored)),
                    )
                    .await?;
                if self
                    .collaborators
                    .items
                    .advance(item_id, PipelineStage::Text, PipelineStage::Failed)
                    .await?
                {
                    self.contexts.invalidate(item_id).await;
                    self.progress
                        .publish(ProgressEvent::PipelineFailed { item_id, reason });
                }
                Ok(())
            }
        }
    }

    /// Leave `from` for the next enabled stage, if the item is still in `from`.
    fn advance_from(
        &self,
        item_id: ItemId,
        from: PipelineStage,
    ) -> BoxFuture<'_, StoryloomResult<()>> {
        async move {
            let item = self.item(item_id).await?;
            let next = from.next_enabled(&item.config);
            if next == PipelineStage::Done {
                self.refresh_partial_failure(item_id).await?;
            }
            if !self.collaborators.items.advance(item_id, from, next).await? {
                return Ok(());
            }
            info!(%item_id, %from, %next, "Stage complete");
            let (completed, failed) = match from.segment_kind() {
                Some(kind) => {
                    let counts = self.collaborators.segments.count_by_status(item_id, kind).await?;
                    (*counts.completed(), *counts.failed())
                }
                None => (0, 0),
            };
            self.progress.publish(ProgressEvent::StageCompleted {
                item_id,
                stage: from,
                completed,
                failed,
            });
            self.enter_stage(item_id, next).await
        }
        .boxed()
    }

    async fn enter_stage(&self, item_id: ItemId, stage: PipelineStage) -> StoryloomResult<()> {
        match stage {
            PipelineStage::Images | PipelineStage::Audio => {
                let Some(kind) = stage.segment_kind() else {
                    return Ok(());
                };
                let item = self.item(item_id).await?;
                let Some(text) = item.generated_text.as_deref() else {
                    return Err(PipelineError::new(PipelineErrorKind::TextNotGenerated(
                        item_id.to_string(),
                    ))
                    .into());
                };
                let chunks = split(text, item.config.words_per_chunk(kind));
                let segments = Segment::from_chunks(item_id, kind, chunks);
                let keys: Vec<SegmentKey> = segments.iter().map(Segment::key).collect();
                if !segments.is_empty() {
                    self.collaborators.segments.create_bulk(segments).await?;
                }
                info!(%item_id, %stage, segments = keys.len(), "Stage entered");
                self.progress.publish(ProgressEvent::StageStarted {
                    item_id,
                    stage,
                    segment_count: keys.len(),
                });
                if keys.is_empty() {
                    return self.advance_from(item_id, stage).await;
                }
                for key in keys {
                    self.enqueue_segment(key).await?;
                }
                Ok(())
            }
            PipelineStage::Merge => {
                self.collaborators
                    .items
                    .modify(
                        item_id,
                        Box::new(|item: &mut ContentItem| {
                            item.merge_outcome = Some(MergeOutcome::Queued)
                        }),
                    )
                    .await?;
                self.progress.publish(ProgressEvent::StageStarted {
                    item_id,
                    stage,
                    segment_count: 0,
                });
                self.queues
                    .merge
                    .send(item_id)
                    .await
                    .map_err(|_| queue_closed("merge"))?;
                Ok(())
            }
            PipelineStage::Done => {
                self.contexts.invalidate(item_id).await;
                let item = self.item(item_id).await?;
                info!(%item_id, partially_failed = item.partially_failed, "Pipeline complete");
                self.progress.publish(ProgressEvent::PipelineCompleted {
                    item_id,
                    partially_failed: item.partially_failed,
                });
                Ok(())
            }
            PipelineStage::Pending | PipelineStage::Text | PipelineStage::Failed => Ok(()),
        }
    }

    /// Recompute the item's failure flag from its segments.
    async fn refresh_partial_failure(&self, item_id: ItemId) -> StoryloomResult<ContentItem> {
        let snapshot = self.progress.snapshot(item_id).await?;
        let partially_failed = *snapshot.partially_failed();
        Ok(self
            .collaborators
            .items
            .modify(
                item_id,
                Box::new(move |item: &mut ContentItem| item.partially_failed = partially_failed),
            )
            .await?)
    }

    async fn on_segment_terminal(&self, key: SegmentKey) -> StoryloomResult<()> {
        let item = self.item(key.item_id).await?;
        let stage = kind_stage(key.kind);
        if item.stage == stage {
            let counts = self
                .collaborators
                .segments
                .count_by_status(key.item_id, key.kind)
                .await?;
            if counts.all_terminal() {
                self.advance_from(key.item_id, stage).await?;
            }
        } else if item.stage > stage && item.stage != PipelineStage::Failed {
            self.refresh_partial_failure(key.item_id).await?;
            if key.kind == StageKind::Audio && item.config.stage_enabled(PipelineStage::Merge) {
                self.requeue_merge(key.item_id).await?;
            }
        }
        Ok(())
    }

    /// Queue a fresh merge once retried audio segments have all completed.
    async fn requeue_merge(&self, item_id: ItemId) -> StoryloomResult<()> {
        let counts = self
            .collaborators
            .segments
            .count_by_status(item_id, StageKind::Audio)
            .await?;
        if *counts.total() == 0 || counts.completed() != counts.total() {
            return Ok(());
        }
        let queued = Arc::new(AtomicBool::new(false));
        let flag = queued.clone();
        self.collaborators
            .items
            .modify(
                item_id,
                Box::new(move |item: &mut ContentItem| {
                    if !matches!(
                        item.merge_outcome,
                        Some(MergeOutcome::Queued) | Some(MergeOutcome::Merged)
                    ) {
                        item.merge_outcome = Some(MergeOutcome::Queued);
                        flag.store(true, Ordering::SeqCst);
                    }
                }),
            )
            .await?;
        if queued.load(Ordering::SeqCst) {
            info!(%item_id, "Audio complete after retry, merging again");
            self.queues
                .merge
                .send(item_id)
                .await
                .map_err(|_| queue_closed("merge"))?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn merge_stage(&self, item_id: ItemId) -> StoryloomResult<()> {
        self.publish_merge_phase(item_id, MergePhase::Validating);
        let segments = self
            .collaborators
            .segments
            .find_for(item_id, StageKind::Audio)
            .await?;
        let read_unfinished = segments
            .iter()
            .any(|segment| segment.status != SegmentStatus::Completed);

        let outcome = match audio_merge_inputs(&segments) {
            Err(reason) => {
                warn!(reason = %reason, "Merge skipped, audio incomplete");
                self.progress.publish(ProgressEvent::MergeSkipped {
                    item_id,
                    reason: reason.clone(),
                });
                MergeOutcome::SkippedIncomplete { reason }
            }
            Ok(inputs) => {
                self.publish_merge_phase(item_id, MergePhase::Merging);
                let merger = self.collaborators.merger.clone();
                let merged =
                    tokio::task::spawn_blocking(move || merger.merge_item(item_id, &inputs)).await;
                match merged {
                    Ok(Ok(summary)) => {
                        self.publish_merge_phase(item_id, MergePhase::Finalizing);
                        let record = MergeRecord::new(
                            item_id,
                            summary.output().clone(),
                            *summary.total_duration_secs(),
                            *summary.byte_size(),
                            *summary.segment_count(),
                        );
                        self.collaborators.merges.upsert(record).await?;
                        info!(
                            output = %summary.output().display(),
                            duration_secs = *summary.total_duration_secs(),
                            "Narration merged"
                        );
                        self.progress.publish(ProgressEvent::MergeCompleted {
                            item_id,
                            output: summary.output().clone(),
                            duration_secs: *summary.total_duration_secs(),
                            byte_size: *summary.byte_size(),
                            segment_count: *summary.segment_count(),
                        });
                        MergeOutcome::Merged
                    }
                    Ok(Err(e)) => {
                        error!(error = %e.kind, "Merge failed");
                        let reason = e.kind.to_string();
                        self.progress.publish(ProgressEvent::MergeFailed {
                            item_id,
                            reason: reason.clone(),
                        });
                        MergeOutcome::Failed { reason }
                    }
                    Err(e) => {
                        error!(error = %e, "Merge task did not finish");
                        let reason = format!("merge task did not finish: {e}");
                        self.progress.publish(ProgressEvent::MergeFailed {
                            item_id,
                            reason: reason.clone(),
                        });
                        MergeOutcome::Failed { reason }
                    }
                }
            }
        };

        let skipped =
            read_unfinished && matches!(outcome, MergeOutcome::SkippedIncomplete { .. });
        self.collaborators
            .items
            .modify(
                item_id,
                Box::new(move |item: &mut ContentItem| item.merge_outcome = Some(outcome)),
            )
            .await?;
        if skipped {
            // A retry may have completed the audio after the segments were read.
            self.requeue_merge(item_id).await?;
        }
        self.advance_from(item_id, PipelineStage::Merge).await
    }

    fn publish_merge_phase(&self, item_id: ItemId, phase: MergePhase) {
        self.progress.publish(ProgressEvent::MergeProgress {
            item_id,
            phase,
            percent: phase.percent(),
        });
    }
}
