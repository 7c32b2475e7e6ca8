//! Segment Worker: generate, persist, and degrade the prompt on failure.

use crate::context::{MasterContextCache, master_context};
use crate::progress::ProgressChannel;
use crate::prompt::{fallback_prompt, image_prompt};
use crate::Collaborators;
use std::time::Instant;
use storyloom_audio::wav_duration;
use storyloom_core::{
    ContentItem, ProgressEvent, RetryTier, Segment, SegmentKey, SegmentMetadata, SegmentStatus,
    StageKind,
};
use storyloom_error::{
    GenerationError, PipelineErrorKind, RepositoryError, RepositoryErrorKind, StoryloomError,
    StoryloomResult,
};
use storyloom_interface::ImageOptions;
use tracing::{debug, error, info, instrument, warn};

/// Processes one image or audio segment to a terminal state.
///
/// Attempts run in tier order and stop at the first success:
/// the original prompt, the same prompt again, a sanitized rewrite, then a
/// simplified rewrite (or [`fallback_prompt`] when the simplifier itself
/// fails). A policy rejection skips the plain repeat; a permanent error
/// stops immediately. Failure of one segment never touches its siblings.
#[derive(Debug, Clone)]
pub struct SegmentWorker {
    collaborators: Collaborators,
    contexts: MasterContextCache,
    progress: ProgressChannel,
}

impl SegmentWorker {
    /// Worker sharing the given context cache and progress channel.
    pub fn new(
        collaborators: Collaborators,
        contexts: MasterContextCache,
        progress: ProgressChannel,
    ) -> Self {
        Self {
            collaborators,
            contexts,
            progress,
        }
    }

    /// Drive the segment at `key` to `completed` or `failed`.
    ///
    /// Returns `None` when the segment was not pending, which means another
    /// worker owns it or it already finished.
    ///
    /// # Errors
    ///
    /// Only store failures surface here. Generation failures are recorded on
    /// the segment. A store failure after the claim still moves the segment
    /// to `failed` when the store accepts that write.
    #[instrument(skip(self), fields(item_id = %key.item_id, kind = %key.kind, index = key.index))]
    pub async fn process(&self, key: SegmentKey) -> StoryloomResult<Option<SegmentStatus>> {
        let Some(segment) = self.collaborators.segments.claim(key).await? else {
            debug!("Segment is not pending, skipping");
            return Ok(None);
        };
        let status = match self.run(segment.clone()).await {
            Ok(status) => status,
            Err(e) => {
                self.release(segment, &e).await;
                return Err(e);
            }
        };
        if let Err(e) = self.evict_finished(key).await {
            warn!(error = %e.kind, "Could not check item for context eviction");
        }
        Ok(Some(status))
    }

    async fn run(&self, segment: Segment) -> StoryloomResult<SegmentStatus> {
        let key = segment.key();
        let item = self
            .collaborators
            .items
            .get(key.item_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::new(RepositoryErrorKind::ItemNotFound(key.item_id.to_string()))
            })?;

        let started = Instant::now();
        let context = master_context(&self.collaborators, &self.contexts, &item, key.kind).await;
        let master = match context {
            Ok(master) => master,
            Err(e) => {
                let reason =
                    PipelineErrorKind::MasterContext(e.kind.message().to_string()).to_string();
                return self.fail(segment, reason).await;
            }
        };

        let base = match key.kind {
            StageKind::Image => image_prompt(&segment.source_text, &master),
            StageKind::Audio => master,
        };
        let mut tier = RetryTier::Original;
        let mut prompt = base.clone();
        loop {
            match self.attempt(&item, &segment, &prompt).await {
                Ok(bytes) => {
                    return self
                        .complete(segment, &item, tier, prompt, bytes, started)
                        .await;
                }
                Err(e) => {
                    warn!(%tier, error = %e.kind, "Segment attempt failed");
                    match self.next_tier(tier, &e, &base, key.kind).await {
                        Some((next, next_prompt)) => {
                            tier = next;
                            prompt = next_prompt;
                        }
                        None => return self.fail(segment, e.kind.message().to_string()).await,
                    }
                }
            }
        }
    }

    /// Best-effort move of a claimed segment out of `processing`.
    async fn release(&self, mut segment: Segment, cause: &StoryloomError) {
        let reason = cause.to_string();
        segment.mark_failed(reason.clone());
        let key = segment.key();
        match self.collaborators.segments.update(segment).await {
            Ok(()) => {
                warn!(reason = %reason, "Segment failed on a store error");
                self.progress.publish(ProgressEvent::SegmentFailed {
                    item_id: key.item_id,
                    kind: key.kind,
                    index: key.index,
                    reason,
                });
            }
            Err(e) => error!(error = %e.kind, "Segment left in processing"),
        }
    }

    /// Drop the item's cached contexts once it has finished and no segment
    /// of this kind is still in flight.
    async fn evict_finished(&self, key: SegmentKey) -> Result<(), RepositoryError> {
        let finished = self
            .collaborators
            .items
            .get(key.item_id)
            .await?
            .is_none_or(|item| item.stage.is_terminal());
        if !finished {
            return Ok(());
        }
        let counts = self
            .collaborators
            .segments
            .count_by_status(key.item_id, key.kind)
            .await?;
        if counts.all_terminal() {
            self.contexts.invalidate(key.item_id).await;
            debug!("Master context evicted");
        }
        Ok(())
    }

    async fn attempt(
        &self,
        item: &ContentItem,
        segment: &Segment,
        prompt: &str,
    ) -> Result<Vec<u8>, GenerationError> {
        let gate = &self.collaborators.gate;
        match segment.kind {
            StageKind::Image => {
                let generator = &self.collaborators.image;
                let options = ImageOptions::new(
                    item.config.image_size().clone(),
                    item.config.art_style().clone(),
                );
                let options = &options;
                gate.call(|credential| async move {
                    generator.generate(&credential, prompt, options).await
                })
                .await
            }
            StageKind::Audio => {
                let generator = &self.collaborators.speech;
                let text = segment.source_text.as_str();
                let voice = item.config.voice().as_str();
                gate.call(|credential| async move {
                    generator.generate(&credential, prompt, text, voice).await
                })
                .await
            }
        }
    }

    /// The tier to try after `current` failed with `error`, and its prompt.
    async fn next_tier(
        &self,
        current: RetryTier,
        error: &GenerationError,
        base: &str,
        kind: StageKind,
    ) -> Option<(RetryTier, String)> {
        if error.kind.is_permanent() {
            return None;
        }
        match current {
            RetryTier::Original if !error.kind.is_policy_violation() => {
                Some((RetryTier::Repeat, base.to_string()))
            }
            RetryTier::Original | RetryTier::Repeat => match self.sanitized(base).await {
                Some(prompt) => Some((RetryTier::Sanitized, prompt)),
                None => Some(self.simplified(base, kind).await),
            },
            RetryTier::Sanitized => Some(self.simplified(base, kind).await),
            RetryTier::Simplified | RetryTier::LocalFallback => None,
        }
    }

    async fn sanitized(&self, base: &str) -> Option<String> {
        let sanitizer = &self.collaborators.sanitizer;
        match self
            .collaborators
            .gate
            .call(|credential| async move { sanitizer.rewrite(&credential, base).await })
            .await
        {
            Ok(prompt) if !prompt.trim().is_empty() => Some(prompt),
            Ok(_) => {
                warn!("Sanitizer returned an empty prompt");
                None
            }
            Err(e) => {
                warn!(error = %e.kind, "Sanitizer failed, moving to simplification");
                None
            }
        }
    }

    async fn simplified(&self, base: &str, kind: StageKind) -> (RetryTier, String) {
        let simplifier = &self.collaborators.simplifier;
        match self
            .collaborators
            .gate
            .call(|credential| async move { simplifier.simplify(&credential, base).await })
            .await
        {
            Ok(prompt) if !prompt.trim().is_empty() => (RetryTier::Simplified, prompt),
            Ok(_) => (RetryTier::LocalFallback, fallback_prompt(base, kind)),
            Err(e) => {
                warn!(error = %e.kind, "Simplifier failed, using local fallback");
                (RetryTier::LocalFallback, fallback_prompt(base, kind))
            }
        }
    }

    async fn complete(
        &self,
        mut segment: Segment,
        item: &ContentItem,
        tier: RetryTier,
        prompt: String,
        bytes: Vec<u8>,
        started: Instant,
    ) -> StoryloomResult<SegmentStatus> {
        let (model, extension) = match segment.kind {
            StageKind::Image => (
                self.collaborators.image.model_name(),
                self.collaborators.image.file_extension(),
            ),
            StageKind::Audio => (
                self.collaborators.speech.model_name(),
                self.collaborators.speech.file_extension(),
            ),
        };
        let name = format!(
            "{}/{}/segment-{:04}.{}",
            item.id, segment.kind, segment.index, extension
        );
        let artifact = match self.collaborators.artifacts.save(&bytes, &name).await {
            Ok(path) => path,
            Err(e) => return self.fail(segment, e.kind.to_string()).await,
        };
        let duration_secs = match segment.kind {
            StageKind::Audio => wav_duration(&bytes),
            StageKind::Image => None,
        };
        let processing_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let metadata = SegmentMetadata::new(
            Some(model.to_string()),
            processing_ms,
            tier,
            prompt,
            duration_secs,
            bytes.len() as u64,
        );
        segment.mark_completed(artifact.clone(), metadata);
        let key = segment.key();
        self.collaborators.segments.update(segment).await?;
        info!(%tier, artifact = %artifact.display(), processing_ms, "Segment completed");
        self.progress.publish(ProgressEvent::SegmentCompleted {
            item_id: key.item_id,
            kind: key.kind,
            index: key.index,
            tier,
            artifact,
        });
        Ok(SegmentStatus::Completed)
    }

    async fn fail(&self, mut segment: Segment, reason: String) -> StoryloomResult<SegmentStatus> {
        warn!(reason = %reason, "Segment failed");
        segment.mark_failed(reason.clone());
        let key = segment.key();
        self.collaborators.segments.update(segment).await?;
        self.progress.publish(ProgressEvent::SegmentFailed {
            item_id: key.item_id,
            kind: key.kind,
            index: key.index,
            reason,
        });
        Ok(SegmentStatus::Failed)
    }
}
