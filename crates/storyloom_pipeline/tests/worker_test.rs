mod test_utils;

use std::sync::Arc;
use storyloom_core::{
    ContentItem, PipelineStage, RetryTier, Segment, SegmentKey, SegmentStatus, StageConfig,
    StageKind,
};
use storyloom_error::GenerationError;
use storyloom_pipeline::{MasterContextCache, ProgressChannel, SegmentWorker};
use test_utils::mock_generators::MASTER_CONTEXT;
use test_utils::{FailFirstUpdate, Harness, story};

fn images_only() -> StageConfig {
    StageConfig::builder().generate_audio(false).build().unwrap()
}

async fn run_single_image(harness: &Harness, text: &str) -> storyloom_core::Segment {
    let id = harness
        .orchestrator
        .create_item(text, images_only())
        .await
        .unwrap();
    harness.orchestrator.start_pipeline(id, images_only()).await.unwrap();
    harness.wait_terminal(id).await;
    let mut segments = harness.orchestrator.segments(id, StageKind::Image).await.unwrap();
    assert_eq!(segments.len(), 1);
    segments.remove(0)
}

#[tokio::test]
async fn first_attempt_success_records_metadata() {
    let harness = Harness::new();
    let segment = run_single_image(&harness, "A lantern glows in the window.").await;

    assert_eq!(segment.status, SegmentStatus::Completed);
    let metadata = segment.metadata.unwrap();
    assert_eq!(*metadata.tier(), RetryTier::Original);
    assert_eq!(metadata.model().as_deref(), Some("mock-image"));
    assert!(metadata.prompt().starts_with("A lantern glows in the window."));
    assert!(metadata.prompt().ends_with(MASTER_CONTEXT));
    assert!(metadata.duration_secs().is_none());

    let artifact = segment.artifact.unwrap();
    let bytes = std::fs::read(&artifact).unwrap();
    assert_eq!(*metadata.byte_size(), bytes.len() as u64);
    assert!(
        artifact
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("segment-0000-")
    );
}

#[tokio::test]
async fn policy_violation_skips_repeat_and_recovers_with_sanitized_prompt() {
    let harness = Harness::new();
    harness.image.set_rule(Box::new(|prompt: &str, _: &str| {
        prompt
            .contains("forbidden")
            .then(|| GenerationError::policy_violation("blocked by safety filter"))
    }));

    let segment = run_single_image(&harness, "A forbidden garden blooms at night.").await;

    assert_eq!(segment.status, SegmentStatus::Completed);
    let metadata = segment.metadata.unwrap();
    assert_eq!(*metadata.tier(), RetryTier::Sanitized);
    assert!(metadata.prompt().contains("gentle garden"));
    assert_eq!(harness.image.calls(), 2);
    assert_eq!(harness.sanitizer.calls(), 1);
    assert_eq!(harness.simplifier.calls(), 0);
}

#[tokio::test]
async fn transient_failure_is_repeated_with_the_same_prompt() {
    let harness = Harness::new();
    let failed_once = std::sync::atomic::AtomicBool::new(false);
    harness.image.set_rule(Box::new(move |_: &str, _: &str| {
        (!failed_once.swap(true, std::sync::atomic::Ordering::SeqCst))
            .then(|| GenerationError::transient("connection reset"))
    }));

    let segment = run_single_image(&harness, "Snow falls on the harbor.").await;

    assert_eq!(*segment.metadata.unwrap().tier(), RetryTier::Repeat);
    let prompts = harness.image.prompts();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0], prompts[1]);
    assert_eq!(harness.sanitizer.calls(), 0);
}

#[tokio::test]
async fn failing_rewriters_fall_back_to_local_simplification() {
    let harness = Harness::new();
    harness.image.set_rule(Box::new(|prompt: &str, _: &str| {
        (!prompt.starts_with("A simple image of"))
            .then(|| GenerationError::policy_violation("blocked by safety filter"))
    }));
    harness
        .sanitizer
        .set_rule(Box::new(|_: &str| Err(GenerationError::transient("sanitizer down"))));
    harness
        .simplifier
        .set_rule(Box::new(|_: &str| Err(GenerationError::transient("simplifier down"))));

    let segment = run_single_image(&harness, "A knight (heroic) rides at dawn.").await;

    assert_eq!(segment.status, SegmentStatus::Completed);
    let metadata = segment.metadata.unwrap();
    assert_eq!(*metadata.tier(), RetryTier::LocalFallback);
    assert!(metadata.prompt().starts_with("A simple image of knight rides dawn."));
    assert_eq!(harness.image.calls(), 2);
    assert_eq!(harness.sanitizer.calls(), 1);
    assert_eq!(harness.simplifier.calls(), 1);
}

#[tokio::test]
async fn exhausted_tiers_fail_with_the_last_message() {
    let harness = Harness::new();
    harness.image.set_rule(Box::new(|_: &str, _: &str| {
        Some(GenerationError::policy_violation("blocked by safety filter"))
    }));

    let segment = run_single_image(&harness, "A storm breaks over the hills.").await;

    assert_eq!(segment.status, SegmentStatus::Failed);
    assert_eq!(segment.failure_reason.as_deref(), Some("blocked by safety filter"));
    assert!(segment.metadata.is_none());
    // original, sanitized, simplified
    assert_eq!(harness.image.calls(), 3);
}

#[tokio::test]
async fn permanent_error_is_not_retried() {
    let harness = Harness::new();
    harness.image.set_rule(Box::new(|_: &str, _: &str| {
        Some(GenerationError::permanent("unauthorized: invalid api key"))
    }));

    let segment = run_single_image(&harness, "A quiet morning in the valley.").await;

    assert_eq!(segment.status, SegmentStatus::Failed);
    assert_eq!(
        segment.failure_reason.as_deref(),
        Some("unauthorized: invalid api key")
    );
    assert_eq!(harness.image.calls(), 1);
    assert_eq!(harness.sanitizer.calls(), 0);
    assert_eq!(harness.simplifier.calls(), 0);
}

#[tokio::test]
async fn image_master_context_is_derived_once_per_item() {
    let harness = Harness::new();
    let config = StageConfig::builder()
        .generate_audio(false)
        .words_per_chunk_image(10usize)
        .build()
        .unwrap();
    let id = harness
        .orchestrator
        .create_item(story(6), config.clone())
        .await
        .unwrap();
    harness.orchestrator.start_pipeline(id, config).await.unwrap();
    harness.wait_terminal(id).await;

    assert_eq!(harness.image.calls(), 6);
    assert_eq!(harness.text.master_calls(), 1);
    assert!(
        harness
            .image
            .prompts()
            .iter()
            .all(|prompt| prompt.ends_with(MASTER_CONTEXT))
    );
}

#[tokio::test]
async fn audio_segments_record_clip_duration() {
    let harness = Harness::new();
    let config = StageConfig::builder()
        .generate_images(false)
        .merge_audio(false)
        .build()
        .unwrap();
    let id = harness
        .orchestrator
        .create_item("The bell rings twice.", config.clone())
        .await
        .unwrap();
    harness.orchestrator.start_pipeline(id, config).await.unwrap();
    let item = harness.wait_terminal(id).await;

    assert!(item.merge_outcome.is_none());
    let audio = harness.orchestrator.segments(id, StageKind::Audio).await.unwrap();
    let metadata = audio[0].metadata.clone().unwrap();
    assert_eq!(*metadata.duration_secs(), Some(1.0));
    assert!(metadata.prompt().ends_with("Voice: Kore"));
    assert!(harness.orchestrator.merge_record(id).await.unwrap().is_none());
}

#[tokio::test]
async fn store_failure_after_claim_leaves_the_segment_failed() {
    let harness = Harness::with_segments(Arc::new(FailFirstUpdate::new()));
    let id = harness
        .orchestrator
        .create_item("A lantern glows in the window.", images_only())
        .await
        .unwrap();
    harness.orchestrator.start_pipeline(id, images_only()).await.unwrap();
    let item = harness.wait_terminal(id).await;

    assert_eq!(item.stage, PipelineStage::Done);
    assert!(item.partially_failed);
    let segments = harness.orchestrator.segments(id, StageKind::Image).await.unwrap();
    assert_eq!(segments[0].status, SegmentStatus::Failed);
    assert!(segments[0].failure_reason.as_deref().unwrap().contains("disk full"));
}

fn worker_for(harness: &Harness) -> (SegmentWorker, MasterContextCache) {
    let collaborators = harness.collaborators.clone();
    let progress = ProgressChannel::new(
        collaborators.bus.clone(),
        collaborators.items.clone(),
        collaborators.segments.clone(),
    );
    let contexts = MasterContextCache::new();
    let worker = SegmentWorker::new(collaborators, contexts.clone(), progress);
    (worker, contexts)
}

async fn stored_item(harness: &Harness, stage: PipelineStage, images: usize) -> ContentItem {
    let text = "A quiet harbor at dawn.";
    let mut item = ContentItem::new(text, images_only());
    item.generated_text = Some(text.to_string());
    item.stage = stage;
    harness.collaborators.items.insert(item.clone()).await.unwrap();
    let segments = (0..images)
        .map(|index| Segment::pending(item.id, StageKind::Image, index, text))
        .collect();
    harness.collaborators.segments.create_bulk(segments).await.unwrap();
    item
}

#[tokio::test]
async fn finished_items_do_not_keep_master_context() {
    let harness = Harness::new();
    let (worker, contexts) = worker_for(&harness);

    for _ in 0..20 {
        let item = stored_item(&harness, PipelineStage::Done, 1).await;
        let status = worker
            .process(SegmentKey::new(item.id, StageKind::Image, 0))
            .await
            .unwrap();
        assert_eq!(status, Some(SegmentStatus::Completed));
    }

    assert!(contexts.is_empty().await);
    assert_eq!(harness.text.master_calls(), 20);
}

#[tokio::test]
async fn master_context_stays_cached_while_segments_remain() {
    let harness = Harness::new();
    let (worker, contexts) = worker_for(&harness);
    let item = stored_item(&harness, PipelineStage::Images, 2).await;

    worker
        .process(SegmentKey::new(item.id, StageKind::Image, 0))
        .await
        .unwrap();
    assert_eq!(contexts.len().await, 1);

    worker
        .process(SegmentKey::new(item.id, StageKind::Image, 1))
        .await
        .unwrap();
    assert_eq!(contexts.len().await, 1);
    assert_eq!(harness.text.master_calls(), 1);
}
