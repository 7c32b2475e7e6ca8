use storyloom_core::{
    ContentItem, ItemId, PipelineStage, ProgressEvent, Segment, SegmentStatus, StageConfig,
    StageCounts, StageKind, StatusSnapshot,
};
use storyloom_error::PipelineErrorKind;

#[test]
fn default_config_enables_everything() {
    let config = StageConfig::default();
    assert!(*config.generate_images());
    assert!(*config.generate_audio());
    assert!(*config.merge_audio());
    assert_eq!(config.words_per_chunk(StageKind::Image), 500);
    assert_eq!(config.voice(), "Kore");
}

#[test]
fn builder_rejects_zero_word_counts() {
    let err = StageConfig::builder()
        .words_per_chunk_image(0usize)
        .build()
        .unwrap_err();
    assert!(matches!(err.kind, PipelineErrorKind::InvalidConfig(_)));
}

#[test]
fn config_deserializes_with_defaults() {
    let config: StageConfig =
        serde_json::from_str(r#"{"generate_images": false, "art_style": "watercolor"}"#).unwrap();
    assert!(!*config.generate_images());
    assert_eq!(config.art_style().as_deref(), Some("watercolor"));
    assert_eq!(*config.words_per_chunk_audio(), 500);
}

#[test]
fn stage_order_skips_disabled_stages() {
    let all = StageConfig::default();
    assert_eq!(PipelineStage::Pending.next_enabled(&all), PipelineStage::Text);
    assert_eq!(PipelineStage::Text.next_enabled(&all), PipelineStage::Images);
    assert_eq!(PipelineStage::Images.next_enabled(&all), PipelineStage::Audio);
    assert_eq!(PipelineStage::Audio.next_enabled(&all), PipelineStage::Merge);
    assert_eq!(PipelineStage::Merge.next_enabled(&all), PipelineStage::Done);

    let images_only = StageConfig::default().with_generate_audio(false);
    assert_eq!(PipelineStage::Images.next_enabled(&images_only), PipelineStage::Done);

    let no_merge = StageConfig::default().with_merge_audio(false);
    assert_eq!(PipelineStage::Audio.next_enabled(&no_merge), PipelineStage::Done);

    let text_only = StageConfig::default()
        .with_generate_images(false)
        .with_generate_audio(false);
    assert_eq!(PipelineStage::Text.next_enabled(&text_only), PipelineStage::Done);
}

#[test]
fn stages_are_ordered() {
    assert!(PipelineStage::Text < PipelineStage::Images);
    assert!(PipelineStage::Merge < PipelineStage::Done);
    assert!(PipelineStage::Done.is_terminal());
    assert!(!PipelineStage::Audio.is_terminal());
}

#[test]
fn segments_from_chunks_are_contiguous() {
    let id = ItemId::new();
    let segments = Segment::from_chunks(
        id,
        StageKind::Audio,
        vec!["a.".to_string(), "b.".to_string(), "c.".to_string()],
    );
    let indices: Vec<usize> = segments.iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(segments.iter().all(|s| s.status == SegmentStatus::Pending));
    assert_eq!(segments[1].key().to_string(), format!("{id}/audio/1"));
}

#[test]
fn failed_segment_reset_clears_reason() {
    let mut segment = Segment::pending(ItemId::new(), StageKind::Image, 0, "x.");
    segment.mark_failed("boom");
    assert_eq!(segment.failure_reason.as_deref(), Some("boom"));
    segment.reset();
    assert_eq!(segment.status, SegmentStatus::Pending);
    assert!(segment.failure_reason.is_none());
}

#[test]
fn empty_counts_report_zero_progress() {
    let counts = StageCounts::tally([]);
    assert_eq!(*counts.progress(), 0.0);
    assert!(!counts.all_terminal());
}

#[test]
fn snapshot_flags_partial_failure() {
    let id = ItemId::new();
    let images = StageCounts::tally([SegmentStatus::Completed, SegmentStatus::Failed]);
    let audio = StageCounts::tally([]);
    let snapshot = StatusSnapshot::new(id, Some(PipelineStage::Audio), images, audio);
    assert!(*snapshot.partially_failed());
    assert!(snapshot.counts(StageKind::Image).all_terminal());
}

#[test]
fn events_round_trip_through_json() {
    let item = ContentItem::new("text", StageConfig::default());
    let event = ProgressEvent::PipelineCompleted {
        item_id: item.id,
        partially_failed: false,
    };
    let json = serde_json::to_string(&event).unwrap();
    let back: ProgressEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
    assert!(!back.is_error());
}
