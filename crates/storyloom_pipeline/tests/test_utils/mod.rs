//! Test utilities for pipeline tests.
//!
//! Scripted generators plus a harness wiring them to in-memory stores and a
//! temp-dir artifact store.

#![allow(dead_code)]

pub mod mock_generators;
pub mod scripted_stores;

#[allow(unused_imports)]
pub use mock_generators::{
    MockImage, MockSanitizer, MockSimplifier, MockSpeech, MockText, wav_clip,
};
#[allow(unused_imports)]
pub use scripted_stores::{FailFirstUpdate, SlowAudioRead};

use std::sync::Arc;
use std::time::Duration;
use storyloom_audio::AudioMerger;
use storyloom_core::{ContentItem, ItemId};
use storyloom_interface::SegmentStore;
use storyloom_pipeline::{BroadcastEventBus, Collaborators, Orchestrator, PipelineConfig};
use storyloom_rate_limit::{CredentialGate, GateConfig};
use storyloom_storage::{
    FileSystemArtifactStore, InMemoryContentItemStore, InMemoryMergeRecordStore,
    InMemorySegmentStore,
};
use tempfile::TempDir;

/// Orchestrator over mocks, with handles to every mock for scripting.
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub collaborators: Collaborators,
    pub text: Arc<MockText>,
    pub image: Arc<MockImage>,
    pub speech: Arc<MockSpeech>,
    pub sanitizer: Arc<MockSanitizer>,
    pub simplifier: Arc<MockSimplifier>,
    pub dir: TempDir,
}

/// Gate settings that never make a test wait.
pub fn fast_gate_config() -> GateConfig {
    GateConfig::default()
        .with_cooldown_ms(0)
        .with_retry_backoff_ms(1)
        .with_max_retries(1)
        .with_max_delay_secs(1)
}

impl Harness {
    /// Harness whose mocks all succeed until scripted otherwise.
    pub fn new() -> Self {
        Self::with_segments(Arc::new(InMemorySegmentStore::new()))
    }

    /// Harness over a caller-supplied segment store.
    pub fn with_segments(segments: Arc<dyn SegmentStore>) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let text = Arc::new(MockText::new());
        let image = Arc::new(MockImage::new());
        let speech = Arc::new(MockSpeech::new());
        let sanitizer = Arc::new(MockSanitizer::new());
        let simplifier = Arc::new(MockSimplifier::new());

        let gate = CredentialGate::new(
            vec!["test-key-one-0001".to_string(), "test-key-two-0002".to_string()],
            fast_gate_config(),
        )
        .expect("gate");
        let artifacts =
            FileSystemArtifactStore::new(dir.path().join("artifacts")).expect("artifact store");

        let collaborators = Collaborators::builder()
            .gate(gate)
            .text(text.clone())
            .image(image.clone())
            .speech(speech.clone())
            .sanitizer(sanitizer.clone())
            .simplifier(simplifier.clone())
            .items(Arc::new(InMemoryContentItemStore::new()))
            .segments(segments)
            .merges(Arc::new(InMemoryMergeRecordStore::new()))
            .artifacts(Arc::new(artifacts))
            .bus(Arc::new(BroadcastEventBus::new()))
            .merger(AudioMerger::new(dir.path().join("merged")))
            .build()
            .expect("collaborators");
        let orchestrator = Orchestrator::new(collaborators.clone(), PipelineConfig::default());

        Self {
            orchestrator,
            collaborators,
            text,
            image,
            speech,
            sanitizer,
            simplifier,
            dir,
        }
    }

    /// Poll the item until `settled` holds.
    pub async fn wait_for<F>(&self, item_id: ItemId, settled: F) -> ContentItem
    where
        F: Fn(&ContentItem) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                if let Some(item) = self.orchestrator.item(item_id).await.expect("item store") {
                    if settled(&item) {
                        return item;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("item did not settle in time")
    }

    /// Poll until the item reaches `Done` or `Failed`.
    pub async fn wait_terminal(&self, item_id: ItemId) -> ContentItem {
        self.wait_for(item_id, |item| item.stage.is_terminal()).await
    }
}

/// A story of `sentences` ten-word sentences.
pub fn story(sentences: usize) -> String {
    (0..sentences)
        .map(|i| format!("The traveler walked slowly through village {i} and kept going."))
        .collect::<Vec<_>>()
        .join(" ")
}
