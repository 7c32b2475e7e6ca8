//! Per-item master consistency context.

use crate::Collaborators;
use crate::prompt::{audio_context, master_instruction};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use storyloom_core::{ContentItem, ItemId, StageKind};
use storyloom_error::GenerationError;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, instrument};

/// Caches one context string per `{item, kind}`.
///
/// Concurrent segments of the same item wait on a single initialisation, so
/// the remote call behind it runs once per item.
#[derive(Debug, Clone, Default)]
pub struct MasterContextCache {
    entries: Arc<Mutex<HashMap<(ItemId, StageKind), Arc<OnceCell<String>>>>>,
}

impl MasterContextCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value, or the result of `init` stored for later callers.
    ///
    /// A failed `init` stores nothing; the next caller tries again.
    pub async fn get_or_try_init<F, Fut, E>(
        &self,
        item_id: ItemId,
        kind: StageKind,
        init: F,
    ) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry((item_id, kind)).or_default().clone()
        };
        cell.get_or_try_init(init).await.cloned()
    }

    /// Forget every context for an item.
    pub async fn invalidate(&self, item_id: ItemId) {
        self.entries.lock().await.retain(|(id, _), _| *id != item_id);
    }

    /// Number of `{item, kind}` entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Check if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

/// Context for `kind` of `item`, computing it on first use.
///
/// Images derive it from the whole generated text with one text-generation
/// call through the gate. Audio uses the narration instruction and voice.
#[instrument(skip(collaborators, cache, item), fields(item_id = %item.id))]
pub(crate) async fn master_context(
    collaborators: &Collaborators,
    cache: &MasterContextCache,
    item: &ContentItem,
    kind: StageKind,
) -> Result<String, GenerationError> {
    match kind {
        StageKind::Audio => Ok(audio_context(&item.config)),
        StageKind::Image => {
            cache
                .get_or_try_init(item.id, kind, || async {
                    let text = item.generated_text.as_deref().unwrap_or(&item.source_text);
                    let instruction = master_instruction(&item.config);
                    let generator = &collaborators.text;
                    let instruction = instruction.as_str();
                    let context = collaborators
                        .gate
                        .execute(|credential| async move {
                            generator.generate(&credential, text, Some(instruction)).await
                        })
                        .await?;
                    debug!(chars = context.len(), "Image master context derived");
                    Ok::<_, GenerationError>(context.trim().to_string())
                })
                .await
        }
    }
}
