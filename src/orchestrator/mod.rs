//! Per-item fan-out of generation jobs.
//!
//! Each text item gets one concurrent rewrite job per [`PromptKind`] plus a
//! language detection that feeds the translation cascade. Results are merged
//! back into the [`ItemStore`] by item id; a job whose item has been removed
//! in the meantime simply finds nothing to update.

mod dimensions;

use std::sync::Arc;
use tokio_util::task::TaskTracker;

use crate::item::{CapturedContent, ItemId, ItemType, LanguageCode, PromptKind, ResultSlot};
use crate::provider::{ProcessedResult, ProviderAdapter, RequestType};
use crate::store::ItemStore;
use crate::translation::{TranslationCascade, default_languages};

pub use dimensions::{DEFAULT_MIN_IMAGE_DIMENSION, image_dimensions, meets_min_dimension};

/// Knobs from the `[processing]` config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingSettings {
    pub auto_analyze_images: bool,
    /// Smaller images (on either side) are never described.
    pub min_image_dimension: u32,
    pub languages: Vec<LanguageCode>,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            auto_analyze_images: true,
            min_image_dimension: DEFAULT_MIN_IMAGE_DIMENSION,
            languages: default_languages(),
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    store: ItemStore,
    adapter: Arc<ProviderAdapter>,
    cascade: TranslationCascade,
    settings: Arc<ProcessingSettings>,
    tracker: TaskTracker,
}

impl Orchestrator {
    pub fn new(store: ItemStore, adapter: Arc<ProviderAdapter>, settings: ProcessingSettings) -> Self {
        let tracker = TaskTracker::new();
        let cascade = TranslationCascade::new(
            store.clone(),
            Arc::clone(&adapter),
            settings.languages.clone(),
            tracker.clone(),
        );
        Self {
            store,
            adapter,
            cascade,
            settings: Arc::new(settings),
            tracker,
        }
    }

    pub const fn store(&self) -> &ItemStore {
        &self.store
    }

    pub const fn adapter(&self) -> &Arc<ProviderAdapter> {
        &self.adapter
    }

    pub const fn cascade(&self) -> &TranslationCascade {
        &self.cascade
    }

    pub fn settings(&self) -> &ProcessingSettings {
        &self.settings
    }

    /// Stores a fresh capture and starts processing it.
    pub async fn ingest(&self, captured: CapturedContent) -> ItemId {
        let id = self
            .store
            .capture(captured, self.settings.auto_analyze_images)
            .await;
        self.process(id).await;
        id
    }

    /// Starts every job an item needs. Returns `true` if anything was started.
    ///
    /// Items that already have results are left alone, so repeated triggers
    /// for the same item are harmless. Images go to [`Self::analyze_image`].
    pub async fn process(&self, id: ItemId) -> bool {
        let Some(item_type) = self.store.get(id).await.map(|item| item.item_type) else {
            return false;
        };
        if item_type == ItemType::Image {
            return self.analyze_image(id).await;
        }
        if !item_type.is_textual() {
            return false;
        }

        let text = self
            .store
            .update_if(id, |item| {
                if item.has_any_result() || item.plain_text().is_empty() {
                    return None;
                }
                for kind in PromptKind::ALL {
                    item.prompt_results.insert(kind, ResultSlot::pending());
                }
                Some(item.plain_text().to_string())
            })
            .await;
        let Some(text) = text else {
            return false;
        };

        tracing::debug!(item_id = %id, kinds = PromptKind::ALL.len(), "processing item");
        for kind in PromptKind::ALL {
            self.spawn_prompt(id, kind, text.clone());
        }

        let cascade = self.cascade.clone();
        self.tracker.spawn(async move {
            cascade.detect_language(id).await;
        });
        true
    }

    /// Explicitly re-runs one rewrite, replacing its previous result.
    pub async fn reprocess(&self, id: ItemId, kind: PromptKind) -> bool {
        match self.store.begin_prompt(id, kind).await {
            Some(text) => {
                self.spawn_prompt(id, kind, text);
                true
            }
            None => false,
        }
    }

    pub async fn select_prompt(&self, id: ItemId, kind: Option<PromptKind>) -> bool {
        self.store
            .update(id, |item| item.selected_prompt = kind)
            .await
            .is_some()
    }

    fn spawn_prompt(&self, id: ItemId, kind: PromptKind, text: String) {
        let orchestrator = self.clone();
        self.tracker.spawn(async move {
            orchestrator.run_prompt(id, kind, text).await;
        });
    }

    async fn run_prompt(&self, id: ItemId, kind: PromptKind, text: String) {
        let result = self.adapter.process_with_prompt_type(&text, kind).await;

        let first_with_language = self
            .store
            .update(id, |item| match result {
                Ok(rewritten) => {
                    item.prompt_results.insert(kind, ResultSlot::done(rewritten));
                    let finished = item
                        .prompt_results
                        .values()
                        .filter(|slot| slot.is_done())
                        .count();
                    finished == 1 && item.detected_language.is_some()
                }
                Err(e) => {
                    tracing::debug!(item_id = %id, ?kind, error = %e, "rewrite failed");
                    item.prompt_results.remove(&kind);
                    false
                }
            })
            .await;

        match first_with_language {
            Some(true) => {
                self.cascade.translate_to_all(id).await;
            }
            Some(false) => {}
            None => tracing::debug!(item_id = %id, ?kind, "item gone before rewrite finished"),
        }
    }

    /// Describes an image item if it was captured with auto-analysis enabled.
    pub async fn analyze_image(&self, id: ItemId) -> bool {
        self.start_image_analysis(id, true).await
    }

    /// Describes an image item on request, regardless of the capture-time flag.
    pub async fn describe_image(&self, id: ItemId) -> bool {
        self.start_image_analysis(id, false).await
    }

    async fn start_image_analysis(&self, id: ItemId, automatic: bool) -> bool {
        let Some(item) = self.store.get(id).await else {
            return false;
        };
        if item.item_type != ItemType::Image || (automatic && !item.auto_analyze_image) {
            return false;
        }
        let Some(data) = item.image_data else {
            return false;
        };
        if !meets_min_dimension(&data, self.settings.min_image_dimension) {
            tracing::debug!(item_id = %id, "image below minimum size, not analyzed");
            return false;
        }
        if !self.adapter.client().supports_images() {
            tracing::debug!(item_id = %id, "backend has no vision support");
            return false;
        }

        let started = self
            .store
            .update_if(id, |item| {
                let busy = item.image_analysis.as_ref().is_some_and(|slot| slot.processing);
                let done = item.image_analysis.as_ref().is_some_and(ResultSlot::is_done);
                if busy || (automatic && done) {
                    return None;
                }
                item.image_analysis = Some(ResultSlot::pending());
                Some(())
            })
            .await
            .is_some();
        if !started {
            return false;
        }

        let orchestrator = self.clone();
        self.tracker.spawn(async move {
            let result = orchestrator.adapter.describe_image(data).await;
            orchestrator
                .store
                .update(id, |item| match result {
                    Ok(description) => item.image_analysis = Some(ResultSlot::done(description)),
                    Err(e) => {
                        tracing::debug!(item_id = %id, error = %e, "image analysis failed");
                        item.image_analysis = None;
                    }
                })
                .await;
        });
        true
    }

    /// Runs a structured request over the item's text and records the result.
    ///
    /// Returns `None` when the item is gone, has no text, or the request failed.
    pub async fn analyze_content(&self, id: ItemId, request: RequestType) -> Option<ProcessedResult> {
        let text = self
            .store
            .get(id)
            .await
            .filter(|item| item.item_type.is_textual())
            .map(|item| item.plain_text().to_string())
            .filter(|text| !text.is_empty())?;

        let result = match self.adapter.process(&text, &request).await {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(item_id = %id, request = %request.cache_tag(), error = %e, "content analysis failed");
                return None;
            }
        };

        self.store
            .update(id, |item| {
                result.merge_into(item.analysis.get_or_insert_with(Default::default));
            })
            .await;
        Some(result)
    }

    /// Waits until every job started so far, and any job those start, has finished.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
