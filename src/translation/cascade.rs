use std::sync::Arc;
use tokio_util::task::TaskTracker;

use super::language::{
    FALLBACK_LANGUAGE, MIN_DETECTION_CHARS, language_name, meaningful_chars, parse_language_code,
};
use crate::item::{ClipboardItem, ItemId, LanguageCode, ResultSlot, TranslationSource};
use crate::provider::ProviderAdapter;
use crate::store::ItemStore;

/// Translations to launch for one item.
struct Plan {
    text: String,
    source: TranslationSource,
    targets: Vec<LanguageCode>,
}

/// Decides which targets need a job and marks them processing.
///
/// Translations computed from the original text are redone once, as soon as a
/// rewritten text exists. Targets already being translated are left alone.
fn plan_translations(item: &mut ClipboardItem, languages: &[LanguageCode]) -> Option<Plan> {
    if !item.item_type.is_textual() {
        return None;
    }
    let detected = item.detected_language.clone()?;
    let (text, source) = item.translation_input();
    let text = text.to_string();
    let retranslate = source == TranslationSource::Transformed
        && item.translation_source == Some(TranslationSource::Original);

    let targets: Vec<LanguageCode> = languages
        .iter()
        .filter(|language| **language != detected)
        .filter(|language| match item.translated_results.get(*language) {
            None => true,
            Some(slot) => retranslate && !slot.processing,
        })
        .cloned()
        .collect();

    let source_changes = retranslate || item.translation_source.is_none();
    if targets.is_empty() && !source_changes {
        return None;
    }
    if source_changes {
        item.translation_source = Some(source);
    }
    for language in &targets {
        item.translated_results
            .entry(language.clone())
            .and_modify(|slot| slot.processing = true)
            .or_insert_with(ResultSlot::pending);
    }

    Some(Plan {
        text,
        source,
        targets,
    })
}

/// Detects an item's language, then translates it into every other language.
#[derive(Clone)]
pub struct TranslationCascade {
    store: ItemStore,
    adapter: Arc<ProviderAdapter>,
    languages: Arc<[LanguageCode]>,
    tracker: TaskTracker,
}

impl TranslationCascade {
    pub fn new(
        store: ItemStore,
        adapter: Arc<ProviderAdapter>,
        languages: Vec<LanguageCode>,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            store,
            adapter,
            languages: languages.into(),
            tracker,
        }
    }

    pub fn languages(&self) -> &[LanguageCode] {
        &self.languages
    }

    /// Detects the item's language and starts the translation fan-out.
    ///
    /// Returns `None` without calling the backend when the language is already
    /// known or the text is too short to tell. An unparseable answer falls back
    /// to English.
    pub async fn detect_language(&self, id: ItemId) -> Option<LanguageCode> {
        let text = self
            .store
            .get(id)
            .await
            .filter(|item| item.item_type.is_textual() && item.detected_language.is_none())
            .map(|item| item.plain_text().to_string())?;

        if meaningful_chars(&text) < MIN_DETECTION_CHARS {
            tracing::debug!(item_id = %id, "text too short for language detection");
            return None;
        }

        let language = match self.adapter.detect_language(&text).await {
            Ok(response) => parse_language_code(&response).unwrap_or_else(|| {
                tracing::debug!(item_id = %id, %response, "unrecognized language, using fallback");
                FALLBACK_LANGUAGE.to_string()
            }),
            Err(e) => {
                tracing::debug!(item_id = %id, error = %e, "language detection failed");
                return None;
            }
        };

        let detected = self
            .store
            .update(id, |item| {
                item.detected_language
                    .get_or_insert_with(|| language.clone())
                    .clone()
            })
            .await?;
        tracing::debug!(item_id = %id, language = %detected, "language detected");

        self.translate_to_all(id).await;
        Some(detected)
    }

    /// Starts one job per configured language that still needs a translation.
    ///
    /// Returns the number of jobs started. Nothing happens until the item's
    /// language is known.
    pub async fn translate_to_all(&self, id: ItemId) -> usize {
        let languages = Arc::clone(&self.languages);
        let Some(plan) = self
            .store
            .update_if(id, |item| plan_translations(item, &languages))
            .await
        else {
            return 0;
        };

        let started = plan.targets.len();
        for language in plan.targets {
            self.spawn_translation(id, language, plan.text.clone(), plan.source);
        }
        if started > 0 {
            tracing::debug!(item_id = %id, jobs = started, source = ?plan.source, "translation fan-out");
        }
        started
    }

    /// Shows `language` for the item, translating on demand if needed.
    ///
    /// Selecting the detected language clears the override. Returns `true`
    /// when a translation job was started.
    pub async fn select_target_language(&self, id: ItemId, language: &str) -> bool {
        let job = self
            .store
            .update(id, |item| {
                if item.detected_language.as_deref() == Some(language) {
                    item.selected_target_language = None;
                    return None;
                }
                item.selected_target_language = Some(language.to_string());
                if item.translated_results.contains_key(language) {
                    return None;
                }
                let (text, source) = item.translation_input();
                let job = (text.to_string(), source);
                item.translated_results
                    .insert(language.to_string(), ResultSlot::pending());
                item.translation_source.get_or_insert(source);
                Some(job)
            })
            .await
            .flatten();

        match job {
            Some((text, source)) => {
                self.spawn_translation(id, language.to_string(), text, source);
                true
            }
            None => false,
        }
    }

    /// Re-runs one translation unless it is already in flight.
    pub async fn retry_translation(&self, id: ItemId, language: &str) -> bool {
        let job = self
            .store
            .update_if(id, |item| {
                if item.is_translation_processing(language) {
                    return None;
                }
                let (text, source) = item.translation_input();
                let job = (text.to_string(), source);
                item.translated_results
                    .entry(language.to_string())
                    .and_modify(|slot| slot.processing = true)
                    .or_insert_with(ResultSlot::pending);
                Some(job)
            })
            .await;

        match job {
            Some((text, source)) => {
                self.spawn_translation(id, language.to_string(), text, source);
                true
            }
            None => false,
        }
    }

    fn spawn_translation(
        &self,
        id: ItemId,
        language: LanguageCode,
        text: String,
        source: TranslationSource,
    ) {
        let cascade = self.clone();
        self.tracker.spawn(async move {
            cascade.run_translation(id, language, text, source).await;
        });
    }

    async fn run_translation(
        &self,
        id: ItemId,
        language: LanguageCode,
        mut text: String,
        mut source: TranslationSource,
    ) {
        loop {
            let result = self.adapter.translate(&text, language_name(&language)).await;

            let rerun = self
                .store
                .update(id, |item| match result {
                    Ok(translated) => {
                        // Started from the original, but the item has since switched
                        // to rewritten text: translate again instead of storing.
                        let (current, current_source) = item.translation_input();
                        if source == TranslationSource::Original
                            && current_source == TranslationSource::Transformed
                            && item.translation_source == Some(TranslationSource::Transformed)
                        {
                            return Some((current.to_string(), current_source));
                        }
                        item.translated_results
                            .insert(language.clone(), ResultSlot::done(translated));
                        None
                    }
                    Err(e) => {
                        tracing::debug!(item_id = %id, %language, error = %e, "translation failed");
                        item.translated_results.remove(&language);
                        None
                    }
                })
                .await
                .flatten();

            match rerun {
                Some((next_text, next_source)) => {
                    text = next_text;
                    source = next_source;
                }
                None => break,
            }
        }
    }
}
