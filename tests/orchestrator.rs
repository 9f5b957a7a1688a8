#![allow(clippy::unwrap_used)]
//! Fan-out scenarios against a scripted generation backend.

use async_trait::async_trait;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

use cliplens::generation::{GenerationClient, GenerationError, GenerationRequest};
use cliplens::item::{CapturedContent, PromptKind, TranslationSource};
use cliplens::orchestrator::{Orchestrator, ProcessingSettings};
use cliplens::provider::prompt::{DETECTION_SYSTEM_PROMPT, KIND_PROMPTS, REWRITE_SYSTEM_PROMPT};
use cliplens::provider::ProviderAdapter;
use cliplens::store::ItemStore;

const FOX: &str = "The quic brown fox jump over the lazi dog.";

/// Answers every request type the way a cooperative model would.
///
/// Rewrites reply `"<kind>-result"`, with delays chosen so kinds finish in
/// reverse order. Detection can be held back with `detection_gate`.
struct MockBackend {
    language: &'static str,
    rewrites: AtomicUsize,
    translations: AtomicUsize,
    images: AtomicUsize,
    detection_gate: Option<Arc<Semaphore>>,
    rewrite_gate: Option<Arc<Semaphore>>,
}

impl MockBackend {
    fn new(language: &'static str) -> Self {
        Self {
            language,
            rewrites: AtomicUsize::new(0),
            translations: AtomicUsize::new(0),
            images: AtomicUsize::new(0),
            detection_gate: None,
            rewrite_gate: None,
        }
    }

    fn translations(&self) -> usize {
        self.translations.load(Ordering::SeqCst)
    }
}

fn target_of(system: &str) -> &str {
    system
        .split("text to ")
        .nth(1)
        .and_then(|rest| rest.split('.').next())
        .unwrap_or("?")
}

#[async_trait]
impl GenerationClient for MockBackend {
    fn name(&self) -> String {
        "mock".to_string()
    }

    fn supports_images(&self) -> bool {
        true
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        if !request.images.is_empty() {
            self.images.fetch_add(1, Ordering::SeqCst);
            return Ok("A small test pattern.".to_string());
        }
        let system = request.system_prompt.as_deref().unwrap_or_default();

        if system == DETECTION_SYSTEM_PROMPT {
            if let Some(gate) = &self.detection_gate {
                gate.acquire().await.unwrap().forget();
            }
            return Ok(self.language.to_string());
        }
        if system == REWRITE_SYSTEM_PROMPT {
            if let Some(gate) = &self.rewrite_gate {
                gate.acquire().await.unwrap().forget();
            }
            let (position, prompt) = KIND_PROMPTS
                .iter()
                .enumerate()
                .find(|(_, p)| request.prompt.contains(p.instruction))
                .unwrap();
            tokio::time::sleep(Duration::from_millis(5 * (4 - position as u64))).await;
            self.rewrites.fetch_add(1, Ordering::SeqCst);
            return Ok(format!("{}-result", prompt.kind));
        }
        if system.contains("translator") {
            self.translations.fetch_add(1, Ordering::SeqCst);
            return Ok(format!("{} ({})", request.prompt, target_of(system)));
        }
        Ok(r#"{"summary": "A fox.", "tags": ["animals", "typing"], "category": "note"}"#.to_string())
    }
}

fn orchestrator(backend: Arc<MockBackend>, settings: ProcessingSettings) -> Orchestrator {
    let adapter = Arc::new(ProviderAdapter::new(backend));
    Orchestrator::new(ItemStore::new(50), adapter, settings)
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height))
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

#[tokio::test]
async fn test_every_prompt_kind_lands_regardless_of_order() {
    let backend = Arc::new(MockBackend::new("en"));
    let orchestrator = orchestrator(Arc::clone(&backend), ProcessingSettings::default());

    let id = orchestrator.ingest(CapturedContent::text(FOX)).await;
    orchestrator.drain().await;

    let item = orchestrator.store().get(id).await.unwrap();
    assert_eq!(item.prompt_results.len(), 4);
    for kind in [
        PromptKind::Grammar,
        PromptKind::Formal,
        PromptKind::Casual,
        PromptKind::Polished,
    ] {
        let slot = &item.prompt_results[&kind];
        assert_eq!(slot.text, format!("{kind}-result"));
        assert!(!slot.processing);
    }
    assert_eq!(item.content, FOX);
    assert_eq!(item.detected_language.as_deref(), Some("en"));
}

#[tokio::test]
async fn test_process_is_idempotent() {
    let backend = Arc::new(MockBackend::new("en"));
    let orchestrator = orchestrator(Arc::clone(&backend), ProcessingSettings::default());

    let id = orchestrator.ingest(CapturedContent::text(FOX)).await;
    assert!(!orchestrator.process(id).await);
    orchestrator.drain().await;
    assert!(!orchestrator.process(id).await);

    assert_eq!(backend.rewrites.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_translation_fans_out_to_other_languages_only() {
    let backend = Arc::new(MockBackend::new("en"));
    let orchestrator = orchestrator(Arc::clone(&backend), ProcessingSettings::default());
    let store = orchestrator.store().clone();

    let id = store.capture(CapturedContent::text(FOX), false).await;
    store
        .update(id, |item| item.detected_language = Some("en".to_string()))
        .await;

    assert_eq!(orchestrator.cascade().translate_to_all(id).await, 4);
    orchestrator.drain().await;

    let item = store.get(id).await.unwrap();
    assert_eq!(backend.translations(), 4);
    let mut languages: Vec<_> = item.translated_results.keys().cloned().collect();
    languages.sort();
    assert_eq!(languages, vec!["de", "es", "fr", "ja"]);
    assert!(!item.translated_results.contains_key("en"));
    assert_eq!(item.translation_text("ja"), Some(format!("{FOX} (Japanese)").as_str()));

    // Everything is translated: a second fan-out has nothing to do.
    assert_eq!(orchestrator.cascade().translate_to_all(id).await, 0);
}

#[tokio::test]
async fn test_translations_use_rewritten_text_when_detection_is_last() {
    let gate = Arc::new(Semaphore::new(0));
    let backend = Arc::new(MockBackend {
        detection_gate: Some(Arc::clone(&gate)),
        ..MockBackend::new("en")
    });
    let orchestrator = orchestrator(Arc::clone(&backend), ProcessingSettings::default());

    let id = orchestrator.ingest(CapturedContent::text(FOX)).await;
    loop {
        let item = orchestrator.store().get(id).await.unwrap();
        if item.prompt_results.values().all(|slot| slot.is_done()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    gate.add_permits(1);
    orchestrator.drain().await;

    let item = orchestrator.store().get(id).await.unwrap();
    assert_eq!(backend.translations(), 4);
    assert_eq!(item.translation_source, Some(TranslationSource::Transformed));
    assert_eq!(item.translation_text("fr"), Some("grammar-result (French)"));
}

#[tokio::test]
async fn test_original_translations_are_redone_once_from_rewrites() {
    let gate = Arc::new(Semaphore::new(0));
    let backend = Arc::new(MockBackend {
        rewrite_gate: Some(Arc::clone(&gate)),
        ..MockBackend::new("en")
    });
    let orchestrator = orchestrator(Arc::clone(&backend), ProcessingSettings::default());

    let id = orchestrator.ingest(CapturedContent::text(FOX)).await;
    while backend.translations() < 4 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    gate.add_permits(4);
    orchestrator.drain().await;

    let item = orchestrator.store().get(id).await.unwrap();
    assert_eq!(backend.translations(), 8);
    assert_eq!(item.translation_source, Some(TranslationSource::Transformed));
    for language in ["es", "fr", "de", "ja"] {
        let text = item.translation_text(language).unwrap();
        assert!(text.contains("-result ("), "{language}: {text}");
    }
}

#[tokio::test]
async fn test_orphaned_jobs_are_no_ops() {
    let gate = Arc::new(Semaphore::new(0));
    let backend = Arc::new(MockBackend {
        rewrite_gate: Some(Arc::clone(&gate)),
        detection_gate: Some(Arc::clone(&gate)),
        ..MockBackend::new("en")
    });
    let orchestrator = orchestrator(Arc::clone(&backend), ProcessingSettings::default());
    let store = orchestrator.store().clone();

    let doomed = orchestrator.ingest(CapturedContent::text(FOX)).await;
    assert!(store.remove(doomed).await);
    gate.add_permits(5);
    orchestrator.drain().await;

    assert!(store.get(doomed).await.is_none());
    assert!(store.is_empty().await);
    assert_eq!(backend.rewrites.load(Ordering::SeqCst), 4);
    assert_eq!(backend.translations(), 0);
}

#[tokio::test]
async fn test_small_images_are_not_described() {
    let backend = Arc::new(MockBackend::new("en"));
    let orchestrator = orchestrator(Arc::clone(&backend), ProcessingSettings::default());

    let tiny = orchestrator
        .ingest(CapturedContent::image(png(16, 200), "Image 16×200"))
        .await;
    let large = orchestrator
        .ingest(CapturedContent::image(png(128, 96), "Image 128×96"))
        .await;
    orchestrator.drain().await;

    let store = orchestrator.store();
    assert!(store.get(tiny).await.unwrap().image_analysis.is_none());
    let described = store.get(large).await.unwrap().image_analysis.unwrap();
    assert_eq!(described.text, "A small test pattern.");
    assert!(!described.processing);
    assert_eq!(backend.images.load(Ordering::SeqCst), 1);
    assert!(store.get(large).await.unwrap().prompt_results.is_empty());
}

#[tokio::test]
async fn test_auto_analysis_follows_capture_time_setting() {
    let backend = Arc::new(MockBackend::new("en"));
    let settings = ProcessingSettings {
        auto_analyze_images: false,
        ..ProcessingSettings::default()
    };
    let orchestrator = orchestrator(Arc::clone(&backend), settings);

    let id = orchestrator
        .ingest(CapturedContent::image(png(100, 100), "Image 100×100"))
        .await;
    orchestrator.drain().await;
    assert!(!orchestrator.analyze_image(id).await);
    assert!(orchestrator.store().get(id).await.unwrap().image_analysis.is_none());

    assert!(orchestrator.describe_image(id).await);
    orchestrator.drain().await;
    assert!(orchestrator.store().get(id).await.unwrap().image_analysis.is_some());
}

#[tokio::test]
async fn test_content_analysis_is_stored_and_cached() {
    let backend = Arc::new(MockBackend::new("en"));
    let orchestrator = orchestrator(Arc::clone(&backend), ProcessingSettings::default());
    let store = orchestrator.store().clone();
    let id = store.capture(CapturedContent::text(FOX), false).await;

    let request = cliplens::provider::RequestType::Combined;
    orchestrator.analyze_content(id, request.clone()).await.unwrap();
    orchestrator.analyze_content(id, request).await.unwrap();

    let analysis = store.get(id).await.unwrap().analysis.unwrap();
    assert_eq!(analysis.summary.as_deref(), Some("A fox."));
    assert_eq!(analysis.tags, vec!["animals", "typing"]);
    assert_eq!(analysis.category.as_deref(), Some("note"));
    assert_eq!(orchestrator.adapter().cache().len(), 1);
}
