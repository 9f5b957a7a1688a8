//! Clipboard history records and their AI result slots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Stable identity of a history item.
pub type ItemId = Uuid;

/// ISO 639-1 language code (e.g. `en`, `ja`).
pub type LanguageCode = String;

/// What kind of payload an item was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Text,
    Link,
    Image,
    File,
    Other,
}

impl ItemType {
    /// Returns `true` for items whose content is rewritable text.
    pub const fn is_textual(self) -> bool {
        matches!(self, Self::Text | Self::Link)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Link => "link",
            Self::Image => "image",
            Self::File => "file",
            Self::Other => "other",
        }
    }
}

/// A text-rewrite transformation applied to every text item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Grammar,
    Formal,
    Casual,
    Polished,
}

impl PromptKind {
    /// Every known kind, in the order used to pick the best transformed text.
    pub const ALL: [Self; 4] = [Self::Grammar, Self::Polished, Self::Formal, Self::Casual];

    pub const fn key(self) -> &'static str {
        match self {
            Self::Grammar => "grammar",
            Self::Formal => "formal",
            Self::Casual => "casual",
            Self::Polished => "polished",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One generated result. An absent slot means "never computed or failed".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSlot {
    pub text: String,
    pub processing: bool,
}

impl ResultSlot {
    pub const fn pending() -> Self {
        Self {
            text: String::new(),
            processing: true,
        }
    }

    pub const fn done(text: String) -> Self {
        Self {
            text,
            processing: false,
        }
    }

    pub const fn is_done(&self) -> bool {
        !self.processing
    }
}

/// Which text the current set of translations was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationSource {
    Original,
    Transformed,
}

/// Summary, tags and category derived from an item's text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Raw input handed over by the clipboard capture collaborator.
#[derive(Debug, Clone)]
pub struct CapturedContent {
    pub item_type: ItemType,
    pub content: String,
    pub image_data: Option<Vec<u8>>,
    pub rtf: Option<String>,
    pub html: Option<String>,
    pub source_app: Option<String>,
}

impl CapturedContent {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            item_type: ItemType::Text,
            content: content.into(),
            image_data: None,
            rtf: None,
            html: None,
            source_app: None,
        }
    }

    pub fn image(data: Vec<u8>, description: impl Into<String>) -> Self {
        Self {
            item_type: ItemType::Image,
            content: description.into(),
            image_data: Some(data),
            rtf: None,
            html: None,
            source_app: None,
        }
    }

    #[must_use]
    pub fn with_source_app(mut self, app: impl Into<String>) -> Self {
        self.source_app = Some(app.into());
        self
    }
}

/// A captured clipboard entry plus everything computed for it.
///
/// Content fields are written once at capture. Only the result fields change
/// afterwards, and only through the item store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardItem {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub content: String,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub image_data: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source_app: Option<String>,

    #[serde(default)]
    pub prompt_results: BTreeMap<PromptKind, ResultSlot>,
    #[serde(default)]
    pub selected_prompt: Option<PromptKind>,
    #[serde(default)]
    pub detected_language: Option<LanguageCode>,
    #[serde(default)]
    pub translated_results: BTreeMap<LanguageCode, ResultSlot>,
    #[serde(default)]
    pub selected_target_language: Option<LanguageCode>,
    #[serde(default)]
    pub translation_source: Option<TranslationSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_analysis: Option<ResultSlot>,
    /// Whether automatic image analysis was enabled when this item was captured.
    #[serde(default)]
    pub auto_analyze_image: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ContentAnalysis>,
    #[serde(default)]
    pub is_useful: bool,
}

impl ClipboardItem {
    pub fn new(captured: CapturedContent, auto_analyze_image: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_type: captured.item_type,
            content: captured.content,
            image_data: captured.image_data,
            rtf: captured.rtf,
            html: captured.html,
            timestamp: Utc::now(),
            source_app: captured.source_app,
            prompt_results: BTreeMap::new(),
            selected_prompt: None,
            detected_language: None,
            translated_results: BTreeMap::new(),
            selected_target_language: None,
            translation_source: None,
            image_analysis: None,
            auto_analyze_image: auto_analyze_image && captured.item_type == ItemType::Image,
            analysis: None,
            is_useful: false,
        }
    }

    /// Drops result slots that are still marked processing.
    pub fn discard_in_flight(&mut self) {
        self.prompt_results.retain(|_, slot| !slot.processing);
        self.translated_results.retain(|_, slot| !slot.processing);
        if self.image_analysis.as_ref().is_some_and(|slot| slot.processing) {
            self.image_analysis = None;
        }
    }

    /// Plain text used as input for every text prompt.
    pub fn plain_text(&self) -> &str {
        self.content.trim()
    }

    /// Returns `true` once any prompt slot exists, pending or finished.
    pub fn has_any_result(&self) -> bool {
        !self.prompt_results.is_empty()
    }

    pub fn is_prompt_processing(&self, kind: PromptKind) -> bool {
        self.prompt_results.get(&kind).is_some_and(|slot| slot.processing)
    }

    pub fn is_translation_processing(&self, language: &str) -> bool {
        self.translated_results
            .get(language)
            .is_some_and(|slot| slot.processing)
    }

    /// The finished text for `kind`, if any.
    pub fn prompt_text(&self, kind: PromptKind) -> Option<&str> {
        self.prompt_results
            .get(&kind)
            .filter(|slot| slot.is_done())
            .map(|slot| slot.text.as_str())
    }

    /// Best finished rewrite: the selected kind first, then [`PromptKind::ALL`] order.
    pub fn best_transformed_text(&self) -> Option<&str> {
        self.selected_prompt
            .and_then(|kind| self.prompt_text(kind))
            .or_else(|| PromptKind::ALL.into_iter().find_map(|kind| self.prompt_text(kind)))
    }

    /// Text the translation cascade should translate, and where it came from.
    pub fn translation_input(&self) -> (&str, TranslationSource) {
        self.best_transformed_text().map_or_else(
            || (self.plain_text(), TranslationSource::Original),
            |text| (text, TranslationSource::Transformed),
        )
    }

    pub fn translation_text(&self, language: &str) -> Option<&str> {
        self.translated_results
            .get(language)
            .filter(|slot| slot.is_done())
            .map(|slot| slot.text.as_str())
    }

    /// Text shown for this item given the current prompt and language selection.
    pub fn display_text(&self) -> &str {
        if let Some(language) = &self.selected_target_language
            && let Some(text) = self.translation_text(language)
        {
            return text;
        }
        self.selected_prompt
            .and_then(|kind| self.prompt_text(kind))
            .unwrap_or(&self.content)
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_kind_keys_round_trip() {
        for kind in PromptKind::ALL {
            assert_eq!(PromptKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(PromptKind::from_key("shouty"), None);
    }

    #[test]
    fn test_new_item_only_flags_images_for_auto_analysis() {
        let text = ClipboardItem::new(CapturedContent::text("hello"), true);
        assert!(!text.auto_analyze_image);

        let image = ClipboardItem::new(CapturedContent::image(vec![1, 2, 3], "Image"), true);
        assert!(image.auto_analyze_image);
    }

    #[test]
    fn test_best_transformed_text_prefers_selection() {
        let mut item = ClipboardItem::new(CapturedContent::text("teh text"), false);
        assert_eq!(item.translation_input().1, TranslationSource::Original);

        item.prompt_results
            .insert(PromptKind::Casual, ResultSlot::done("casual".to_string()));
        item.prompt_results
            .insert(PromptKind::Grammar, ResultSlot::done("grammar".to_string()));
        assert_eq!(item.best_transformed_text(), Some("grammar"));

        item.selected_prompt = Some(PromptKind::Casual);
        assert_eq!(item.best_transformed_text(), Some("casual"));
        assert_eq!(
            item.translation_input(),
            ("casual", TranslationSource::Transformed)
        );
    }

    #[test]
    fn test_pending_slots_are_not_results() {
        let mut item = ClipboardItem::new(CapturedContent::text("text"), false);
        item.prompt_results
            .insert(PromptKind::Grammar, ResultSlot::pending());
        assert!(item.has_any_result());
        assert!(item.is_prompt_processing(PromptKind::Grammar));
        assert_eq!(item.best_transformed_text(), None);
    }

    #[test]
    fn test_display_text_follows_language_override() {
        let mut item = ClipboardItem::new(CapturedContent::text("hello"), false);
        item.translated_results
            .insert("es".to_string(), ResultSlot::done("hola".to_string()));
        assert_eq!(item.display_text(), "hello");

        item.selected_target_language = Some("es".to_string());
        assert_eq!(item.display_text(), "hola");
    }

    #[test]
    fn test_image_bytes_serialize_as_base64() {
        let item = ClipboardItem::new(CapturedContent::image(vec![0, 255, 7], "Image"), false);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["imageData"], "AP8H");
        assert_eq!(json["type"], "image");

        let back: ClipboardItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }
}
