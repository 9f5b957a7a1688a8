//! Language detection and the translation fan-out.

mod cascade;
mod language;

pub use cascade::TranslationCascade;
pub use language::{
    DEFAULT_LANGUAGES, FALLBACK_LANGUAGE, KNOWN_LANGUAGES, MIN_DETECTION_CHARS, default_languages,
    language_name, meaningful_chars, parse_language_code, print_languages, validate_language,
};
