//! Language codes, names and detection-response parsing.

use anyhow::Result;

use crate::item::LanguageCode;
use crate::ui::Style;

/// Languages every text item is translated into by default.
pub const DEFAULT_LANGUAGES: &[&str] = &["en", "es", "fr", "de", "ja"];

/// Used when a detection response names no recognizable language.
pub const FALLBACK_LANGUAGE: &str = "en";

/// Texts with fewer alphanumeric characters are not worth detecting.
pub const MIN_DETECTION_CHARS: usize = 5;

/// Language codes (ISO 639-1) recognized in detection responses, with names.
pub const KNOWN_LANGUAGES: &[(&str, &str)] = &[
    ("ar", "Arabic"),
    ("cs", "Czech"),
    ("da", "Danish"),
    ("de", "German"),
    ("el", "Greek"),
    ("en", "English"),
    ("es", "Spanish"),
    ("fi", "Finnish"),
    ("fr", "French"),
    ("he", "Hebrew"),
    ("hi", "Hindi"),
    ("id", "Indonesian"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("nl", "Dutch"),
    ("no", "Norwegian"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("sv", "Swedish"),
    ("th", "Thai"),
    ("tr", "Turkish"),
    ("uk", "Ukrainian"),
    ("vi", "Vietnamese"),
    ("zh", "Chinese"),
];

pub fn default_languages() -> Vec<LanguageCode> {
    DEFAULT_LANGUAGES.iter().map(ToString::to_string).collect()
}

/// English name of `code`, or the code itself when unknown.
pub fn language_name(code: &str) -> &str {
    KNOWN_LANGUAGES
        .iter()
        .find(|(known, _)| *known == code)
        .map_or(code, |(_, name)| name)
}

/// Counts characters that carry meaning for language detection.
pub fn meaningful_chars(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphanumeric()).count()
}

/// Pulls a language code out of a free-form detection answer.
///
/// Accepts a bare code (`"ja"`), a code with noise (`"Language: FR."`,
/// `"en-US"`), or a language name (`"Spanish"`).
pub fn parse_language_code(response: &str) -> Option<LanguageCode> {
    let lowered = response.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();

    // A lone code (possibly with a region suffix) is the expected answer.
    if let Some(first) = words.first()
        && words.len() <= 2
        && let Some((code, _)) = KNOWN_LANGUAGES.iter().find(|(code, _)| code == first)
    {
        return Some((*code).to_string());
    }

    // Names before codes: "it" and "no" are also English words.
    let by_name = words.iter().find_map(|word| {
        KNOWN_LANGUAGES
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(word))
    });
    by_name
        .or_else(|| {
            words
                .iter()
                .find_map(|word| KNOWN_LANGUAGES.iter().find(|(code, _)| code == word))
        })
        .map(|(code, _)| (*code).to_string())
}

/// Prints the configured target languages to stdout.
pub fn print_languages(languages: &[LanguageCode]) {
    println!("{}", Style::header("Translation languages"));
    for code in languages {
        println!(
            "  {:5} {}",
            Style::code(code),
            Style::secondary(language_name(code))
        );
    }
}

/// Validates that `lang` is one of the configured languages.
///
/// # Errors
///
/// Returns an error naming the valid codes otherwise.
pub fn validate_language(lang: &str, languages: &[LanguageCode]) -> Result<()> {
    if languages.iter().any(|code| code == lang) {
        Ok(())
    } else {
        anyhow::bail!(
            "Invalid language code: '{lang}'\n\n\
             Configured languages: {}\n\
             Run 'cliplens languages' to see them with names.",
            languages.join(", ")
        )
    }
}
