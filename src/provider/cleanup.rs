//! Post-processing of raw model output.

/// Leading phrases models use to announce their answer, matched as whole words.
const ECHO_PREFIXES: &[&str] = &[
    "here is",
    "here's",
    "sure",
    "certainly",
    "of course",
    "okay",
    "the corrected",
    "the rewritten",
    "the revised",
    "the translated",
    "corrected",
    "rewritten",
    "revised",
    "translated",
    "formal version",
    "casual version",
    "polished version",
];

/// Generic labels that only count as an echo when they are the whole label.
const ECHO_LABELS: &[&str] = &["translation", "output", "result", "instruction", "text"];

/// Labels longer than this are treated as content, not an announcement.
const MAX_LABEL_WORDS: usize = 6;

enum EchoLine<'a> {
    Drop,
    Keep(&'a str),
    NotEcho,
}

fn starts_with_word(text: &str, prefix: &str) -> bool {
    text.strip_prefix(prefix)
        .is_some_and(|rest| !rest.starts_with(char::is_alphanumeric))
}

fn classify_line(line: &str) -> EchoLine<'_> {
    let Some((label, rest)) = line.trim().split_once(':') else {
        return EchoLine::NotEcho;
    };
    if label.split_whitespace().count() > MAX_LABEL_WORDS {
        return EchoLine::NotEcho;
    }
    let label = label.trim().to_lowercase();
    let bare = label.trim_end_matches(|c: char| !c.is_alphanumeric());
    let echo = ECHO_LABELS.contains(&bare)
        || ECHO_PREFIXES
            .iter()
            .any(|prefix| starts_with_word(&label, prefix));
    if !echo {
        return EchoLine::NotEcho;
    }

    let rest = rest.trim();
    if rest.is_empty() || bare == "instruction" {
        EchoLine::Drop
    } else {
        EchoLine::Keep(rest)
    }
}

/// Removes leading lines that echo the prompt (`"Here is the corrected text:"`).
///
/// `"Label: content"` lines keep their content. Matching is case-insensitive
/// and stops at the first line that is not an announcement.
pub fn strip_prompt_echo(text: &str) -> String {
    let mut lines = text.lines().peekable();
    let mut kept: Vec<&str> = Vec::new();

    while let Some(line) = lines.peek() {
        if line.trim().is_empty() {
            lines.next();
            continue;
        }
        match classify_line(line) {
            EchoLine::Drop => {
                lines.next();
            }
            EchoLine::Keep(rest) => {
                kept.push(rest);
                lines.next();
                break;
            }
            EchoLine::NotEcho => break,
        }
    }

    kept.extend(lines);
    kept.join("\n").trim().to_string()
}

/// Position of the `**` closing an emphasis opened just before `text`.
fn closing_bold(text: &str) -> Option<usize> {
    text.match_indices("**").map(|(i, _)| i).find(|&i| {
        i > 0
            && !text[..i].ends_with(char::is_whitespace)
            && !text[i + 2..].starts_with(char::is_alphanumeric)
    })
}

/// Removes `**bold**` pairs that open and close at word edges.
///
/// Unpaired markers and ones inside words (`2**8`) are left alone.
fn strip_bold(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(start) = rest.find("**") {
        let (before, after) = (&rest[..start], &rest[start + 2..]);
        out.push_str(before);
        let opens = !before.ends_with(char::is_alphanumeric)
            && after.starts_with(|c: char| !c.is_whitespace());
        match closing_bold(after).filter(|_| opens) {
            Some(end) => {
                out.push_str(&after[..end]);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("**");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Removes `__` only when it wraps a whole line, so `__init__` in prose survives.
fn strip_underline(line: &str) -> &str {
    let trimmed = line.trim();
    trimmed
        .strip_prefix("__")
        .and_then(|rest| rest.strip_suffix("__"))
        .filter(|inner| !inner.is_empty() && !inner.contains("__") && inner.contains(' '))
        .unwrap_or(line)
}

/// Strips markdown emphasis, code fences and wrapping quotes or brackets.
pub fn strip_markup(text: &str) -> String {
    let cleaned = text
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .map(|line| strip_bold(strip_underline(line)))
        .collect::<Vec<_>>()
        .join("\n");

    let mut result = cleaned.trim();
    for (open, close) in [('"', '"'), ('\u{201c}', '\u{201d}'), ('[', ']'), ('<', '>')] {
        if let Some(inner) = result
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
            && !inner.contains(open)
        {
            result = inner.trim();
        }
    }
    result.to_string()
}

/// Full cleanup pass applied to rewrite and translation responses.
pub fn clean_response(text: &str) -> String {
    strip_markup(&strip_prompt_echo(text))
}

/// The slice from the first `{` to the last `}`, if any.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Parses a comma or newline separated tag list, capped at `max_tags`.
pub fn parse_tags(text: &str, max_tags: usize) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for raw in text.split([',', '\n']) {
        let tag = raw
            .trim()
            .trim_start_matches(['-', '*', '#'])
            .trim_matches(['"', '\'', '.', '[', ']'])
            .trim();
        if tag.is_empty() || tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            continue;
        }
        tags.push(tag.to_string());
        if tags.len() == max_tags {
            break;
        }
    }
    tags
}

/// First word-ish line of a classification response, lowercased.
pub fn parse_category(text: &str) -> Option<String> {
    let cleaned = strip_prompt_echo(text);
    let line = cleaned.lines().next()?;
    let category = line
        .rsplit_once(':')
        .map_or(line, |(_, value)| value)
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    (!category.is_empty()).then_some(category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_prompt_echo_drops_announcement() {
        assert_eq!(
            strip_prompt_echo("Here is the corrected text:\nHello World."),
            "Hello World."
        );
    }

    #[test]
    fn test_strip_prompt_echo_is_case_insensitive() {
        assert_eq!(
            strip_prompt_echo("SURE! HERE IS THE FORMAL VERSION:\n\nDear Sir."),
            "Dear Sir."
        );
    }

    #[test]
    fn test_strip_prompt_echo_keeps_labelled_content() {
        assert_eq!(strip_prompt_echo("Translation: Hola mundo"), "Hola mundo");
    }

    #[test]
    fn test_strip_prompt_echo_leaves_normal_text() {
        let text = "The meeting is at 5.\nHere is: the agenda";
        assert_eq!(strip_prompt_echo(text), text);
    }

    #[test]
    fn test_strip_prompt_echo_keeps_words_that_only_start_like_labels() {
        for text in [
            "Results: we won 3-1.",
            "Texture: smooth and soft.",
            "Surely: yes.",
            "Outputs: two files.",
            "Translations: see appendix.",
        ] {
            assert_eq!(clean_response(text), text);
        }
    }

    #[test]
    fn test_strip_prompt_echo_needs_generic_label_alone() {
        assert_eq!(strip_prompt_echo("Result: 42"), "42");
        assert_eq!(
            strip_prompt_echo("Result of the vote: 42"),
            "Result of the vote: 42"
        );
    }

    #[test]
    fn test_strip_prompt_echo_drops_instruction_echo() {
        assert_eq!(
            strip_prompt_echo("Instruction: Fix all grammar\nText:\nI am here."),
            "I am here."
        );
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(strip_markup("**Hello** World"), "Hello World");
        assert_eq!(strip_markup("__Hello World__"), "Hello World");
        assert_eq!(strip_markup("\"Quoted answer\""), "Quoted answer");
        assert_eq!(strip_markup("[Bracketed]"), "Bracketed");
        assert_eq!(strip_markup("```\ncode\n```"), "code");
        assert_eq!(strip_markup("[a] and [b]"), "[a] and [b]");
    }

    #[test]
    fn test_strip_markup_keeps_identifiers_and_operators() {
        assert_eq!(
            strip_markup("Call __init__ before **using** it."),
            "Call __init__ before using it."
        );
        assert_eq!(strip_markup("__init__"), "__init__");
        assert_eq!(strip_markup("It is 2**8 bytes."), "It is 2**8 bytes.");
        assert_eq!(strip_markup("a ** b"), "a ** b");
    }

    #[test]
    fn test_clean_response() {
        assert_eq!(
            clean_response("Here's the polished version:\n**Hello World.**"),
            "Hello World."
        );
    }

    #[test]
    fn test_extract_json() {
        assert_eq!(
            extract_json("Sure! {\"a\": {\"b\": 1}} hope this helps"),
            Some("{\"a\": {\"b\": 1}}")
        );
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_parse_tags_caps_and_dedupes() {
        let tags = parse_tags("#rust, Async, rust, tokio,\n- cli, serde, json", 5);
        assert_eq!(tags, vec!["rust", "Async", "tokio", "cli", "serde"]);
    }

    #[test]
    fn test_parse_tags_empty() {
        assert!(parse_tags(" , ,", 5).is_empty());
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category("Category: Code."), Some("code".to_string()));
        assert_eq!(parse_category("message"), Some("message".to_string()));
        assert_eq!(parse_category("  "), None);
    }
}
