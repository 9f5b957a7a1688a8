use crate::item::PromptKind;

pub const REWRITE_SYSTEM_PROMPT: &str = "You are a writing assistant. Rewrite the text the user sends according to the instruction. \
     Output only the rewritten text without any explanations, headings or quotes. \
     Preserve the original language, meaning and line breaks.";

pub const TRANSLATION_SYSTEM_PROMPT_TEMPLATE: &str = "You are a translator. Translate the following text to {target_language}. \
     Output only the translated text without any explanations. \
     Preserve the original formatting including blank lines and whitespace.";

pub const DETECTION_SYSTEM_PROMPT: &str = "Identify the language of the text the user sends. \
     Reply with only its two-letter ISO 639-1 code, for example: en";

pub const IMAGE_SYSTEM_PROMPT: &str = "You describe images for a clipboard history. \
     Reply with one or two plain sentences covering the main subject and any visible text.";

pub const IMAGE_PROMPT: &str = "Describe this image.";

/// Rewrite instruction for one prompt kind.
#[derive(Debug, Clone)]
pub struct KindPrompt {
    pub kind: PromptKind,
    /// Human-readable description.
    pub description: &'static str,
    pub instruction: &'static str,
}

pub const KIND_PROMPTS: &[KindPrompt] = &[
    KindPrompt {
        kind: PromptKind::Grammar,
        description: "Fix grammar and spelling",
        instruction: "Fix all grammar, spelling and punctuation mistakes. Change nothing else.",
    },
    KindPrompt {
        kind: PromptKind::Formal,
        description: "Formal, business-appropriate",
        instruction: "Rewrite in a formal, polite, business-appropriate tone.",
    },
    KindPrompt {
        kind: PromptKind::Casual,
        description: "Casual, conversational tone",
        instruction: "Rewrite in a casual, friendly, conversational tone.",
    },
    KindPrompt {
        kind: PromptKind::Polished,
        description: "Clear and polished",
        instruction: "Rewrite to be clear, concise and polished while keeping the meaning.",
    },
];

pub fn kind_prompt(kind: PromptKind) -> &'static KindPrompt {
    KIND_PROMPTS
        .iter()
        .find(|p| p.kind == kind)
        .unwrap_or(&KIND_PROMPTS[0])
}

pub fn build_rewrite_prompt(kind: PromptKind, text: &str) -> String {
    format!(
        "Instruction: {}\n\nText:\n{text}",
        kind_prompt(kind).instruction
    )
}

#[allow(clippy::literal_string_with_formatting_args)]
pub fn build_translation_system_prompt(target_language: &str) -> String {
    // {target_language} is a placeholder for string replacement, not a format argument
    TRANSLATION_SYSTEM_PROMPT_TEMPLATE.replace("{target_language}", target_language)
}

pub fn build_summarize_prompt(text: &str) -> String {
    format!("Summarize the following text in one or two sentences. Output only the summary.\n\n{text}")
}

pub fn build_tags_prompt(text: &str, max_tags: usize) -> String {
    format!(
        "List up to {max_tags} short topic tags for the following text as a comma-separated list. \
         Output only the tags.\n\n{text}"
    )
}

pub fn build_classify_prompt(text: &str) -> String {
    format!(
        "Classify the following text into one category: code, url, email, address, note, message, \
         document, data, other. Output only the category.\n\n{text}"
    )
}

pub fn build_combined_prompt(text: &str, max_tags: usize) -> String {
    format!(
        "Analyze the following text and reply with JSON only, in this shape:\n\
         {{\"summary\": \"one sentence\", \"tags\": [\"up to {max_tags} tags\"], \"category\": \"one word\"}}\n\n{text}"
    )
}

pub fn build_custom_prompt(instruction: &str, text: &str) -> String {
    format!("{instruction}\n\n{text}")
}
