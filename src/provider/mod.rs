//! Backend-agnostic prompting and response parsing.

mod adapter;
pub mod cleanup;
pub mod prompt;

pub use adapter::ProviderAdapter;

use crate::item::ContentAnalysis;

/// Upper bound on tags kept from any response.
pub const MAX_TAGS: usize = 5;

/// Structured processing requests understood by [`ProviderAdapter::process`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestType {
    Summarize,
    ExtractTags,
    Classify,
    /// Summary, tags and category in one JSON response.
    Combined,
    /// Free-form instruction applied to the text.
    Custom(String),
}

impl RequestType {
    /// Stable discriminator mixed into result-cache keys.
    pub fn cache_tag(&self) -> String {
        match self {
            Self::Summarize => "summarize".to_string(),
            Self::ExtractTags => "tags".to_string(),
            Self::Classify => "classify".to_string(),
            Self::Combined => "combined".to_string(),
            Self::Custom(instruction) => format!("custom:{instruction}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessedResult {
    Summary(String),
    Tags(Vec<String>),
    Category(String),
    Combined(ContentAnalysis),
    Custom(String),
}

impl ProcessedResult {
    /// Folds this result into `analysis`. Returns `false` for results that
    /// have no place in a [`ContentAnalysis`].
    pub fn merge_into(&self, analysis: &mut ContentAnalysis) -> bool {
        match self {
            Self::Summary(summary) => analysis.summary = Some(summary.clone()),
            Self::Tags(tags) => analysis.tags.clone_from(tags),
            Self::Category(category) => analysis.category = Some(category.clone()),
            Self::Combined(combined) => {
                if combined.summary.is_some() {
                    analysis.summary.clone_from(&combined.summary);
                }
                if !combined.tags.is_empty() {
                    analysis.tags.clone_from(&combined.tags);
                }
                if combined.category.is_some() {
                    analysis.category.clone_from(&combined.category);
                }
            }
            Self::Custom(_) => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_tags_are_distinct() {
        let tags = [
            RequestType::Summarize,
            RequestType::ExtractTags,
            RequestType::Classify,
            RequestType::Combined,
            RequestType::Custom("a".to_string()),
            RequestType::Custom("b".to_string()),
        ]
        .map(|r| r.cache_tag());
        for (i, tag) in tags.iter().enumerate() {
            assert!(!tags[i + 1..].contains(tag), "duplicate tag {tag}");
        }
    }

    #[test]
    fn test_merge_combined_keeps_existing_fields() {
        let mut analysis = ContentAnalysis {
            summary: Some("old".to_string()),
            tags: vec!["x".to_string()],
            category: None,
        };
        let merged = ProcessedResult::Combined(ContentAnalysis {
            summary: None,
            tags: vec![],
            category: Some("code".to_string()),
        })
        .merge_into(&mut analysis);

        assert!(merged);
        assert_eq!(analysis.summary.as_deref(), Some("old"));
        assert_eq!(analysis.tags, vec!["x"]);
        assert_eq!(analysis.category.as_deref(), Some("code"));
    }

    #[test]
    fn test_custom_results_are_not_merged() {
        let mut analysis = ContentAnalysis::default();
        assert!(!ProcessedResult::Custom("x".to_string()).merge_into(&mut analysis));
        assert_eq!(analysis, ContentAnalysis::default());
    }
}
