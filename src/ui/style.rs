//! Consistent styling for CLI output, built on owo-colors.

use owo_colors::OwoColorize;
use std::fmt::Display;

pub struct Style;

impl Style {
    /// Section headers ("Rewrites", "Translations")
    pub fn header<T: Display>(text: T) -> String {
        format!("{}", text.bold())
    }

    pub fn label<T: Display>(text: T) -> String {
        format!("{}", text.dimmed())
    }

    /// Primary values such as provider, model or prompt kind names
    pub fn value<T: Display>(text: T) -> String {
        format!("{}", text.cyan())
    }

    pub fn secondary<T: Display>(text: T) -> String {
        format!("{}", text.dimmed())
    }

    pub fn success<T: Display>(text: T) -> String {
        format!("{}", text.green())
    }

    pub fn warning<T: Display>(text: T) -> String {
        format!("{}", text.yellow())
    }

    /// Language codes
    pub fn code<T: Display>(text: T) -> String {
        format!("{}", text.yellow())
    }

    pub fn hint<T: Display>(text: T) -> String {
        format!("{}", text.dimmed().italic())
    }

    /// A parenthesized marker such as `(default)` or `(selected)`.
    pub fn marker<T: Display>(text: T) -> String {
        format!("{}", format!("({text})").dimmed())
    }
}
