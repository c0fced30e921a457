//! Core data models: categories, contributed items, and language choices.

use anyhow::{bail, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Collection an item belongs to. Each category is stored separately and
/// only compared against itself during duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(
        rename = "Proverb",
        alias = "proverb",
        alias = "proverbs",
        alias = "Proverbs"
    )]
    Proverb,
    #[serde(
        rename = "Life Lesson",
        alias = "life lesson",
        alias = "Life Lessons",
        alias = "life lessons",
        alias = "life-lesson",
        alias = "life-lessons",
        alias = "life_lesson",
        alias = "life_lessons",
        alias = "lifelesson",
        alias = "lifelessons",
        alias = "lesson",
        alias = "lessons"
    )]
    LifeLesson,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Proverb, Category::LifeLesson];

    /// Human-facing label, also the serialized `type` value.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Proverb => "Proverb",
            Category::LifeLesson => "Life Lesson",
        }
    }

    /// Storage key for the category's collection.
    pub fn collection(&self) -> &'static str {
        match self {
            Category::Proverb => "proverbs",
            Category::LifeLesson => "life_lessons",
        }
    }

    /// Lowercase plural used in user-facing sentences ("No proverbs ...").
    pub fn plural(&self) -> &'static str {
        match self {
            Category::Proverb => "proverbs",
            Category::LifeLesson => "life lessons",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect();
        match normalized.as_str() {
            "proverb" | "proverbs" => Ok(Category::Proverb),
            "lifelesson" | "lifelessons" | "lesson" | "lessons" => Ok(Category::LifeLesson),
            _ => bail!(
                "Unknown category: '{}'. Must be proverb or life-lesson.",
                s.trim()
            ),
        }
    }
}

/// A single contributed text unit. Created once at acceptance time and never
/// mutated afterwards.
///
/// Field order matches the export column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default = "unknown_language")]
    pub language: String,
    #[serde(default)]
    pub region_hint: String,
    #[serde(default = "anonymous")]
    pub contributor: String,
    pub text: String,
    #[serde(rename = "type")]
    pub category: Category,
}

impl Item {
    /// Build a new item with a fresh id and the current UTC time.
    ///
    /// `text` must already be trimmed and non-empty; blank metadata gets the
    /// usual defaults.
    pub fn new(
        category: Category,
        text: &str,
        language: String,
        region_hint: Option<&str>,
        contributor: Option<&str>,
    ) -> Self {
        let contributor = contributor
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .unwrap_or_else(anonymous);

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            language,
            region_hint: region_hint.map(str::trim).unwrap_or_default().to_string(),
            contributor,
            text: text.to_string(),
            category,
        }
    }
}

pub const ANONYMOUS: &str = "Anonymous";
pub const UNKNOWN_LANGUAGE: &str = "Unknown";
pub const OTHER_LANGUAGE: &str = "Other (Please Specify)";

fn anonymous() -> String {
    ANONYMOUS.to_string()
}

fn unknown_language() -> String {
    UNKNOWN_LANGUAGE.to_string()
}

/// Languages offered to contributors, in display order. [`OTHER_LANGUAGE`]
/// follows them as the free-form escape hatch.
pub const LANGUAGE_OPTIONS: [&str; 11] = [
    "Telugu",
    "Hindi",
    "Tamil",
    "Kannada",
    "Malayalam",
    "Bengali",
    "Marathi",
    "Gujarati",
    "Odia",
    "Punjabi",
    "English",
];

/// Resolve the contributor's language choice to the stored label.
///
/// - a listed option (any case) maps to its canonical spelling
/// - `"other"` or [`OTHER_LANGUAGE`] takes `custom`, or `"Unknown"` when blank
/// - a blank choice is `"Unknown"`
/// - anything else is kept as a free-form language name
pub fn resolve_language(choice: &str, custom: Option<&str>) -> String {
    let choice = choice.trim();

    if choice.is_empty() {
        return unknown_language();
    }

    if let Some(option) = LANGUAGE_OPTIONS
        .iter()
        .find(|o| o.eq_ignore_ascii_case(choice))
    {
        return (*option).to_string();
    }

    if choice.eq_ignore_ascii_case("other") || choice.eq_ignore_ascii_case(OTHER_LANGUAGE) {
        return custom
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .unwrap_or_else(unknown_language);
    }

    choice.to_string()
}
