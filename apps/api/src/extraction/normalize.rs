//! Turns fetched page content into bounded plain text for a prompt.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Character budgets used for prompt content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentBudget {
    /// ~1,000 tokens; cheaper calls.
    Compact,
    /// Richer extraction, used whenever quality matters more than cost.
    Full,
}

impl ContentBudget {
    pub const fn chars(self) -> usize {
        match self {
            ContentBudget::Compact => 4_000,
            ContentBudget::Full => 8_000,
        }
    }
}

/// Normalized page text. Only `normalize` constructs it, so its length in
/// characters never exceeds the budget it was built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContent(String);

impl RawContent {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Strips script/style blocks and markup, collapses whitespace and cuts the
/// result to at most `budget` characters.
///
/// Tags become a single space so adjacent elements never fuse into one word.
/// The cut is a hard one; whatever lies past the budget is dropped.
pub fn normalize(raw: &str, budget: usize) -> RawContent {
    let text = SCRIPT_BLOCK.replace_all(raw, " ");
    let text = STYLE_BLOCK.replace_all(&text, " ");
    let text = TAG.replace_all(&text, " ");
    normalize_text(&text, budget)
}

/// Whitespace collapse and budget cut only, for content that is already
/// plain text. `<` and `>` survive untouched.
pub fn normalize_text(text: &str, budget: usize) -> RawContent {
    let text = WHITESPACE.replace_all(text, " ");
    let text = text.trim();

    let cut = text
        .char_indices()
        .nth(budget)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());

    // The cut can land right after a space; trim again so the output stays a
    // fixed point of normalization.
    RawContent(text[..cut].trim_end().to_string())
}
