//! Repository search boundary.
//!
//! The natural-language search front-end is an external collaborator; this
//! module fixes only its contract: the filter/sort vocabulary, the returned
//! metadata shape, and the pure text helpers the front-end falls back on
//! when its LLM keyword extraction fails.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::RepoMetadata;

/// Sort key for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Stars,
    Forks,
    Updated,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Stars => "stars",
            SortBy::Forks => "forks",
            SortBy::Updated => "updated",
        }
    }
}

/// Filters applied to a repository search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    pub min_stars: Option<u64>,
    pub min_forks: Option<u64>,
    pub language: Option<String>,
    pub sort_by: SortBy,
    /// ISO 8601 date; only repositories pushed after it are returned.
    pub updated_since: Option<String>,
}

/// A capability that resolves keywords + filters into ranked repository
/// metadata. Implemented outside this crate against a concrete hosting
/// provider's search API.
pub trait RepoSearch {
    fn search(
        &self,
        keywords: &[String],
        filters: &SearchFilters,
    ) -> impl Future<Output = Result<Vec<RepoMetadata>>> + Send;
}

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "that", "with", "this", "what", "how", "from", "into", "about",
];

/// Fallback keyword extraction: split the query, drop short tokens and stop
/// words. Used when LLM-based extraction is unavailable or unparseable.
pub fn fallback_keywords(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.len() > 3 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Whether user input is a direct repository URL rather than a description.
pub fn looks_like_repo_url(text: &str) -> bool {
    (text.starts_with("http://") || text.starts_with("https://"))
        && text.to_lowercase().contains("github.com")
}

/// Truncate text at a sentence boundary within `max_chars`, for compact
/// README summaries in search result listings.
pub fn truncate_at_sentence(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    let boundary = ['.', '?', '!']
        .iter()
        .filter_map(|c| head.rfind(*c))
        .max();
    match boundary {
        Some(end) if end > 0 => format!("{}...", &head[..=end]),
        _ => format!("{head}..."),
    }
}
