//! Core data models used throughout Game Lore.
//!
//! These types represent the passages, search results, and query outcomes
//! that flow through the acquisition, indexing, and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// Separator used when normalizing a game name into a collection key.
pub const KEY_SEPARATOR: char = '_';

/// Normalize a free-text game name into a collection key.
///
/// Lower-cases the name and replaces spaces and hyphens with `_`.
/// Normalizing an already-normalized key returns it unchanged.
///
/// ```rust
/// use game_lore_core::models::normalize_game_id;
///
/// assert_eq!(normalize_game_id("Hollow Knight"), "hollow_knight");
/// assert_eq!(normalize_game_id("hollow-knight"), "hollow_knight");
/// assert_eq!(normalize_game_id("hollow_knight"), "hollow_knight");
/// ```
pub fn normalize_game_id(game_name: &str) -> String {
    game_name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '-' => KEY_SEPARATOR,
            other => other,
        })
        .collect()
}

/// Provenance metadata attached to every stored passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageMetadata {
    /// Where the text came from (usually the page URL).
    pub source: String,
    /// Normalized game key the passage belongs to.
    pub game_id: String,
}

/// A bounded slice of a source document stored in a knowledge collection.
///
/// Passages are immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub text: String,
    pub metadata: PassageMetadata,
}

/// A passage returned from a similarity query, with its distance to the query.
///
/// Lower distance means more relevant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub distance: f32,
}

/// A raw hit returned by a search backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub href: String,
    /// Snippet text shown by the search engine.
    pub body: String,
}

/// A web page after fetch and content extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquiredDocument {
    pub title: String,
    pub href: String,
    pub content: String,
}

/// Input to the indexing pipeline: document text plus its source label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub content: String,
    pub source: String,
}

impl From<&AcquiredDocument> for SourceDocument {
    fn from(doc: &AcquiredDocument) -> Self {
        Self {
            content: doc.content.clone(),
            source: doc.href.clone(),
        }
    }
}

/// Where the text of a [`QueryOutcome`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Served from an existing collection without touching the web.
    Local,
    /// Freshly acquired from the web, indexed, and re-queried.
    Web,
    /// Nothing usable was found, or retrieval failed.
    Unknown,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Local => "local",
            Provenance::Web => "web",
            Provenance::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of resolving a question against the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryOutcome {
    pub provenance: Provenance,
    /// Formatted passages, or a human-readable explanation.
    pub text: String,
}

impl QueryOutcome {
    pub fn local(text: impl Into<String>) -> Self {
        Self {
            provenance: Provenance::Local,
            text: text.into(),
        }
    }

    pub fn web(text: impl Into<String>) -> Self {
        Self {
            provenance: Provenance::Web,
            text: text.into(),
        }
    }

    pub fn unknown(text: impl Into<String>) -> Self {
        Self {
            provenance: Provenance::Unknown,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_equivalent_spellings() {
        let a = normalize_game_id("Hollow Knight");
        let b = normalize_game_id("hollow-knight");
        let c = normalize_game_id("hollow_knight");
        assert_eq!(a, "hollow_knight");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_normalize_idempotent() {
        for name in ["Elden Ring", "Dark Souls 3", "  New-Game  ", "baldur's gate 3"] {
            let once = normalize_game_id(name);
            assert_eq!(normalize_game_id(&once), once);
        }
    }

    #[test]
    fn test_normalize_trims_outer_whitespace() {
        assert_eq!(normalize_game_id("  New Game "), "new_game");
    }

    #[test]
    fn test_provenance_serializes_lowercase() {
        let outcome = QueryOutcome::web("text");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["provenance"], "web");
        assert_eq!(Provenance::Unknown.to_string(), "unknown");
    }
}
