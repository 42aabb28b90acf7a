//! Retrieval routing: local cache first, web acquisition on miss.
//!
//! [`Router::resolve`] is the single entry point consumed by the answering
//! layer. It probes the game's collection, accepts the hit when the best
//! distance is within [`RouterParams::max_distance`], and otherwise asks an
//! injected [`WebSearch`] for fresh documents, indexes them, and re-queries.
//!
//! `resolve` never fails. Every outcome, including internal errors, comes
//! back as a [`QueryOutcome`] whose [`Provenance`](crate::models::Provenance)
//! tells the caller which path produced the text.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::chunk::RecursiveSplitter;
use crate::index::index_documents;
use crate::knowledge::KnowledgeStore;
use crate::models::{
    normalize_game_id, AcquiredDocument, QueryOutcome, ScoredPassage, SourceDocument,
};
use crate::store::StoreError;

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MAX_DISTANCE: f32 = 0.45;

/// Source of freshly acquired documents for a game question.
///
/// Implementations swallow their own transient failures and return an
/// empty list instead.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, game_name: &str, query: &str) -> Vec<AcquiredDocument>;
}

/// Retrieval knobs.
#[derive(Debug, Clone, Copy)]
pub struct RouterParams {
    /// Passages requested from every similarity query.
    pub top_k: usize,
    /// Largest best-match distance still accepted as a local hit.
    pub max_distance: f32,
}

impl Default for RouterParams {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_distance: DEFAULT_MAX_DISTANCE,
        }
    }
}

pub struct Router {
    knowledge: Arc<KnowledgeStore>,
    web: Arc<dyn WebSearch>,
    splitter: RecursiveSplitter,
    params: RouterParams,
}

impl Router {
    pub fn new(
        knowledge: Arc<KnowledgeStore>,
        web: Arc<dyn WebSearch>,
        splitter: RecursiveSplitter,
        params: RouterParams,
    ) -> Self {
        Self {
            knowledge,
            web,
            splitter,
            params,
        }
    }

    pub fn knowledge(&self) -> &KnowledgeStore {
        &self.knowledge
    }

    pub fn splitter(&self) -> &RecursiveSplitter {
        &self.splitter
    }

    /// Answer `query` about `game_name` from local knowledge or the web.
    pub async fn resolve(&self, game_name: &str, query: &str) -> QueryOutcome {
        let key = normalize_game_id(game_name);

        if let Some(hits) = self.probe(&key, query).await {
            info!(collection = %key, passages = hits.len(), "serving from local knowledge");
            return QueryOutcome::local(format_local(&hits));
        }

        match self.acquire(game_name, &key, query).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(collection = %key, error = %e, "retrieval failed");
                QueryOutcome::unknown(format!("Error searching local docs: {}.", e))
            }
        }
    }

    /// Query the local collection. `Some` only when the best hit is close enough.
    ///
    /// A missing collection, an empty result, or a failing query all count
    /// as a miss.
    async fn probe(&self, key: &str, query: &str) -> Option<Vec<ScoredPassage>> {
        match self.knowledge.has_collection(key).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(collection = %key, "no local collection");
                return None;
            }
            Err(e) => {
                warn!(collection = %key, error = %e, "collection lookup failed, treating as miss");
                return None;
            }
        }

        let hits = match self.knowledge.query(key, query, self.params.top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(collection = %key, error = %e, "local query failed, treating as miss");
                return None;
            }
        };

        let best = best_distance(&hits);
        debug!(
            collection = %key,
            best_distance = best,
            distances = ?hits.iter().map(|h| h.distance).collect::<Vec<_>>(),
            "local probe"
        );

        if best <= self.params.max_distance {
            Some(hits)
        } else {
            info!(
                collection = %key,
                best_distance = best,
                threshold = self.params.max_distance,
                "local results not relevant enough, checking web"
            );
            None
        }
    }

    async fn acquire(
        &self,
        game_name: &str,
        key: &str,
        query: &str,
    ) -> Result<QueryOutcome, StoreError> {
        let documents = self.web.search(game_name, query).await;
        if documents.is_empty() {
            let known = self.knowledge.list_collections().await.unwrap_or_else(|e| {
                warn!(error = %e, "could not list collections");
                Vec::new()
            });
            return Ok(QueryOutcome::unknown(format!(
                "No local documentation indexed for '{}' and web search returned no results. Available games: {}.",
                key,
                known.join(", ")
            )));
        }

        let sources: Vec<SourceDocument> = documents.iter().map(SourceDocument::from).collect();
        let written = index_documents(&self.knowledge, &self.splitter, key, &sources).await?;
        info!(
            collection = %key,
            documents = documents.len(),
            passages = written,
            "indexed web documents"
        );

        let hits = match self.knowledge.query(key, query, self.params.top_k).await {
            Ok(hits) => hits,
            // Every acquired document was blank, so no collection was created.
            Err(StoreError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        if hits.is_empty() {
            error!(collection = %key, "re-query after indexing returned nothing");
            return Ok(QueryOutcome::unknown(
                "Indexed new content but search yielded no results. This is unexpected.",
            ));
        }

        Ok(QueryOutcome::web(format_web(&hits)))
    }
}

/// Smallest distance among `hits`, or infinity when there are none.
pub fn best_distance(hits: &[ScoredPassage]) -> f32 {
    hits.iter()
        .map(|h| h.distance)
        .fold(f32::INFINITY, f32::min)
}

pub fn format_local(hits: &[ScoredPassage]) -> String {
    format_passages(hits, "Local Source", "Local Cache")
}

pub fn format_web(hits: &[ScoredPassage]) -> String {
    format_passages(hits, "Web Index", "Web Index")
}

fn format_passages(hits: &[ScoredPassage], label: &str, default_source: &str) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let source = match hit.passage.metadata.source.as_str() {
                "" => default_source,
                s => s,
            };
            format!("**[{} {}: {}]**\n{}\n", label, i + 1, source, hit.passage.text)
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}
