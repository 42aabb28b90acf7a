//! Storage abstraction for knowledge collections.
//!
//! The [`Store`] trait defines the raw persistence operations needed by the
//! indexing and retrieval pipeline: one named collection per game key,
//! each holding passages with their embedding vectors. Embedding itself
//! happens one layer up, in [`KnowledgeStore`](crate::knowledge::KnowledgeStore).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::models::{Passage, ScoredPassage};

/// Errors surfaced by store and knowledge-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The named collection does not exist yet.
    #[error("collection not found: {0}")]
    NotFound(String),

    /// A passage id already exists in the collection; nothing was written.
    #[error("duplicate passage id '{id}' in collection '{collection}'")]
    DuplicateId { collection: String, id: String },

    /// Embedding the query or the passages failed.
    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Abstract storage backend for knowledge collections.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`has_collection`](Store::has_collection) | Check whether a collection exists |
/// | [`list_collections`](Store::list_collections) | All collection keys, sorted |
/// | [`count`](Store::count) | Passages in a collection (0 if absent) |
/// | [`insert`](Store::insert) | Append passages with vectors, all-or-nothing |
/// | [`nearest`](Store::nearest) | Nearest passages by [`distance`](crate::embedding::distance) |
#[async_trait]
pub trait Store: Send + Sync {
    async fn has_collection(&self, key: &str) -> Result<bool, StoreError>;

    async fn list_collections(&self) -> Result<Vec<String>, StoreError>;

    async fn count(&self, key: &str) -> Result<usize, StoreError>;

    /// Append passages to a collection, creating it if absent.
    ///
    /// `vectors[i]` is the embedding of `passages[i]`. The whole batch is
    /// written or none of it is; an id collision fails the batch with
    /// [`StoreError::DuplicateId`]. An empty batch is a no-op and does not
    /// create the collection.
    async fn insert(
        &self,
        key: &str,
        passages: &[Passage],
        vectors: &[Vec<f32>],
    ) -> Result<(), StoreError>;

    /// Return up to `k` passages ordered by ascending distance to `query_vec`.
    ///
    /// Fails with [`StoreError::NotFound`] if the collection does not exist.
    async fn nearest(
        &self,
        key: &str,
        query_vec: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredPassage>, StoreError>;
}

/// Sort scored passages best-first and keep the top `k`.
pub fn rank(mut scored: Vec<ScoredPassage>, k: usize) -> Vec<ScoredPassage> {
    scored.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(k);
    scored
}
