//! Embedding-aware facade over a [`Store`].
//!
//! [`KnowledgeStore`] pairs a storage backend with an injected
//! [`EmbeddingProvider`]: text goes in, vectors are computed here, and the
//! backend only ever sees passages plus their vectors. Structural
//! operations never touch the embedder, so they keep working when the
//! embedding model is unavailable; only `query` and `upsert` fail then.

use std::sync::Arc;

use crate::embedding::{embed_one, EmbeddingProvider};
use crate::models::{Passage, ScoredPassage};
use crate::store::{Store, StoreError};

pub struct KnowledgeStore {
    store: Arc<dyn Store>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl KnowledgeStore {
    pub fn new(store: Arc<dyn Store>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    pub async fn has_collection(&self, key: &str) -> Result<bool, StoreError> {
        self.store.has_collection(key).await
    }

    pub async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        self.store.list_collections().await
    }

    pub async fn count(&self, key: &str) -> Result<usize, StoreError> {
        self.store.count(key).await
    }

    /// Similarity query: up to `k` passages, best match first.
    ///
    /// Fails with [`StoreError::NotFound`] before attempting to embed when
    /// the collection is absent.
    pub async fn query(
        &self,
        key: &str,
        text: &str,
        k: usize,
    ) -> Result<Vec<ScoredPassage>, StoreError> {
        if !self.store.has_collection(key).await? {
            return Err(StoreError::NotFound(key.to_string()));
        }
        let query_vec = embed_one(self.embedder.as_ref(), text)
            .await
            .map_err(|e| StoreError::Embedding(format!("{:#}", e)))?;
        self.store.nearest(key, &query_vec, k).await
    }

    /// Embed and append passages, creating the collection if needed.
    ///
    /// Embedding happens before anything is written, so an embedding
    /// failure leaves the collection untouched.
    pub async fn upsert(&self, key: &str, passages: &[Passage]) -> Result<(), StoreError> {
        if passages.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let vectors = self
            .embedder
            .embed(&texts)
            .await
            .map_err(|e| StoreError::Embedding(format!("{:#}", e)))?;
        if vectors.len() != passages.len() {
            return Err(StoreError::Embedding(format!(
                "expected {} vectors, got {}",
                passages.len(),
                vectors.len()
            )));
        }
        self.store.insert(key, passages, &vectors).await
    }
}
