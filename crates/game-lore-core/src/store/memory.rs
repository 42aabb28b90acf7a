//! In-memory [`Store`] implementation for testing.
//!
//! Uses a `BTreeMap` of collections behind `std::sync::RwLock`.
//! Nearest-neighbour search is brute force over the collection.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use anyhow::anyhow;
use async_trait::async_trait;

use crate::embedding::distance;
use crate::models::{Passage, ScoredPassage};

use super::{rank, Store, StoreError};

struct StoredPassage {
    passage: Passage,
    vector: Vec<f32>,
}

/// In-memory store, lost when dropped.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<BTreeMap<String, Vec<StoredPassage>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend(anyhow!("in-memory store lock poisoned"))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn has_collection(&self, key: &str) -> Result<bool, StoreError> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections.contains_key(key))
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections.keys().cloned().collect())
    }

    async fn count(&self, key: &str) -> Result<usize, StoreError> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections.get(key).map(Vec::len).unwrap_or(0))
    }

    async fn insert(
        &self,
        key: &str,
        passages: &[Passage],
        vectors: &[Vec<f32>],
    ) -> Result<(), StoreError> {
        if passages.is_empty() {
            return Ok(());
        }
        if passages.len() != vectors.len() {
            return Err(StoreError::Backend(anyhow!(
                "{} passages but {} vectors",
                passages.len(),
                vectors.len()
            )));
        }

        let mut collections = self.collections.write().map_err(|_| poisoned())?;

        // Validate the whole batch before touching the collection.
        let mut seen: HashSet<&str> = collections
            .get(key)
            .map(|stored| stored.iter().map(|s| s.passage.id.as_str()).collect())
            .unwrap_or_default();
        for p in passages {
            if !seen.insert(p.id.as_str()) {
                return Err(StoreError::DuplicateId {
                    collection: key.to_string(),
                    id: p.id.clone(),
                });
            }
        }

        let collection = collections.entry(key.to_string()).or_default();
        for (passage, vector) in passages.iter().zip(vectors) {
            collection.push(StoredPassage {
                passage: passage.clone(),
                vector: vector.clone(),
            });
        }
        Ok(())
    }

    async fn nearest(
        &self,
        key: &str,
        query_vec: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredPassage>, StoreError> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        let stored = collections
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        let scored = stored
            .iter()
            .map(|s| ScoredPassage {
                passage: s.passage.clone(),
                distance: distance(query_vec, &s.vector),
            })
            .collect();
        Ok(rank(scored, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PassageMetadata;

    fn passage(id: &str, text: &str) -> Passage {
        Passage {
            id: id.to_string(),
            text: text.to_string(),
            metadata: PassageMetadata {
                source: "test".to_string(),
                game_id: "g".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_nearest_missing_collection_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.nearest("nope", &[1.0], 5).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(k) if k == "nope"));
    }

    #[tokio::test]
    async fn test_insert_creates_and_orders_by_distance() {
        let store = InMemoryStore::new();
        store
            .insert(
                "g",
                &[passage("a", "far"), passage("b", "near")],
                &[vec![0.0, 1.0], vec![1.0, 0.1]],
            )
            .await
            .unwrap();
        assert!(store.has_collection("g").await.unwrap());

        let hits = store.nearest("g", &[1.0, 0.0], 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].passage.id, "b");
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejects_whole_batch() {
        let store = InMemoryStore::new();
        store
            .insert("g", &[passage("a", "one")], &[vec![1.0]])
            .await
            .unwrap();

        let err = store
            .insert(
                "g",
                &[passage("b", "two"), passage("a", "dup")],
                &[vec![1.0], vec![1.0]],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { .. }));
        assert_eq!(store.count("g").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_insert_does_not_create_collection() {
        let store = InMemoryStore::new();
        store.insert("g", &[], &[]).await.unwrap();
        assert!(!store.has_collection("g").await.unwrap());
        assert_eq!(store.count("g").await.unwrap(), 0);
    }
}
