//! Chunking and indexing pipeline.
//!
//! Splits source documents with the [`RecursiveSplitter`], turns every
//! chunk into a [`Passage`] tagged with `{source, game_id}`, and appends
//! the batch to a collection through the [`KnowledgeStore`].
//!
//! Passage ids are `"{game_id}_{seq}_{chunk_index}"`. `seq` is a running
//! counter over the batch that starts at the collection's current size, so
//! ids stay unique across repeated indexing of the same game.

use tracing::{debug, warn};

use crate::chunk::RecursiveSplitter;
use crate::knowledge::KnowledgeStore;
use crate::models::{normalize_game_id, Passage, PassageMetadata, SourceDocument};
use crate::store::StoreError;

/// Attempts made when a concurrent writer grabbed the same id range.
const MAX_ID_ATTEMPTS: usize = 3;

/// Index documents into the collection for `game`. Returns passages written.
///
/// Writes nothing and returns 0 when `documents` is empty or every
/// document is blank.
pub async fn index_documents(
    knowledge: &KnowledgeStore,
    splitter: &RecursiveSplitter,
    game: &str,
    documents: &[SourceDocument],
) -> Result<usize, StoreError> {
    if documents.is_empty() {
        return Ok(0);
    }
    let game_id = normalize_game_id(game);

    let mut attempt = 0;
    loop {
        attempt += 1;
        let offset = knowledge.count(&game_id).await?;
        let passages = build_passages(splitter, &game_id, documents, offset);
        if passages.is_empty() {
            return Ok(0);
        }

        match knowledge.upsert(&game_id, &passages).await {
            Ok(()) => {
                debug!(
                    collection = %game_id,
                    documents = documents.len(),
                    passages = passages.len(),
                    "indexed documents"
                );
                return Ok(passages.len());
            }
            Err(StoreError::DuplicateId { id, .. }) if attempt < MAX_ID_ATTEMPTS => {
                warn!(collection = %game_id, %id, "passage id collision, retrying with fresh offset");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Chunk every document and assign sequential ids starting at `offset`.
pub fn build_passages(
    splitter: &RecursiveSplitter,
    game_id: &str,
    documents: &[SourceDocument],
    offset: usize,
) -> Vec<Passage> {
    let mut passages = Vec::new();
    for doc in documents {
        for (chunk_index, text) in splitter.split(&doc.content).into_iter().enumerate() {
            let seq = offset + passages.len();
            passages.push(Passage {
                id: format!("{}_{}_{}", game_id, seq, chunk_index),
                text,
                metadata: PassageMetadata {
                    source: doc.source.clone(),
                    game_id: game_id.to_string(),
                },
            });
        }
    }
    passages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingProvider;
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Arc;

    struct LengthEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LengthEmbedder {
        fn model_name(&self) -> &str {
            "length"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![1.0, t.len() as f32]).collect())
        }
    }

    fn doc(content: &str, source: &str) -> SourceDocument {
        SourceDocument {
            content: content.to_string(),
            source: source.to_string(),
        }
    }

    fn knowledge() -> KnowledgeStore {
        KnowledgeStore::new(Arc::new(InMemoryStore::new()), Arc::new(LengthEmbedder))
    }

    #[test]
    fn test_ids_unique_across_documents_in_batch() {
        let long = "lorem ipsum ".repeat(100);
        let docs = vec![doc(&long, "http://a"), doc(&long, "http://b")];
        let passages = build_passages(&RecursiveSplitter::default(), "g", &docs, 0);
        let ids: HashSet<_> = passages.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids.len(), passages.len());
        assert!(passages.iter().any(|p| p.metadata.source == "http://b"));
        assert!(passages.iter().all(|p| p.metadata.game_id == "g"));
    }

    #[tokio::test]
    async fn test_no_documents_writes_nothing() {
        let ks = knowledge();
        let n = index_documents(&ks, &RecursiveSplitter::default(), "Game", &[])
            .await
            .unwrap();
        assert_eq!(n, 0);
        assert!(!ks.has_collection("game").await.unwrap());
    }

    #[tokio::test]
    async fn test_indexing_is_additive() {
        let ks = knowledge();
        let splitter = RecursiveSplitter::default();
        let first = index_documents(&ks, &splitter, "Hollow Knight", &[doc("First batch text.", "http://a")])
            .await
            .unwrap();
        let second = index_documents(&ks, &splitter, "hollow-knight", &[doc("Second batch text.", "http://b")])
            .await
            .unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 1);
        assert_eq!(ks.count("hollow_knight").await.unwrap(), 2);

        let hits = ks.query("hollow_knight", "anything", 10).await.unwrap();
        let sources: HashSet<_> = hits.iter().map(|h| h.passage.metadata.source.as_str()).collect();
        assert!(sources.contains("http://a"));
        assert!(sources.contains("http://b"));
    }
}
