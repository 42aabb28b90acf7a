//! Engine assembly.
//!
//! Wires the concrete pieces selected by [`Config`] into a [`Router`]:
//! the SQLite store, the configured embedding provider (degrading to the
//! disabled provider if it cannot start), and the live web aggregator.
//! Tests and embedders can build an [`Engine`] from their own parts with
//! [`Engine::from_parts`].

use std::sync::Arc;

use anyhow::Result;

use game_lore_core::chunk::RecursiveSplitter;
use game_lore_core::index::index_documents;
use game_lore_core::knowledge::KnowledgeStore;
use game_lore_core::models::{AcquiredDocument, QueryOutcome, SourceDocument};
use game_lore_core::router::{Router, RouterParams, WebSearch};

use crate::config::Config;
use crate::embedding::create_provider_or_disabled;
use crate::sqlite_store::SqliteStore;
use crate::web_search::WebAggregator;

pub struct Engine {
    router: Router,
    web: Arc<dyn WebSearch>,
}

impl Engine {
    /// Build the production engine: SQLite store, configured embeddings, live web search.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = SqliteStore::open(config).await?;
        let embedder = create_provider_or_disabled(&config.embedding).await;
        let knowledge = Arc::new(KnowledgeStore::new(Arc::new(store), embedder));
        let web = Arc::new(WebAggregator::from_config(&config.web)?);
        Ok(Self::from_parts(knowledge, web, config))
    }

    pub fn from_parts(
        knowledge: Arc<KnowledgeStore>,
        web: Arc<dyn WebSearch>,
        config: &Config,
    ) -> Self {
        let splitter =
            RecursiveSplitter::new(config.chunking.chunk_size, config.chunking.chunk_overlap);
        let params = RouterParams {
            top_k: config.retrieval.top_k,
            max_distance: config.retrieval.max_distance,
        };
        let router = Router::new(knowledge, web.clone(), splitter, params);
        Self { router, web }
    }

    /// Answer a question, from local knowledge or the web. Never fails.
    pub async fn resolve(&self, game_name: &str, query: &str) -> QueryOutcome {
        self.router.resolve(game_name, query).await
    }

    /// Run only the web acquisition step, without indexing.
    pub async fn web_search(&self, game_name: &str, query: &str) -> Vec<AcquiredDocument> {
        self.web.search(game_name, query).await
    }

    /// Index local documents into a game's collection. Returns passages written.
    pub async fn index(&self, game_name: &str, documents: &[SourceDocument]) -> Result<usize> {
        let written = index_documents(
            self.router.knowledge(),
            self.router.splitter(),
            game_name,
            documents,
        )
        .await?;
        Ok(written)
    }

    /// Known collection keys with their passage counts.
    pub async fn collections(&self) -> Result<Vec<(String, usize)>> {
        let knowledge = self.router.knowledge();
        let mut out = Vec::new();
        for key in knowledge.list_collections().await? {
            let count = knowledge.count(&key).await?;
            out.push((key, count));
        }
        Ok(out)
    }
}
