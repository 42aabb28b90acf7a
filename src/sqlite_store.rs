//! SQLite-backed [`Store`] implementation.
//!
//! Collections live in the `collections` table; passages and their
//! embedding BLOBs in `passages`, keyed by `(collection, id)`. Each insert
//! runs in one transaction, so a batch lands whole or not at all, and
//! SQLite's single-writer lock serializes concurrent writers.
//!
//! Nearest-neighbour search is a brute-force scan of the collection.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use game_lore_core::embedding::{blob_to_vec, distance, vec_to_blob};
use game_lore_core::models::{Passage, PassageMetadata, ScoredPassage};
use game_lore_core::store::{rank, Store, StoreError};

use crate::config::Config;
use crate::{db, migrate};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database and ensure the schema exists.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.into())
}

#[async_trait]
impl Store for SqliteStore {
    async fn has_collection(&self, key: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM collections WHERE key = ?")
                .bind(key)
                .fetch_one(&self.pool)
                .await
                .map_err(backend)?;
        Ok(exists)
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar("SELECT key FROM collections ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)
    }

    async fn count(&self, key: &str) -> Result<usize, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passages WHERE collection = ?")
            .bind(key)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        Ok(n as usize)
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
            return Err(StoreError::Backend(anyhow::anyhow!(
                "{} passages but {} vectors",
                passages.len(),
                vectors.len()
            )));
        }

        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query("INSERT OR IGNORE INTO collections (key, created_at) VALUES (?, ?)")
            .bind(key)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        let next_seq: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(seq) + 1, 0) FROM passages WHERE collection = ?")
                .bind(key)
                .fetch_one(&mut *tx)
                .await
                .map_err(backend)?;

        for (i, (passage, vector)) in passages.iter().zip(vectors).enumerate() {
            let result = sqlx::query(
                r#"
                INSERT INTO passages (collection, id, seq, text, source, game_id, dims, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(key)
            .bind(&passage.id)
            .bind(next_seq + i as i64)
            .bind(&passage.text)
            .bind(&passage.metadata.source)
            .bind(&passage.metadata.game_id)
            .bind(vector.len() as i64)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => {}
                // Dropping `tx` rolls back the partial batch.
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    return Err(StoreError::DuplicateId {
                        collection: key.to_string(),
                        id: passage.id.clone(),
                    });
                }
                Err(e) => return Err(backend(e)),
            }
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn nearest(
        &self,
        key: &str,
        query_vec: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredPassage>, StoreError> {
        if !self.has_collection(key).await? {
            return Err(StoreError::NotFound(key.to_string()));
        }

        let rows = sqlx::query(
            r#"
            SELECT id, text, source, game_id, embedding
            FROM passages
            WHERE collection = ?
            ORDER BY seq
            "#,
        )
        .bind(key)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let scored = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                ScoredPassage {
                    passage: Passage {
                        id: row.get("id"),
                        text: row.get("text"),
                        metadata: PassageMetadata {
                            source: row.get("source"),
                            game_id: row.get("game_id"),
                        },
                    },
                    distance: distance(query_vec, &blob_to_vec(&blob)),
                }
            })
            .collect();

        Ok(rank(scored, k))
    }
}
