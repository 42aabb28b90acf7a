//! # Game Lore Core
//!
//! Runtime-agnostic logic for Game Lore: data models, passage splitting,
//! the store abstraction, the embedding trait, the indexing pipeline, and
//! the retrieval router that decides between cached and fresh knowledge.
//!
//! This crate contains no sqlx, HTTP client, or filesystem I/O. Concrete
//! stores, embedding providers, and web search live in the `game-lore`
//! application crate and are injected at construction.

pub mod chunk;
pub mod embedding;
pub mod index;
pub mod knowledge;
pub mod models;
pub mod router;
pub mod store;
