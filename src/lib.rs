//! # Game Lore
//!
//! Hybrid knowledge retrieval for video game questions.
//!
//! Each game gets its own collection of embedded passages in SQLite. A
//! question is answered from that collection when a passage is close
//! enough; otherwise the web is searched, the best pages are extracted and
//! indexed, and the answer comes from the freshly indexed content. The
//! store grows with every miss.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐  hit   ┌──────────────┐
//! │  Query   │──▶│ Local probe  │───────▶│ Local answer │
//! └──────────┘   └──────┬───────┘        └──────────────┘
//!                       │ miss
//!                       ▼
//!                ┌──────────────┐   ┌──────────────┐   ┌────────────┐
//!                │ Web search   │──▶│ Fetch+Extract │──▶│ Chunk+Embed│
//!                │ Serper/DDG   │   │ (scraper)     │   │  → SQLite  │
//!                └──────────────┘   └──────────────┘   └─────┬──────┘
//!                                                            ▼
//!                                                     ┌────────────┐
//!                                                     │ Web answer │
//!                                                     └────────────┘
//! ```
//!
//! The storage-agnostic pieces (splitter, routing, indexing) live in the
//! `game-lore-core` crate; this crate supplies SQLite, the embedding
//! providers and the live web path.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with environment overrides |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite vector store |
//! | [`embedding`] | Embedding providers (local, Ollama, OpenAI) |
//! | [`lang`] | English detection and domain lists |
//! | [`backends`] | Search backends (Serper, DuckDuckGo) |
//! | [`fetch`] | HTTP page fetching |
//! | [`html`] | Shared selector and element-text helpers |
//! | [`extract`] | Site-aware main-content extraction |
//! | [`web_search`] | Web acquisition pipeline |
//! | [`engine`] | Wires everything into a router |

pub mod ask;
pub mod backends;
pub mod collections;
pub mod config;
pub mod db;
pub mod embedding;
pub mod engine;
pub mod extract;
pub mod fetch;
pub mod html;
pub mod index_cmd;
pub mod lang;
pub mod migrate;
pub mod sqlite_store;
pub mod web_search;
