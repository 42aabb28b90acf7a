//! # Game Lore CLI (`lore`)
//!
//! Answers game questions from a local vector store, falling back to live
//! web search and caching what it finds for next time.
//!
//! ## Usage
//!
//! ```bash
//! lore --config ./config/lore.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lore init` | Create the SQLite database and schema |
//! | `lore ask <game> "<query>"` | Answer a question (local first, then web) |
//! | `lore collections` | List cached games and passage counts |
//! | `lore index <game> <file>...` | Seed a game's collection from local files |
//!
//! ## Examples
//!
//! ```bash
//! lore init
//! lore ask "Hollow Knight" "how to get the void heart"
//! lore ask "Elden Ring" "malenia weakness" --json
//! lore ask "Hades" "best boons for zeus" --web-only
//! lore index "Hollow Knight" notes/charms.md --source notes
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use game_lore::{ask, collections, config, index_cmd, migrate};

const DEFAULT_LOG_FILTER: &str = "game_lore=info,game_lore_core=info";

/// Game Lore: hybrid local/web knowledge retrieval for game questions.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/lore.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "lore",
    about = "Game Lore: hybrid local/web knowledge retrieval for game questions",
    version,
    long_about = "Game Lore answers natural-language questions about video games. It searches \
    a per-game vector store first and, when nothing close enough is cached, searches the web, \
    extracts the pages, indexes them and answers from the fresh content."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/lore.toml`; built-in defaults apply if that
    /// file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and its tables. Safe to run
    /// more than once.
    Init,

    /// Answer a question about a game.
    ///
    /// Looks in the game's local collection first. If nothing is close
    /// enough, searches the web, caches the pages and answers from them.
    Ask {
        /// Game name, e.g. "Hollow Knight". Normalized to a collection key.
        game: String,

        /// The question.
        query: String,

        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,

        /// Skip the local store and only show what web search finds.
        /// Nothing is indexed.
        #[arg(long)]
        web_only: bool,
    },

    /// List cached game collections with passage counts.
    Collections,

    /// Index local text files into a game's collection.
    Index {
        /// Game name the files belong to.
        game: String,

        /// Text or Markdown files to index.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Source label stored with every passage. Defaults to each file's path.
        #[arg(long)]
        source: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ask {
            game,
            query,
            json,
            web_only,
        } => {
            ask::run_ask(&cfg, &game, &query, json, web_only).await?;
        }
        Commands::Collections => {
            collections::run_collections(&cfg).await?;
        }
        Commands::Index {
            game,
            files,
            source,
        } => {
            index_cmd::run_index(&cfg, &game, &files, source.as_deref()).await?;
        }
    }

    Ok(())
}
