//! The `lore ask` command.
//!
//! Resolves a question for one game and prints the answer with its
//! provenance. With `--web-only` the local store is bypassed entirely and
//! the acquired pages are printed without being indexed.

use anyhow::Result;
use serde::Serialize;

use game_lore_core::models::QueryOutcome;

use crate::config::Config;
use crate::engine::Engine;
use crate::web_search::format_documents;

#[derive(Serialize)]
struct AskOutput<'a> {
    game: &'a str,
    query: &'a str,
    #[serde(flatten)]
    outcome: &'a QueryOutcome,
}

pub async fn run_ask(
    config: &Config,
    game: &str,
    query: &str,
    json: bool,
    web_only: bool,
) -> Result<()> {
    let engine = Engine::from_config(config).await?;

    if web_only {
        let documents = engine.web_search(game, query).await;
        let text = format_documents(&documents, game, query);
        if json {
            println!("{}", serde_json::to_string_pretty(&documents)?);
        } else {
            println!("{}", text);
        }
        return Ok(());
    }

    let outcome = engine.resolve(game, query).await;
    if json {
        let out = AskOutput {
            game,
            query,
            outcome: &outcome,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("[{}]", outcome.provenance);
        println!();
        println!("{}", outcome.text);
    }
    Ok(())
}
