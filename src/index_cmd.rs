//! The `lore index` command: seed a game's collection from local files.
//!
//! Each file becomes one source document. Its source label defaults to the
//! file path unless `--source` is given, in which case every file shares it.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use game_lore_core::models::{normalize_game_id, SourceDocument};

use crate::config::Config;
use crate::engine::Engine;

pub async fn run_index(
    config: &Config,
    game: &str,
    files: &[PathBuf],
    source: Option<&str>,
) -> Result<()> {
    let documents = read_documents(files, source)?;
    if documents.is_empty() {
        bail!("No readable content in the given files");
    }

    let engine = Engine::from_config(config).await?;
    let written = engine.index(game, &documents).await?;

    println!(
        "Indexed {} passage{} from {} file{} into '{}'.",
        written,
        if written == 1 { "" } else { "s" },
        documents.len(),
        if documents.len() == 1 { "" } else { "s" },
        normalize_game_id(game)
    );
    Ok(())
}

/// Read files into source documents, skipping ones that are blank.
pub fn read_documents(files: &[PathBuf], source: Option<&str>) -> Result<Vec<SourceDocument>> {
    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if content.trim().is_empty() {
            tracing::warn!(path = %path.display(), "skipping empty file");
            continue;
        }
        documents.push(SourceDocument {
            content,
            source: source
                .map(str::to_string)
                .unwrap_or_else(|| source_label(path)),
        });
    }
    Ok(documents)
}

fn source_label(path: &Path) -> String {
    path.display().to_string()
}
