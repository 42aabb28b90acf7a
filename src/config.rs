//! Configuration loading.
//!
//! Settings come from an optional TOML file (every section and key has a
//! default), are validated, and are then overlaid with a handful of
//! environment variables. A missing file is not an error: the engine runs
//! on defaults, and a missing search credential simply disables that
//! backend.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use game_lore_core::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use game_lore_core::router::{DEFAULT_MAX_DISTANCE, DEFAULT_TOP_K};

pub const DEFAULT_CONFIG_PATH: &str = "./config/lore.toml";

pub const ENV_DB_PATH: &str = "GAME_LORE_DB_PATH";
pub const ENV_EMBEDDING_PROVIDER: &str = "GAME_LORE_EMBEDDING_PROVIDER";
pub const ENV_FETCH_TIMEOUT: &str = "GAME_LORE_FETCH_TIMEOUT_SECS";
pub const ENV_SERPER_KEY: &str = "SERPER_API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/lore.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_distance: DEFAULT_MAX_DISTANCE,
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_max_distance() -> f32 {
    DEFAULT_MAX_DISTANCE
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the `ollama` provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    /// Per-request timeout for search backends and page fetches.
    #[serde(default = "default_web_timeout")]
    pub timeout_secs: u64,
    /// Results requested from each search backend.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Pages fetched and returned per search.
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,
    /// Cap on extracted page text.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    #[serde(default)]
    pub serper_api_key: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_web_timeout(),
            max_results: default_max_results(),
            max_documents: default_max_documents(),
            max_content_chars: default_max_content_chars(),
            serper_api_key: None,
        }
    }
}

fn default_web_timeout() -> u64 {
    10
}
fn default_max_results() -> usize {
    10
}
fn default_max_documents() -> usize {
    3
}
fn default_max_content_chars() -> usize {
    crate::extract::DEFAULT_MAX_CHARS
}

/// Load configuration from `path`, or from [`DEFAULT_CONFIG_PATH`] when `None`.
///
/// A missing file yields defaults. An explicitly given path must exist.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                parse_file(default_path)?
            } else {
                Config::default()
            }
        }
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

fn parse_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

/// Overlay environment values onto `config`. Unparseable values are skipped.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup(ENV_DB_PATH).filter(|v| !v.trim().is_empty()) {
        config.db.path = PathBuf::from(path);
    }
    if let Some(provider) = lookup(ENV_EMBEDDING_PROVIDER).filter(|v| !v.trim().is_empty()) {
        config.embedding.provider = provider.trim().to_lowercase();
    }
    if let Some(raw) = lookup(ENV_FETCH_TIMEOUT) {
        match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => config.web.timeout_secs = secs,
            _ => warn!(variable = ENV_FETCH_TIMEOUT, value = %raw, "ignoring invalid timeout"),
        }
    }
    if let Some(key) = lookup(ENV_SERPER_KEY).filter(|v| !v.trim().is_empty()) {
        config.web.serper_api_key = Some(key.trim().to_string());
    }
}

pub fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.chunk_overlap must be < chunking.chunk_size");
    }

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    let max_distance = config.retrieval.max_distance;
    if max_distance.is_nan() || max_distance < 0.0 {
        anyhow::bail!("retrieval.max_distance must be >= 0");
    }

    if config.web.timeout_secs == 0 {
        anyhow::bail!("web.timeout_secs must be > 0");
    }
    if config.web.max_results == 0 {
        anyhow::bail!("web.max_results must be > 0");
    }
    if config.web.max_documents == 0 {
        anyhow::bail!("web.max_documents must be > 0");
    }

    if config.embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0");
    }
    if config.embedding.timeout_secs == 0 {
        anyhow::bail!("embedding.timeout_secs must be > 0");
    }
    match config.embedding.provider.as_str() {
        "disabled" | "local" | "ollama" => {}
        "openai" => {
            if config.embedding.model.is_none() {
                anyhow::bail!("embedding.model must be specified when provider is 'openai'");
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be local, ollama, openai, or disabled.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.db.path, PathBuf::from("./data/lore.sqlite"));
        assert_eq!(config.retrieval.top_k, 5);
        assert!((config.retrieval.max_distance - 0.45).abs() < f32::EPSILON);
        assert_eq!(config.chunking.chunk_size, 400);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.embedding.provider, "local");
        assert_eq!(config.web.timeout_secs, 10);
        assert_eq!(config.web.max_documents, 3);
        assert_eq!(config.web.max_content_chars, 3000);
        assert!(config.web.serper_api_key.is_none());
        validate(&config).unwrap();
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = parse_config(
            r#"
            [retrieval]
            max_distance = 0.3

            [embedding]
            provider = "disabled"
            "#,
        )
        .unwrap();
        assert!((config.retrieval.max_distance - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.embedding.provider, "disabled");
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let config = parse_config("[chunking]\nchunk_size = 50\nchunk_overlap = 50\n").unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn test_zero_web_caps_rejected() {
        let config = parse_config("[web]\nmax_results = 0\n").unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("web.max_results"));

        let config = parse_config("[web]\nmax_documents = 0\n").unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("web.max_documents"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = parse_config("[embedding]\nprovider = \"magic\"\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_openai_requires_model() {
        let config = parse_config("[embedding]\nprovider = \"openai\"\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            env(&[
                (ENV_DB_PATH, "/tmp/x.sqlite"),
                (ENV_EMBEDDING_PROVIDER, "Disabled"),
                (ENV_FETCH_TIMEOUT, "4"),
                (ENV_SERPER_KEY, "secret"),
            ]),
        );
        assert_eq!(config.db.path, PathBuf::from("/tmp/x.sqlite"));
        assert_eq!(config.embedding.provider, "disabled");
        assert_eq!(config.web.timeout_secs, 4);
        assert_eq!(config.web.serper_api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_malformed_env_value_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, env(&[(ENV_FETCH_TIMEOUT, "soon"), (ENV_SERPER_KEY, "  ")]));
        assert_eq!(config.web.timeout_secs, 10);
        assert!(config.web.serper_api_key.is_none());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
