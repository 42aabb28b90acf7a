//! Web search backends.
//!
//! Three interchangeable [`SearchBackend`]s, tried in this priority order
//! by the aggregator:
//!
//! | Backend | Endpoint | Notes |
//! |---------|----------|-------|
//! | [`SerperBackend`] | `https://google.serper.dev/search` | Google results; needs an API key |
//! | [`DuckDuckGoLite`] | `https://lite.duckduckgo.com/lite/` | free, table layout |
//! | [`DuckDuckGoHtml`] | `https://html.duckduckgo.com/html/` | free, scraped result cards |
//!
//! Result-page parsing is split out into pure functions so it can be
//! exercised against fixture markup.

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::Html;
use serde::Deserialize;

use game_lore_core::models::SearchResult;

use crate::html::{element_text, selector};

pub const SERPER_URL: &str = "https://google.serper.dev/search";
pub const DDG_LITE_URL: &str = "https://lite.duckduckgo.com/lite/";
pub const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";

/// A search engine returning `{title, href, snippet}` hits for a free-text query.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &str;
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;
}

// ============ Serper ============

pub struct SerperBackend {
    client: reqwest::Client,
    api_key: String,
}

impl SerperBackend {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperItem>,
}

#[derive(Debug, Deserialize)]
struct SerperItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[async_trait]
impl SearchBackend for SerperBackend {
    fn name(&self) -> &str {
        "serper"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let body = serde_json::json!({
            "q": query,
            "num": max_results,
            "gl": "us",
            "hl": "en",
            "lr": "lang_en",
        });
        let response = self
            .client
            .post(SERPER_URL)
            .header("X-API-KEY", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Serper request failed")?
            .error_for_status()
            .context("Serper returned an error status")?;

        let text = response.text().await?;
        parse_serper_response(&text, max_results)
    }
}

/// Parse a Serper JSON body into results, keeping at most `max_results`.
pub fn parse_serper_response(body: &str, max_results: usize) -> Result<Vec<SearchResult>> {
    let parsed: SerperResponse =
        serde_json::from_str(body).context("Invalid Serper response")?;
    Ok(parsed
        .organic
        .into_iter()
        .filter(|item| !item.link.is_empty())
        .take(max_results)
        .map(|item| SearchResult {
            title: item.title,
            href: item.link,
            body: item.snippet,
        })
        .collect())
}

// ============ DuckDuckGo Lite ============

pub struct DuckDuckGoLite {
    client: reqwest::Client,
}

impl DuckDuckGoLite {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoLite {
    fn name(&self) -> &str {
        "duckduckgo-lite"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let params = [("q", query), ("kl", "us-en")];
        let body = self
            .client
            .post(DDG_LITE_URL)
            .form(&params)
            .send()
            .await
            .context("DuckDuckGo Lite request failed")?
            .error_for_status()?
            .text()
            .await?;
        Ok(parse_lite_results(&body, max_results))
    }
}

/// Parse the DuckDuckGo Lite results table.
///
/// Each hit is a row holding `a.result-link`, followed by a row holding
/// `td.result-snippet`.
pub fn parse_lite_results(markup: &str, max_results: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(markup);
    let (Some(row_sel), Some(link_sel), Some(snippet_sel)) = (
        selector("tr"),
        selector("a.result-link"),
        selector("td.result-snippet"),
    ) else {
        return Vec::new();
    };

    let mut results: Vec<SearchResult> = Vec::new();
    let mut pending_snippet = false;
    for row in document.select(&row_sel) {
        if let Some(link) = row.select(&link_sel).next() {
            if results.len() >= max_results {
                break;
            }
            pending_snippet = false;
            let Some(href) = link.value().attr("href").and_then(clean_result_href) else {
                continue;
            };
            results.push(SearchResult {
                title: element_text(link),
                href,
                body: String::new(),
            });
            pending_snippet = true;
        } else if let Some(snippet) = row.select(&snippet_sel).next() {
            if pending_snippet {
                if let Some(last) = results.last_mut() {
                    last.body = element_text(snippet);
                }
                pending_snippet = false;
            }
        }
    }
    results
}

// ============ DuckDuckGo HTML ============

pub struct DuckDuckGoHtml {
    client: reqwest::Client,
}

impl DuckDuckGoHtml {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoHtml {
    fn name(&self) -> &str {
        "duckduckgo-html"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let params = [("q", query), ("b", ""), ("kl", "us-en")];
        let body = self
            .client
            .post(DDG_HTML_URL)
            .form(&params)
            .send()
            .await
            .context("DuckDuckGo HTML request failed")?
            .error_for_status()?
            .text()
            .await?;
        Ok(parse_html_results(&body, max_results))
    }
}

/// Parse DuckDuckGo HTML result cards (`.result`).
pub fn parse_html_results(markup: &str, max_results: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(markup);
    let (Some(result_sel), Some(title_sel), Some(snippet_sel)) = (
        selector(".result"),
        selector(".result__title a"),
        selector(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let mut results = Vec::new();
    for card in document.select(&result_sel) {
        if results.len() >= max_results {
            break;
        }
        let Some(title_el) = card.select(&title_sel).next() else {
            continue;
        };
        let Some(href) = title_el.value().attr("href").and_then(clean_result_href) else {
            continue;
        };
        let body = card
            .select(&snippet_sel)
            .next()
            .map(element_text)
            .unwrap_or_default();
        results.push(SearchResult {
            title: element_text(title_el),
            href,
            body,
        });
    }
    results
}

/// Normalize a DuckDuckGo result link.
///
/// Unwraps `//duckduckgo.com/l/?uddg=<encoded>` redirects to the target
/// URL. Ad redirects (`duckduckgo.com/y.js`) and empty links yield `None`.
pub fn clean_result_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.contains("duckduckgo.com/y.js") {
        return None;
    }
    if href.contains("duckduckgo.com/l/?") {
        let encoded = href.split("uddg=").nth(1)?.split('&').next()?;
        let decoded = urlencoding::decode(encoded).ok()?.into_owned();
        return (!decoded.is_empty()).then_some(decoded);
    }
    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }
    Some(href.to_string())
}
