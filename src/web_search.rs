//! Multi-backend web search and page acquisition.
//!
//! [`WebAggregator`] turns a `(game, question)` pair into at most
//! `max_documents` English [`AcquiredDocument`]s:
//!
//! 1. [`build_queries`] produces a prioritized query list, led by a
//!    site-restricted query for a few well-known titles.
//! 2. Each query runs through the backend chain; the first backend whose
//!    filtered results are non-empty answers it.
//! 3. Results split into trusted wiki hits and others. All trusted hits and
//!    up to [`OTHER_RESULTS_PER_QUERY`] others are kept, and the loop stops
//!    at the first query that produced a trusted hit.
//! 4. With nothing accumulated, one broad query is tried.
//! 5. Hits are deduplicated by URL, the top ones fetched and extracted.
//!
//! Every backend or fetch failure is logged and skipped.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use game_lore_core::models::{AcquiredDocument, SearchResult};
use game_lore_core::router::WebSearch;

use crate::backends::{DuckDuckGoHtml, DuckDuckGoLite, SearchBackend, SerperBackend};
use crate::config::WebConfig;
use crate::extract::{extract, MIN_CONTAINER_CHARS};
use crate::fetch::{build_client, HttpFetcher, PageFetcher};
use crate::lang::{filter_english, is_english, is_trusted_site};

/// Non-trusted results kept from each query.
pub const OTHER_RESULTS_PER_QUERY: usize = 2;
/// Results kept from the last-resort broad query.
pub const BROAD_QUERY_RESULTS: usize = 5;
/// Final documents must be longer than this.
pub const MIN_DOCUMENT_CHARS: usize = 50;

/// Titles with a dedicated wiki: `(needle in compacted game name, site)`.
const KNOWN_TITLES: &[(&str, &str)] = &[
    ("hollow", "hollowknight.fandom.com"),
    ("elden", "eldenring.wiki.fextralife.com"),
    ("darksouls", "darksouls.fandom.com"),
];

#[derive(Debug, Clone, Copy)]
pub struct AggregatorSettings {
    pub max_results: usize,
    pub max_documents: usize,
    pub max_content_chars: usize,
}

impl From<&WebConfig> for AggregatorSettings {
    fn from(web: &WebConfig) -> Self {
        Self {
            max_results: web.max_results,
            max_documents: web.max_documents,
            max_content_chars: web.max_content_chars,
        }
    }
}

pub struct WebAggregator {
    backends: Vec<Arc<dyn SearchBackend>>,
    fetcher: Arc<dyn PageFetcher>,
    settings: AggregatorSettings,
}

impl WebAggregator {
    pub fn new(
        backends: Vec<Arc<dyn SearchBackend>>,
        fetcher: Arc<dyn PageFetcher>,
        settings: AggregatorSettings,
    ) -> Self {
        Self {
            backends,
            fetcher,
            settings,
        }
    }

    /// Build the live backend chain and fetcher from configuration.
    ///
    /// Serper joins the chain only when an API key is configured.
    pub fn from_config(web: &WebConfig) -> Result<Self> {
        let client = build_client(Duration::from_secs(web.timeout_secs))?;

        let mut backends: Vec<Arc<dyn SearchBackend>> = Vec::new();
        match &web.serper_api_key {
            Some(key) => backends.push(Arc::new(SerperBackend::new(client.clone(), key.clone()))),
            None => debug!("no Serper API key, using DuckDuckGo only"),
        }
        backends.push(Arc::new(DuckDuckGoLite::new(client.clone())));
        backends.push(Arc::new(DuckDuckGoHtml::new(client.clone())));

        Ok(Self::new(
            backends,
            Arc::new(HttpFetcher::new(client)),
            AggregatorSettings::from(web),
        ))
    }

    /// Ranked, deduplicated search hits for a question (steps 1 to 5).
    pub async fn collect_results(&self, game_name: &str, query: &str) -> Vec<SearchResult> {
        let mut accumulated = Vec::new();

        for search_query in build_queries(game_name, query) {
            let results = self.run_chain(&search_query).await;
            let (trusted, other): (Vec<_>, Vec<_>) =
                results.into_iter().partition(|r| is_trusted_site(&r.href));

            let found_trusted = !trusted.is_empty();
            accumulated.extend(trusted);
            accumulated.extend(other.into_iter().take(OTHER_RESULTS_PER_QUERY));
            if found_trusted {
                debug!(query = %search_query, "trusted source found, stopping query loop");
                break;
            }
        }

        if accumulated.is_empty() {
            let broad = format!("{} {} english wiki guide", game_name, query);
            info!(query = %broad, "no results from targeted queries, trying broad query");
            accumulated.extend(
                self.run_chain(&broad)
                    .await
                    .into_iter()
                    .take(BROAD_QUERY_RESULTS),
            );
        }

        dedupe_by_url(accumulated)
    }

    /// Try each backend in order; the first non-empty filtered answer wins.
    async fn run_chain(&self, query: &str) -> Vec<SearchResult> {
        for backend in &self.backends {
            match backend.search(query, self.settings.max_results).await {
                Ok(raw) => {
                    let raw_count = raw.len();
                    let filtered = filter_english(raw);
                    debug!(
                        backend = backend.name(),
                        %query,
                        raw = raw_count,
                        kept = filtered.len(),
                        "backend results"
                    );
                    if !filtered.is_empty() {
                        return filtered;
                    }
                }
                Err(e) => {
                    warn!(backend = backend.name(), %query, error = %format!("{:#}", e), "search backend failed");
                }
            }
        }
        Vec::new()
    }

    /// Fetch and extract one hit. `None` when nothing usable remains.
    async fn acquire(&self, result: &SearchResult) -> Option<AcquiredDocument> {
        let mut content = result.body.clone();

        match self.fetcher.fetch(&result.href).await {
            Ok(Some(markup)) => {
                let extracted = extract(&markup, &result.href, self.settings.max_content_chars);
                if extracted.chars().count() > MIN_CONTAINER_CHARS && is_english(&extracted) {
                    content = extracted;
                } else if !extracted.is_empty() && !is_english(&extracted) {
                    warn!(url = %result.href, "skipping non-English page content");
                }
            }
            Ok(None) => debug!(url = %result.href, "page unavailable, using snippet"),
            Err(e) => warn!(url = %result.href, error = %format!("{:#}", e), "failed to fetch page"),
        }

        if content.chars().count() > MIN_DOCUMENT_CHARS && is_english(&content) {
            Some(AcquiredDocument {
                title: result.title.clone(),
                href: result.href.clone(),
                content,
            })
        } else {
            None
        }
    }
}

#[async_trait]
impl WebSearch for WebAggregator {
    async fn search(&self, game_name: &str, query: &str) -> Vec<AcquiredDocument> {
        let results = self.collect_results(game_name, query).await;
        if results.is_empty() {
            info!(game = %game_name, %query, "web search found nothing");
            return Vec::new();
        }

        let mut documents = Vec::new();
        for result in results.iter().take(self.settings.max_documents) {
            if let Some(doc) = self.acquire(result).await {
                documents.push(doc);
            }
        }
        info!(
            game = %game_name,
            candidates = results.len(),
            documents = documents.len(),
            "web search complete"
        );
        documents
    }
}

/// Prioritized search queries for a question about `game_name`.
pub fn build_queries(game_name: &str, query: &str) -> Vec<String> {
    let compact = game_name.to_lowercase().replace(' ', "");
    let mut queries = Vec::with_capacity(4);

    if let Some((_, site)) = KNOWN_TITLES
        .iter()
        .find(|(needle, _)| compact.contains(needle))
    {
        queries.push(format!("site:{} {}", site, query));
    }
    queries.push(format!("{} {} wiki", game_name, query));
    queries.push(format!("{} {} fandom", game_name, query));
    queries.push(format!("{} {} guide walkthrough", game_name, query));
    queries
}

/// Drop repeated URLs, keeping the first occurrence.
pub fn dedupe_by_url(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.href.clone()))
        .collect()
}

/// Render acquired documents as numbered source blocks.
pub fn format_documents(documents: &[AcquiredDocument], game_name: &str, query: &str) -> String {
    if documents.is_empty() {
        return format!(
            "No English results found for '{} {}'. Please try rephrasing your query or check spelling.",
            game_name, query
        );
    }
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "**[Source {}: {}]**\nURL: {}\nContent:\n{}\n",
                i + 1,
                doc.title,
                doc.href,
                doc.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    type Responder = Box<dyn Fn(&str) -> Result<Vec<SearchResult>> + Send + Sync>;

    struct StubBackend {
        name: &'static str,
        respond: Responder,
        queries: Mutex<Vec<String>>,
    }

    impl StubBackend {
        fn new(
            name: &'static str,
            respond: impl Fn(&str) -> Result<Vec<SearchResult>> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                name,
                respond: Box::new(respond),
                queries: Mutex::new(Vec::new()),
            })
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchBackend for StubBackend {
        fn name(&self) -> &str {
            self.name
        }
        async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<SearchResult>> {
            self.queries.lock().unwrap().push(query.to_string());
            (self.respond)(query)
        }
    }

    /// Serves canned pages; unknown URLs fail like a network error.
    #[derive(Default)]
    struct StubFetcher {
        pages: HashMap<String, Option<String>>,
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<Option<String>> {
            match self.pages.get(url) {
                Some(page) => Ok(page.clone()),
                None => anyhow::bail!("connection refused"),
            }
        }
    }

    fn hit(title: &str, href: &str, body: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            href: href.to_string(),
            body: body.to_string(),
        }
    }

    fn settings() -> AggregatorSettings {
        AggregatorSettings {
            max_results: 10,
            max_documents: 3,
            max_content_chars: 3000,
        }
    }

    fn aggregator(backends: Vec<Arc<dyn SearchBackend>>, fetcher: StubFetcher) -> WebAggregator {
        WebAggregator::new(backends, Arc::new(fetcher), settings())
    }

    const LONG_SNIPPET: &str =
        "The Void Heart is a charm that unites the Knight with the void, obtained after facing the Shade.";

    fn article(paragraph: &str) -> String {
        format!(
            "<html><body><article><p>{}</p><p>{}</p><p>{}</p></article></body></html>",
            paragraph, paragraph, paragraph
        )
    }

    #[test]
    fn test_build_queries_known_title_first() {
        let queries = build_queries("Hollow Knight", "Void Heart");
        assert_eq!(
            queries,
            vec![
                "site:hollowknight.fandom.com Void Heart",
                "Hollow Knight Void Heart wiki",
                "Hollow Knight Void Heart fandom",
                "Hollow Knight Void Heart guide walkthrough",
            ]
        );
        assert!(build_queries("Dark Souls", "Ornstein")[0].starts_with("site:darksouls.fandom.com"));
    }

    #[test]
    fn test_build_queries_unknown_title() {
        let queries = build_queries("Celeste", "strawberries");
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0], "Celeste strawberries wiki");
    }

    #[test]
    fn test_dedupe_preserves_first_seen_order() {
        let deduped = dedupe_by_url(vec![
            hit("a", "https://a", "1"),
            hit("b", "https://b", "2"),
            hit("a2", "https://a", "3"),
        ]);
        let hrefs: Vec<_> = deduped.iter().map(|r| r.href.as_str()).collect();
        assert_eq!(hrefs, ["https://a", "https://b"]);
        assert_eq!(deduped[0].title, "a");
    }

    #[tokio::test]
    async fn test_failed_backend_falls_through_chain() {
        let serper = StubBackend::new("serper", |_| anyhow::bail!("quota exceeded"));
        let lite = StubBackend::new("lite", |_| {
            Ok(vec![hit("Void Heart", "https://hollowknight.fandom.com/wiki/Void_Heart", "A charm")])
        });
        let html = StubBackend::new("html", |_| Ok(vec![]));
        let agg = aggregator(
            vec![serper.clone(), lite.clone(), html.clone()],
            StubFetcher::default(),
        );

        let results = agg.collect_results("Hollow Knight", "Void Heart").await;
        assert_eq!(results.len(), 1);
        assert_eq!(serper.queries().len(), 1);
        assert_eq!(lite.queries().len(), 1);
        assert!(html.queries().is_empty());
    }

    #[tokio::test]
    async fn test_stops_at_first_query_with_trusted_hit() {
        let backend = StubBackend::new("lite", |q| {
            if q.ends_with("fandom") {
                Ok(vec![hit("Wiki", "https://celeste.fandom.com/wiki/Strawberry", "Strawberries")])
            } else {
                Ok(vec![
                    hit("Blog 1", "https://blog.example/1", "one"),
                    hit("Blog 2", "https://blog.example/2", "two"),
                    hit("Blog 3", "https://blog.example/3", "three"),
                ])
            }
        });
        let agg = aggregator(vec![backend.clone()], StubFetcher::default());

        let results = agg.collect_results("Celeste", "strawberries").await;
        // wiki query contributes two "other" hits, fandom query one trusted hit, then stop.
        let hrefs: Vec<_> = results.iter().map(|r| r.href.as_str()).collect();
        assert_eq!(
            hrefs,
            ["https://blog.example/1", "https://blog.example/2", "https://celeste.fandom.com/wiki/Strawberry"]
        );
        assert_eq!(backend.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_filtered_out_results_try_next_backend_then_broad_query() {
        let first = StubBackend::new("serper", |_| {
            Ok(vec![hit("空洞骑士", "https://www.bilibili.com/video/1", "空洞骑士攻略")])
        });
        let second = StubBackend::new("lite", |q| {
            if q.ends_with("english wiki guide") {
                Ok((0..7)
                    .map(|i| hit("Guide", &format!("https://site{}.example", i), "text"))
                    .collect())
            } else {
                Ok(vec![])
            }
        });
        let agg = aggregator(vec![first.clone(), second.clone()], StubFetcher::default());

        let results = agg.collect_results("Celeste", "b-sides").await;
        assert_eq!(results.len(), BROAD_QUERY_RESULTS);
        assert_eq!(first.queries().len(), 4);
        assert_eq!(
            second.queries().last().map(String::as_str),
            Some("Celeste b-sides english wiki guide")
        );
    }

    #[tokio::test]
    async fn test_search_prefers_extracted_content_and_falls_back_to_snippet() {
        let paragraph = "The Void Heart charm is obtained at the end of the Birthplace sequence in the Abyss.";
        let backend = StubBackend::new("lite", |_| {
            Ok(vec![
                hit("Void Heart", "https://hollowknight.fandom.com/wiki/Void_Heart", "Snippet one is short."),
                hit("Guide", "https://www.ign.com/wikis/hollow-knight", LONG_SNIPPET),
                hit("Tiny", "https://gamespot.com/tiny", "too short"),
                hit("Fourth", "https://polygon.com/fourth", LONG_SNIPPET),
            ])
        });
        let mut fetcher = StubFetcher::default();
        fetcher.pages.insert(
            "https://hollowknight.fandom.com/wiki/Void_Heart".to_string(),
            Some(article(paragraph)),
        );
        fetcher
            .pages
            .insert("https://www.ign.com/wikis/hollow-knight".to_string(), None);
        let agg = aggregator(vec![backend], fetcher);

        let docs = agg.search("Hollow Knight", "Void Heart").await;
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].href, "https://hollowknight.fandom.com/wiki/Void_Heart");
        assert!(docs[0].content.starts_with(paragraph));
        assert_eq!(docs[1].content, LONG_SNIPPET);
        // Only the first three hits are fetched.
        assert!(docs.iter().all(|d| d.href != "https://polygon.com/fourth"));
    }

    #[tokio::test]
    async fn test_non_english_page_uses_snippet() {
        let backend = StubBackend::new("lite", |_| {
            Ok(vec![hit("Void Heart", "https://hollowknight.fandom.com/wiki/Void_Heart", LONG_SNIPPET)])
        });
        let mut fetcher = StubFetcher::default();
        fetcher.pages.insert(
            "https://hollowknight.fandom.com/wiki/Void_Heart".to_string(),
            Some(article(&"虚空之心是一个护符。".repeat(20))),
        );
        let agg = aggregator(vec![backend], fetcher);

        let docs = agg.search("Hollow Knight", "Void Heart").await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, LONG_SNIPPET);
    }

    #[tokio::test]
    async fn test_short_english_page_uses_snippet() {
        let url = "https://hollowknight.fandom.com/wiki/Void_Heart";
        let mut fetcher = StubFetcher::default();
        fetcher.pages.insert(
            url.to_string(),
            Some(article("A short English note on the Void Heart charm and where it is.")),
        );
        let agg = aggregator(vec![], fetcher);

        let doc = agg.acquire(&hit("Void Heart", url, LONG_SNIPPET)).await.unwrap();
        assert_eq!(doc.content, LONG_SNIPPET);
    }

    #[tokio::test]
    async fn test_non_english_page_and_snippet_are_skipped() {
        let url = "https://example.com/void-heart";
        let mut fetcher = StubFetcher::default();
        fetcher.pages.insert(
            url.to_string(),
            Some(article(&"虚空之心是一个护符。".repeat(20))),
        );
        let agg = aggregator(vec![], fetcher);

        let snippet = "虚空之心是一个护符，在深渊的尽头获得。".repeat(4);
        assert!(agg.acquire(&hit("Void Heart", url, &snippet)).await.is_none());
    }

    #[tokio::test]
    async fn test_nothing_found_returns_empty() {
        let backend = StubBackend::new("lite", |_| Ok(vec![]));
        let agg = aggregator(vec![backend], StubFetcher::default());
        assert!(agg.search("New Game", "answer").await.is_empty());
    }

    #[test]
    fn test_format_documents() {
        let docs = vec![
            AcquiredDocument {
                title: "A".to_string(),
                href: "http://a".to_string(),
                content: "alpha".to_string(),
            },
            AcquiredDocument {
                title: "B".to_string(),
                href: "http://b".to_string(),
                content: "beta".to_string(),
            },
        ];
        assert_eq!(
            format_documents(&docs, "G", "q"),
            "**[Source 1: A]**\nURL: http://a\nContent:\nalpha\n\n\n---\n\n**[Source 2: B]**\nURL: http://b\nContent:\nbeta\n"
        );
        assert!(format_documents(&[], "New Game", "answer")
            .starts_with("No English results found for 'New Game answer'"));
    }
}
