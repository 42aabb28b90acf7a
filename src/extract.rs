//! Readable-text extraction from fetched HTML pages.
//!
//! Extraction is table-driven. Each [`Strategy`] names the URL substrings
//! it applies to, an ordered list of container selectors, the text-bearing
//! elements to read inside the container, and extra elements to strip.
//! The first container whose text exceeds [`MIN_CONTAINER_CHARS`] wins. When
//! the platform strategy finds nothing, the [`GENERIC`] strategy runs, and
//! as a last resort every long paragraph or list item in `<body>` is
//! collected.
//!
//! Extraction never fails: malformed markup yields whatever text could be
//! recovered, possibly an empty string.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::html::{element_text, selector};

/// Content cap applied when no explicit limit is configured.
pub const DEFAULT_MAX_CHARS: usize = 3000;

/// A container's text must be longer than this to be accepted.
pub const MIN_CONTAINER_CHARS: usize = 200;

/// Paragraphs shorter than this are skipped by the `<body>` fallback.
const MIN_BODY_PARAGRAPH_CHARS: usize = 50;

/// Elements stripped from every page before extraction.
const NOISE_ELEMENTS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "iframe", "noscript",
];

/// Per-platform extraction rules.
#[derive(Debug)]
pub struct Strategy {
    pub name: &'static str,
    /// URL substrings selecting this strategy.
    pub url_patterns: &'static [&'static str],
    /// Candidate containers, tried in order.
    pub selectors: &'static [&'static str],
    /// Elements whose text is collected inside the container.
    pub text_elements: &'static str,
    /// Extra elements removed before extraction.
    pub remove: &'static [&'static str],
}

pub const STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "fandom",
        url_patterns: &["fandom.com", "wikia.com"],
        selectors: &[".mw-parser-output", "#mw-content-text", ".page-content", "article"],
        text_elements: "p, li, h2, h3",
        remove: &[".portable-infobox", ".navbox", ".toc", ".mbox", ".infobox"],
    },
    Strategy {
        name: "fextralife",
        url_patterns: &["fextralife.com"],
        selectors: &["#wiki-content-block", ".wiki-content", "article", ".col-sm-12"],
        text_elements: "p, li, h2, h3, td",
        remove: &[],
    },
    Strategy {
        name: "ign",
        url_patterns: &["ign.com"],
        selectors: &["article", ".article-content", ".wiki-page", ".guide-content"],
        text_elements: "p, li, h2, h3",
        remove: &[],
    },
];

pub const GENERIC: Strategy = Strategy {
    name: "generic",
    url_patterns: &[],
    selectors: &["article", "main", ".content", "#content", ".post-content"],
    text_elements: "p, li, h2, h3",
    remove: &[],
};

static BOILERPLATE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"JavaScript is disabled.*?browser\.",
        r"Please enable JavaScript.*?proceed\.",
        r"A required part.*?different browser\.",
        r"Client Challenge",
        r"Loading\.\.\.",
        r"Sign in.*?account",
        r"Create.*?account",
        r"Advertisement",
        r"Skip to.*?content",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?is){}", p)).expect("boilerplate pattern"))
    .collect()
});

static EXTRA_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("newline pattern"));
static EXTRA_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("space pattern"));

/// The platform strategy for `url`, if any matches.
pub fn strategy_for(url: &str) -> Option<&'static Strategy> {
    let url = url.to_lowercase();
    STRATEGIES
        .iter()
        .find(|s| s.url_patterns.iter().any(|p| url.contains(p)))
}

/// Extract cleaned, readable text from `markup`, capped at `max_chars` characters.
pub fn extract(markup: &str, url: &str, max_chars: usize) -> String {
    let mut html = Html::parse_document(markup);
    remove_elements(&mut html, NOISE_ELEMENTS);

    let mut content = String::new();
    if let Some(strategy) = strategy_for(url) {
        remove_elements(&mut html, strategy.remove);
        content = apply_strategy(&html, strategy);
    }

    if !is_substantial(&content) {
        content = apply_strategy(&html, &GENERIC);
        if !is_substantial(&content) {
            content = body_paragraphs(&html);
        }
    }

    truncate_chars(&clean_text(&content), max_chars)
}

/// Strip boilerplate notices, then collapse runs of blank lines and spaces.
pub fn clean_text(text: &str) -> String {
    let mut text = text.to_string();
    for pattern in BOILERPLATE.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }
    let text = EXTRA_NEWLINES.replace_all(&text, "\n\n");
    EXTRA_SPACES.replace_all(&text, " ").trim().to_string()
}

fn is_substantial(content: &str) -> bool {
    content.chars().count() > MIN_CONTAINER_CHARS
}

fn apply_strategy(html: &Html, strategy: &Strategy) -> String {
    let Some(text_selector) = selector(strategy.text_elements) else {
        return String::new();
    };

    let mut content = String::new();
    for css in strategy.selectors {
        let Some(container_selector) = selector(css) else { continue };
        if let Some(container) = html.root_element().select(&container_selector).next() {
            content = collect_text(container, &text_selector, 0);
            if is_substantial(&content) {
                break;
            }
        }
    }
    content
}

fn body_paragraphs(html: &Html) -> String {
    let (Some(body), Some(text_selector)) = (selector("body"), selector("p, li")) else {
        return String::new();
    };
    match html.root_element().select(&body).next() {
        Some(body) => collect_text(body, &text_selector, MIN_BODY_PARAGRAPH_CHARS + 1),
        None => String::new(),
    }
}

/// Text of every `text_selector` match under `root`, one per line,
/// skipping entries shorter than `min_chars`.
fn collect_text(root: ElementRef<'_>, text_selector: &Selector, min_chars: usize) -> String {
    root.select(text_selector)
        .map(element_text)
        .filter(|t| !t.is_empty() && t.chars().count() >= min_chars)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Detach every match from the tree.
///
/// Detached nodes stay in the arena and `Html::select` still walks them,
/// so all later lookups go through `root_element()`.
fn remove_elements(html: &mut Html, selectors: &[&str]) {
    for css in selectors {
        let Some(sel) = selector(css) else { continue };
        let ids: Vec<_> = html.root_element().select(&sel).map(|el| el.id()).collect();
        for id in ids {
            if let Some(mut node) = html.tree.get_mut(id) {
                node.detach();
            }
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
