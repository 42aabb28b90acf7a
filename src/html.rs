//! Small helpers shared by the result-page parsers and the content extractor.

use scraper::{ElementRef, Selector};

/// Parse a CSS selector, `None` if it is invalid.
pub fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Trimmed text nodes of `el`, joined with single spaces.
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_element_text_joins_nested_nodes() {
        let doc = Html::parse_fragment("<p>  Void <b>Heart</b>\n charm </p>");
        let p = doc.select(&selector("p").unwrap()).next().unwrap();
        assert_eq!(element_text(p), "Void Heart charm");
    }

    #[test]
    fn test_invalid_selector_is_none() {
        assert!(selector("p[").is_none());
    }
}
