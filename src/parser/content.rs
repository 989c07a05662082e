use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::{ExtractError, CONTENT_CLASS};

static CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(&format!("div.{}", CONTENT_CLASS)).unwrap());

/// Outer HTML of the first content block on a posting page.
pub fn extract_content(html: &str) -> Result<String, ExtractError> {
    let doc = Html::parse_document(html);
    doc.select(&CONTENT)
        .next()
        .map(|el| el.html())
        .ok_or(ExtractError::ContentNotFound(CONTENT_CLASS))
}

// ── Tests ──
