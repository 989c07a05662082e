use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{ExtractError, Marker};

static DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

impl Marker {
    pub fn matches(&self, el: &ElementRef) -> bool {
        match *self {
            Marker::Exact(class_attr) => el.value().attr("class") == Some(class_attr),
            Marker::Class(name) => el.value().classes().any(|c| c == name),
        }
    }
}

/// First hyperlink inside `el`, if any.
fn first_link<'a>(el: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.select(&ANCHOR).next()
}

/// Collect the href of the first hyperlink in every container matching
/// `marker`, in document order.
///
/// No matching containers is an empty result. A matching container without a
/// usable hyperlink fails the whole page: the markup is assumed fixed, so this
/// means the page is not what we think it is.
pub fn extract_links(html: &str, marker: Marker) -> Result<Vec<String>, ExtractError> {
    let doc = Html::parse_document(html);
    let mut hrefs = Vec::new();

    for (index, container) in doc.select(&DIV).filter(|el| marker.matches(el)).enumerate() {
        let link = first_link(&container).ok_or(ExtractError::MissingLink { marker, index })?;
        let href = link
            .value()
            .attr("href")
            .ok_or(ExtractError::MissingHref { marker, index })?;
        hrefs.push(href.to_string());
    }

    Ok(hrefs)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{CATEGORY_MARKER, ITEM_MARKER};

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn root_page_categories() {
        let urls = extract_links(&fixture("root"), CATEGORY_MARKER).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://rsrglobal.org/category/engineering",
                "https://rsrglobal.org/category/healthcare",
            ]
        );
    }

    #[test]
    fn root_marker_ignores_plain_more_containers() {
        let html = r#"<div class="more"><a href="/x">x</a></div>
                      <div class="more mt-4"><a href="/y">y</a></div>
                      <div class="more mt-4 mb-4"><a href="/z">z</a></div>"#;
        assert_eq!(extract_links(html, CATEGORY_MARKER).unwrap(), vec!["/z"]);
    }

    #[test]
    fn item_marker_matches_any_more_container() {
        let html = r#"<div class="card more"><a href="/a">a</a></div>
                      <div class="more mt-4 mb-4"><a href="/b">b</a></div>
                      <div class="mores"><a href="/c">c</a></div>"#;
        assert_eq!(extract_links(html, ITEM_MARKER).unwrap(), vec!["/a", "/b"]);
    }

    #[test]
    fn category_page_postings_in_order() {
        let urls = extract_links(&fixture("category_engineering"), ITEM_MARKER).unwrap();
        assert_eq!(urls.len(), 3);
        assert_eq!(urls[0], "https://rsrglobal.org/jobs/site-engineer-germany/");
        assert_eq!(urls[2], "https://rsrglobal.org/jobs/civil-engineer-poland/");
    }

    #[test]
    fn only_first_link_per_container() {
        let html = r#"<div class="more"><a href="/first">1</a><a href="/second">2</a></div>"#;
        assert_eq!(extract_links(html, ITEM_MARKER).unwrap(), vec!["/first"]);
    }

    #[test]
    fn no_containers_is_empty_not_error() {
        let urls = extract_links("<html><body><p>nothing</p></body></html>", ITEM_MARKER).unwrap();
        assert!(urls.is_empty());
        assert!(extract_links("", CATEGORY_MARKER).unwrap().is_empty());
    }

    #[test]
    fn container_without_link_fails_page() {
        let html = r#"<div class="more"><a href="/ok">ok</a></div><div class="more">read more</div>"#;
        assert_eq!(
            extract_links(html, ITEM_MARKER),
            Err(ExtractError::MissingLink { marker: ITEM_MARKER, index: 1 })
        );
    }

    #[test]
    fn link_without_href_fails_page() {
        let html = r#"<div class="more"><a name="top">top</a></div>"#;
        assert_eq!(
            extract_links(html, ITEM_MARKER),
            Err(ExtractError::MissingHref { marker: ITEM_MARKER, index: 0 })
        );
    }
}
