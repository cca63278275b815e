//! Page query capability used by every field extractor.
//!
//! Extractors never touch the DOM directly; they ask a [`PageHandle`] for
//! nodes matching a CSS selector. [`HtmlPage`] is the concrete handle over a
//! parsed `scraper` document.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

/// Elements whose text never counts as visible page text.
const INVISIBLE: &[&str] = &["script", "style", "noscript", "template", "head", "svg"];

/// A snapshot of one matched element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageNode {
    /// Lower-case tag name.
    pub tag: String,
    /// Descendant text, whitespace-collapsed.
    pub text: String,
    /// Element attributes.
    pub attrs: BTreeMap<String, String>,
    /// Lower-case tag names, classes, and ids of every ancestor, space separated.
    /// Used for container membership checks (footer, gallery, ...).
    pub ancestry: String,
}

impl PageNode {
    /// Attribute value, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Whether any ancestor's tag, class, or id contains one of `needles`.
    pub fn within_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.ancestry.contains(n))
    }
}

/// Read-only query interface over a loaded page.
pub trait PageHandle {
    /// The final URL of the page.
    fn url(&self) -> &Url;

    /// All elements matching `selector`, in document order. Invalid selectors match nothing.
    fn all(&self, selector: &str) -> Vec<PageNode>;

    /// Visible text nodes joined by newlines.
    fn body_text(&self) -> String;

    /// Text of the first matching element with non-empty text.
    fn text(&self, selector: &str) -> Option<String> {
        self.all(selector)
            .into_iter()
            .map(|n| n.text)
            .find(|t| !t.is_empty())
    }

    /// Attribute `name` of the first matching element that carries a non-empty value.
    fn attr(&self, selector: &str, name: &str) -> Option<String> {
        self.all(selector)
            .into_iter()
            .filter_map(|n| n.attrs.get(name).map(|v| v.trim().to_string()))
            .find(|v| !v.is_empty())
    }

    /// The document `<title>`.
    fn title(&self) -> Option<String> {
        self.text("title")
    }
}

// ---------------------------------------------------------------------------
// HtmlPage
// ---------------------------------------------------------------------------

/// A parsed HTML document and the URL it was loaded from.
pub struct HtmlPage {
    url: Url,
    doc: Html,
}

impl HtmlPage {
    /// Parse `body` as a full HTML document.
    pub fn parse(url: Url, body: &str) -> Self {
        Self {
            url,
            doc: Html::parse_document(body),
        }
    }
}

impl std::fmt::Debug for HtmlPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlPage").field("url", &self.url.as_str()).finish()
    }
}

impl PageHandle for HtmlPage {
    fn url(&self) -> &Url {
        &self.url
    }

    fn all(&self, selector: &str) -> Vec<PageNode> {
        let Ok(sel) = Selector::parse(selector) else {
            debug!(selector, "invalid selector, matching nothing");
            return Vec::new();
        };
        self.doc.select(&sel).map(snapshot).collect()
    }

    fn body_text(&self) -> String {
        let mut lines: Vec<&str> = Vec::new();
        for node in self.doc.root_element().descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node
                .ancestors()
                .filter_map(|a| a.value().as_element())
                .any(|e| INVISIBLE.contains(&e.name()));
            if hidden {
                continue;
            }
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed);
            }
        }
        lines.join("\n")
    }
}

fn snapshot(el: ElementRef<'_>) -> PageNode {
    let text = el
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");

    let attrs = el
        .value()
        .attrs()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
        .collect();

    let ancestry = el
        .ancestors()
        .filter_map(ElementRef::wrap)
        .flat_map(|a| {
            let e = a.value();
            [Some(e.name()), e.attr("class"), e.attr("id")]
        })
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    PageNode {
        tag: el.value().name().to_ascii_lowercase(),
        text,
        attrs,
        ancestry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> HtmlPage {
        HtmlPage::parse(Url::parse("https://example-van.test/").unwrap(), html)
    }

    #[test]
    fn text_and_attr_queries() {
        let p = page(
            r#"<html><head><title> Acme Vans | Home </title></head>
            <body><a class="phone" href="tel:+1-619-812-1903">Call  us</a>
            <a class="phone" href="">empty</a></body></html>"#,
        );
        assert_eq!(p.title().as_deref(), Some("Acme Vans | Home"));
        assert_eq!(p.text("a.phone").as_deref(), Some("Call us"));
        assert_eq!(
            p.attr("a.phone", "href").as_deref(),
            Some("tel:+1-619-812-1903")
        );
        assert!(p.attr("a.phone", "data-missing").is_none());
    }

    #[test]
    fn body_text_skips_scripts_and_head() {
        let p = page(
            r#"<html><head><title>T</title><style>.x{}</style></head>
            <body><p>Custom builds</p><script>var phone = "555";</script>
            <footer>9393 Trade Pl, San Diego, CA</footer></body></html>"#,
        );
        let text = p.body_text();
        assert!(text.contains("Custom builds"));
        assert!(text.contains("9393 Trade Pl, San Diego, CA"));
        assert!(!text.contains("var phone"));
        assert!(!text.lines().any(|l| l == "T"));
    }

    #[test]
    fn ancestry_records_containers() {
        let p = page(
            r#"<html><body><section id="Gallery"><figure class="build">
            <img src="/a.jpg" alt="Sprinter interior"></figure></section>
            <footer><img src="/logo.png"></footer></body></html>"#,
        );
        let imgs = p.all("img");
        assert_eq!(imgs.len(), 2);
        assert!(imgs[0].within_any(&["gallery"]));
        assert!(imgs[0].within_any(&["figure"]));
        assert!(imgs[1].within_any(&["footer"]));
        assert_eq!(imgs[0].attr("alt"), Some("Sprinter interior"));
    }

    #[test]
    fn invalid_selector_matches_nothing() {
        let p = page("<html><body><p>x</p></body></html>");
        assert!(p.all("p[[").is_empty());
        assert!(p.text("p[[").is_none());
    }
}
