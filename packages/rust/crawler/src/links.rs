//! Link discovery on a loaded page.

use url::Url;

use crate::page::PageHandle;

/// Path or anchor-text keywords that mark a page as a build gallery.
const GALLERY_KEYWORDS: &[&str] = &[
    "gallery",
    "portfolio",
    "our-work",
    "our work",
    "builds",
    "projects",
    "photos",
];

/// Every followable link on the page, resolved against the page URL with
/// fragments stripped. Anchors, `javascript:`, `mailto:` and `tel:` are skipped.
pub fn extract_links(page: &dyn PageHandle) -> Vec<Url> {
    let base = page.url();
    let mut links = Vec::new();

    for node in page.all("a[href]") {
        let Some(href) = node.attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }

        if let Ok(mut resolved) = base.join(href) {
            resolved.set_fragment(None);
            links.push(resolved);
        }
    }

    links
}

/// Same-site links that look like build galleries, in document order,
/// deduplicated, at most `limit`.
pub fn discover_gallery_links(page: &dyn PageHandle, limit: usize) -> Vec<Url> {
    let base = page.url();
    let mut found: Vec<Url> = Vec::new();

    for node in page.all("a[href]") {
        if found.len() >= limit {
            break;
        }
        let Some(href) = node.attr("href") else {
            continue;
        };
        let Ok(mut url) = base.join(href.trim()) else {
            continue;
        };
        url.set_fragment(None);

        if url.host_str() != base.host_str() || !matches!(url.scheme(), "http" | "https") {
            continue;
        }
        if same_page(&url, base) {
            continue;
        }

        let path = url.path().to_ascii_lowercase();
        let label = node.text.to_ascii_lowercase();
        let is_gallery = GALLERY_KEYWORDS
            .iter()
            .any(|k| path.contains(k) || label.contains(k));
        if is_gallery && !found.iter().any(|f| same_page(f, &url)) {
            found.push(url);
        }
    }

    found
}

/// Compare two URLs ignoring a trailing slash and the query.
fn same_page(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str()
        && a.path().trim_end_matches('/') == b.path().trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::HtmlPage;

    fn page(html: &str) -> HtmlPage {
        HtmlPage::parse(Url::parse("https://example-van.test/").unwrap(), html)
    }

    #[test]
    fn extract_links_resolves_and_filters() {
        let p = page(
            r##"<html><body>
            <a href="/about#team">About</a>
            <a href="#top">Top</a>
            <a href="mailto:hi@example-van.test">Mail</a>
            <a href="tel:6195550199">Call</a>
            <a href="javascript:void(0)">JS</a>
            <a href="https://other.test/x">Other</a>
            </body></html>"##,
        );
        let links: Vec<String> = extract_links(&p).iter().map(Url::to_string).collect();
        assert_eq!(
            links,
            vec!["https://example-van.test/about", "https://other.test/x"]
        );
    }

    #[test]
    fn gallery_links_are_same_site_and_deduplicated() {
        let p = page(
            r#"<html><body>
            <a href="/gallery">Gallery</a>
            <a href="/gallery/">Our gallery</a>
            <a href="/builds/sprinter-144">Sprinter 144</a>
            <a href="https://instagram.com/examplevan/photos">Photos</a>
            <a href="/contact">Contact</a>
            <a href="/p/1">See our work</a>
            </body></html>"#,
        );
        let links: Vec<String> = discover_gallery_links(&p, 3)
            .iter()
            .map(Url::to_string)
            .collect();
        assert_eq!(
            links,
            vec![
                "https://example-van.test/gallery",
                "https://example-van.test/builds/sprinter-144",
                "https://example-van.test/p/1",
            ]
        );
    }

    #[test]
    fn gallery_links_respect_limit() {
        let p = page(
            r#"<html><body>
            <a href="/gallery">G</a><a href="/portfolio">P</a><a href="/projects">Pr</a>
            </body></html>"#,
        );
        assert_eq!(discover_gallery_links(&p, 2).len(), 2);
        assert!(discover_gallery_links(&p, 0).is_empty());
    }
}
