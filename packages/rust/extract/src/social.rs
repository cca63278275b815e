//! Social profile links.

use std::collections::BTreeMap;

use url::Url;
use vanbuilder_crawler::PageHandle;

/// `(platform, host suffixes)`.
const PLATFORMS: &[(&str, &[&str])] = &[
    ("facebook", &["facebook.com", "fb.com"]),
    ("instagram", &["instagram.com"]),
    ("youtube", &["youtube.com", "youtu.be"]),
    ("tiktok", &["tiktok.com"]),
    ("twitter", &["twitter.com", "x.com"]),
    ("pinterest", &["pinterest.com"]),
    ("linkedin", &["linkedin.com"]),
];

/// Path fragments of share buttons and embeds rather than profiles.
const NON_PROFILE_PATHS: &[&str] = &["sharer", "/share", "intent/", "/plugins/", "/dialog/", "/embed"];

/// First profile link per platform, in canonical form.
pub fn social_links(page: &dyn PageHandle) -> BTreeMap<String, String> {
    let mut found = BTreeMap::new();
    for node in page.all("a[href]") {
        let Some(href) = node.attr("href") else {
            continue;
        };
        let Ok(url) = page.url().join(href.trim()) else {
            continue;
        };
        if let Some((platform, canonical)) = classify(&url) {
            found.entry(platform.to_string()).or_insert(canonical);
        }
    }
    found
}

/// Platform and canonical URL for a profile link.
pub fn classify(url: &Url) -> Option<(&'static str, String)> {
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();
    let bare = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(&host);

    let &(platform, _) = PLATFORMS.iter().find(|(_, hosts)| {
        hosts
            .iter()
            .any(|h| bare == *h || bare.ends_with(&format!(".{h}")))
    })?;

    let path = url.path().trim_end_matches('/');
    if path.is_empty() || NON_PROFILE_PATHS.iter().any(|p| path.contains(p)) {
        return None;
    }

    Some((platform, format!("https://{bare}{path}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vanbuilder_crawler::HtmlPage;

    #[test]
    fn canonical_profiles_first_per_platform() {
        let p = HtmlPage::parse(
            Url::parse("https://example-van.test/").unwrap(),
            r#"<html><body>
            <a href="https://www.facebook.com/sharer/sharer.php?u=x">Share</a>
            <a href="http://www.facebook.com/examplevan/?ref=footer">FB</a>
            <a href="https://facebook.com/othervan">FB2</a>
            <a href="https://instagram.com/examplevan/">IG</a>
            <a href="https://www.youtube.com/">YT home</a>
            <a href="https://x.com/examplevan?lang=en">X</a>
            </body></html>"#,
        );
        let links = social_links(&p);
        assert_eq!(
            links.get("facebook").map(String::as_str),
            Some("https://facebook.com/examplevan")
        );
        assert_eq!(
            links.get("instagram").map(String::as_str),
            Some("https://instagram.com/examplevan")
        );
        assert_eq!(
            links.get("twitter").map(String::as_str),
            Some("https://x.com/examplevan")
        );
        assert!(!links.contains_key("youtube"));
    }

    #[test]
    fn mobile_and_www_hosts_share_one_canonical_url() {
        let canonical = |raw: &str| classify(&Url::parse(raw).unwrap()).map(|(_, url)| url);
        let expected = Some("https://facebook.com/examplevan".to_string());
        assert_eq!(canonical("https://m.facebook.com/examplevan"), expected);
        assert_eq!(canonical("https://www.facebook.com/examplevan/"), expected);
        assert_eq!(canonical("https://facebook.com/examplevan"), expected);
    }

    #[test]
    fn lookalike_hosts_are_not_platforms() {
        let url = Url::parse("https://notfacebook.com/page").unwrap();
        assert!(classify(&url).is_none());
    }
}
