//! Email extraction.

use std::sync::LazyLock;

use regex::Regex;
use vanbuilder_crawler::PageHandle;

use crate::CONTACT_REGIONS;
use crate::strategy::{Cascade, ExtractContext};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(?:\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}")
        .expect("valid regex")
});

/// Image filename suffixes that look like addresses (`logo@2x.png`).
const IMAGE_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".avif"];

/// Domains that only ever carry placeholder or tracking addresses.
const PLACEHOLDER_DOMAINS: &[&str] = &[
    "domain.com",
    "yourdomain.com",
    "email.com",
    "sentry.io",
    "wixpress.com",
];

const MAX_LOCAL_LEN: usize = 64;
const MAX_LEN: usize = 80;

/// The email cascade in priority order.
pub fn cascade() -> Cascade<String> {
    Cascade::new("email")
        .with_fn("mailto-link", from_mailto_links)
        .with_fn("contact-regions", from_contact_regions)
        .with_fn("document", from_document)
}

/// `<a href="mailto:...">` affordances.
pub fn from_mailto_links(page: &dyn PageHandle, _ctx: &ExtractContext) -> Option<String> {
    page.all(r#"a[href^="mailto:"], a[href^="MAILTO:"]"#)
        .into_iter()
        .filter_map(|a| {
            let href = a.attr("href")?;
            let addr = href[7..].split('?').next().unwrap_or_default();
            validate_email(addr)
        })
        .next()
}

/// Pattern scan over contact-bearing containers.
pub fn from_contact_regions(page: &dyn PageHandle, _ctx: &ExtractContext) -> Option<String> {
    CONTACT_REGIONS
        .iter()
        .flat_map(|sel| page.all(sel))
        .find_map(|node| shortest_in_block(&node.text))
}

/// Pattern scan over every visible text block.
pub fn from_document(page: &dyn PageHandle, _ctx: &ExtractContext) -> Option<String> {
    page.body_text().lines().find_map(shortest_in_block)
}

/// The shortest valid address in one text block. Concatenated neighbours
/// only ever make a match longer, so the shortest is the least contaminated.
pub fn shortest_in_block(text: &str) -> Option<String> {
    EMAIL_RE
        .find_iter(text)
        .filter_map(|m| validate_email(m.as_str()))
        .min_by_key(String::len)
}

/// Clean and validate one candidate.
pub fn validate_email(raw: &str) -> Option<String> {
    let raw = raw.trim().trim_end_matches('.');
    let (local, domain) = raw.split_once('@')?;
    let domain = cut_case_transition(domain);

    let email = format!("{local}@{domain}").to_ascii_lowercase();
    if !EMAIL_RE.find(&email).is_some_and(|m| m.as_str() == email) {
        return None;
    }
    if local.len() > MAX_LOCAL_LEN || email.len() > MAX_LEN {
        return None;
    }
    if IMAGE_SUFFIXES.iter().any(|s| email.ends_with(s)) {
        return None;
    }

    let domain = &email[email.find('@')? + 1..];
    if is_placeholder_domain(domain) {
        return None;
    }

    Some(email)
}

/// `example.com`, `mail.example.org`, and the listed placeholder domains.
fn is_placeholder_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() >= 2 && labels[labels.len() - 2] == "example" {
        return true;
    }
    PLACEHOLDER_DOMAINS
        .iter()
        .any(|p| domain == *p || domain.ends_with(&format!(".{p}")))
}

/// Drop text glued onto the TLD: `acme.comCall` becomes `acme.com`.
fn cut_case_transition(domain: &str) -> &str {
    let tld_start = domain.rfind('.').map_or(0, |i| i + 1);
    let bytes = domain.as_bytes();
    for i in tld_start + 1..bytes.len() {
        if bytes[i - 1].is_ascii_lowercase() && bytes[i].is_ascii_uppercase() {
            return &domain[..i];
        }
    }
    domain
}

#[cfg(test)]
mod tests {
    use super::*;
    use vanbuilder_crawler::HtmlPage;

    fn page(html: &str) -> HtmlPage {
        HtmlPage::parse(url::Url::parse("https://example-van.test/").unwrap(), html)
    }

    #[test]
    fn rejects_image_names_and_placeholders() {
        assert!(validate_email("logo@2x.png").is_none());
        assert!(validate_email("hero@3x.webp").is_none());
        assert!(validate_email("you@example.com").is_none());
        assert!(validate_email("name@mail.example.org").is_none());
        assert!(validate_email("abc123@sentry.wixpress.com").is_none());
        assert_eq!(
            validate_email("contact@example-van.test").as_deref(),
            Some("contact@example-van.test")
        );
    }

    #[test]
    fn strips_glued_text() {
        assert_eq!(
            validate_email("info@acmevans.comCall").as_deref(),
            Some("info@acmevans.com")
        );
    }

    #[test]
    fn keeps_camel_case_hosts() {
        assert_eq!(
            validate_email("Info@SunsetVans.com").as_deref(),
            Some("info@sunsetvans.com")
        );
    }

    #[test]
    fn prefers_shortest_in_block() {
        let block = "Email info@acmevans.co or sales.team.long@acmevans.co";
        assert_eq!(shortest_in_block(block).as_deref(), Some("info@acmevans.co"));
    }

    #[test]
    fn mailto_first() {
        let p = page(
            r#"<html><body><p>write to builds@acmevans.com</p>
            <a href="mailto:contact@example-van.test?subject=Hi">Email</a></body></html>"#,
        );
        assert_eq!(
            cascade().run(&p, &ExtractContext::new("CA")).as_deref(),
            Some("contact@example-van.test")
        );
    }

    #[test]
    fn document_scan_fallback() {
        let p = page(r#"<html><body><div><p>Reach us: builds@acmevans.com</p></div></body></html>"#);
        assert_eq!(
            cascade().run(&p, &ExtractContext::new("CA")).as_deref(),
            Some("builds@acmevans.com")
        );
    }
}
