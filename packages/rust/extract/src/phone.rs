//! Phone number extraction and canonicalization.

use std::sync::LazyLock;

use regex::Regex;
use vanbuilder_crawler::PageHandle;

use crate::CONTACT_REGIONS;
use crate::strategy::{Cascade, ExtractContext};

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?1[\s.\-]?)?\(?\d{3}\)?[\s.\-]?\d{3}[\s.\-]?\d{4}").expect("valid regex")
});

/// Obvious placeholder digit runs.
const PLACEHOLDERS: &[&str] = &["1234567890", "0123456789", "9876543210"];

/// The phone cascade in priority order.
pub fn cascade() -> Cascade<String> {
    Cascade::new("phone")
        .with_fn("tel-link", from_tel_links)
        .with_fn("contact-regions", from_contact_regions)
        .with_fn("document", from_document)
}

/// `<a href="tel:...">` affordances.
pub fn from_tel_links(page: &dyn PageHandle, _ctx: &ExtractContext) -> Option<String> {
    page.all(r#"a[href^="tel:"], a[href^="TEL:"]"#)
        .into_iter()
        .filter_map(|a| a.attr("href").map(|h| h[4..].to_string()))
        .find_map(|raw| normalize_phone(&raw))
}

/// Contact/footer containers and "call" affordances.
pub fn from_contact_regions(page: &dyn PageHandle, _ctx: &ExtractContext) -> Option<String> {
    CONTACT_REGIONS
        .iter()
        .flat_map(|sel| page.all(sel))
        .find_map(|node| scan(&node.text))
        .or_else(|| {
            page.all("a, button, p, span, li")
                .into_iter()
                .filter(|n| n.text.to_ascii_lowercase().contains("call"))
                .find_map(|n| scan(&n.text))
        })
}

/// Whole-document scan, used only when nothing more specific matched.
pub fn from_document(page: &dyn PageHandle, _ctx: &ExtractContext) -> Option<String> {
    scan(&page.body_text())
}

/// First valid phone number in `text`.
pub fn scan(text: &str) -> Option<String> {
    PHONE_RE.find_iter(text).find_map(|m| {
        let before = text[..m.start()].chars().next_back();
        let after = text[m.end()..].chars().next();
        // Part of a longer digit run (order numbers, timestamps).
        if before.is_some_and(|c| c.is_ascii_digit()) || after.is_some_and(|c| c.is_ascii_digit())
        {
            return None;
        }
        normalize_phone(m.as_str())
    })
}

/// Canonical `(NNN) NNN-NNNN`, or `None` for anything that is not a
/// plausible North American number.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 11 && digits.starts_with('1') {
        digits.remove(0);
    }
    if digits.len() != 10 {
        return None;
    }

    let (area, rest) = digits.split_at(3);
    let (exchange, line) = rest.split_at(3);

    let fake = area.starts_with(['0', '1'])
        || exchange == "000"
        || PLACEHOLDERS.contains(&digits.as_str())
        || digits.chars().all(|c| Some(c) == digits.chars().next())
        || (exchange == "555" && line.starts_with("01"));
    if fake {
        return None;
    }

    Some(format!("({area}) {exchange}-{line}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vanbuilder_crawler::HtmlPage;

    fn page(html: &str) -> HtmlPage {
        HtmlPage::parse(url::Url::parse("https://example-van.test/").unwrap(), html)
    }

    #[test]
    fn canonical_form() {
        assert_eq!(normalize_phone("+1-619-812-1903").as_deref(), Some("(619) 812-1903"));
        assert_eq!(normalize_phone("619.812.1903").as_deref(), Some("(619) 812-1903"));
        assert_eq!(normalize_phone("(619) 812 1903").as_deref(), Some("(619) 812-1903"));
        assert_eq!(normalize_phone("16198121903").as_deref(), Some("(619) 812-1903"));
    }

    #[test]
    fn rejects_fakes() {
        assert!(normalize_phone("619-000-1234").is_none());
        assert!(normalize_phone("123-456-7890").is_none());
        assert!(normalize_phone("555-555-5555").is_none());
        assert!(normalize_phone("619-555-0142").is_none());
        assert!(normalize_phone("812-1903").is_none());
    }

    #[test]
    fn scan_skips_longer_digit_runs() {
        assert!(scan("Order 1234619812190312").is_none());
        assert_eq!(
            scan("Call us: 619-812-1903 today").as_deref(),
            Some("(619) 812-1903")
        );
    }

    #[test]
    fn tel_link_wins_over_text() {
        let p = page(
            r#"<html><body><p>Fax 303-555-2000</p>
            <a href="tel:+1-619-812-1903">Call</a></body></html>"#,
        );
        assert_eq!(
            cascade().run(&p, &ExtractContext::new("CA")).as_deref(),
            Some("(619) 812-1903")
        );
    }

    #[test]
    fn footer_before_document_body() {
        let p = page(
            r#"<html><body><p>Serial 720-555-3000</p>
            <footer>Shop: (720) 812-4455</footer></body></html>"#,
        );
        assert_eq!(
            from_contact_regions(&p, &ExtractContext::new("CO")).as_deref(),
            Some("(720) 812-4455")
        );
        assert_eq!(
            from_document(&p, &ExtractContext::new("CO")).as_deref(),
            Some("(720) 555-3000")
        );
    }
}
