//! Business name extraction.
//!
//! Order: caller-supplied name, logo alt text, name-bearing elements,
//! `og:site_name`, then page title. Every page-derived candidate goes through
//! [`normalize_name`] and must carry a domain token. When all of them fail
//! the caller may fall back to [`name_from_host`].

use std::sync::LazyLock;

use regex::Regex;
use vanbuilder_crawler::PageHandle;
use vanbuilder_shared::places;

use crate::strategy::{Cascade, ExtractContext};

/// Words that mark a candidate as a vehicle-conversion business.
const DOMAIN_TOKENS: &[&str] = &[
    "van",
    "camper",
    "craft",
    "build",
    "custom",
    "conversion",
    "mobile",
    "motor",
    "design",
];

/// Generic page phrases that are never a business name.
const DENYLIST: &[&str] = &[
    "home",
    "homepage",
    "home page",
    "about",
    "about us",
    "contact",
    "contact us",
    "welcome",
    "gallery",
    "our work",
    "services",
    "shop",
    "blog",
    "menu",
    "faq",
    "logo",
    "index",
    "untitled",
    "loading",
    "page not found",
    "404",
];

/// Trailing phrases stripped before validation (matched case-insensitively).
const MARKETING_SUFFIXES: &[&str] = &[
    "official website",
    "official site",
    "home page",
    "homepage",
    "home",
    "logo",
    "welcome",
];

/// Leading phrases stripped before validation.
const MARKETING_PREFIXES: &[&str] = &["welcome to ", "home of ", "logo of ", "logo "];

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 60;
const MAX_WORDS: usize = 8;

static LEGAL_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[,\s]+(?:llc|l\.l\.c\.?|inc\.?|incorporated|corp\.?|corporation|co\.|ltd\.?)$")
        .expect("valid regex")
});

/// ", San Diego, CA" or ", San Diego CA 92101" at the end of a name.
static PLACE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r",\s*[A-Z][A-Za-z .'\-]+,?\s+[A-Z]{2}(?:\s+\d{5})?$").expect("valid regex")
});

static TITLE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[|\-–—:•·]\s+|\s*\|\s*").expect("valid regex"));

/// Selectors for elements that usually carry the business name.
const NAME_SELECTORS: &[&str] = &[
    r#"[itemprop="name"]"#,
    ".site-title",
    ".site-name",
    ".brand-name",
    ".navbar-brand",
    ".logo-text",
    "header h1",
    "h1",
];

/// The name cascade in priority order.
pub fn cascade() -> Cascade<String> {
    Cascade::new("name")
        .with_fn("caller", from_caller)
        .with_fn("logo-alt", from_logo_alt)
        .with_fn("name-elements", from_name_elements)
        .with_fn("og-site-name", from_og_site_name)
        .with_fn("title", from_title)
}

/// A caller-supplied name always wins and skips extraction.
pub fn from_caller(_page: &dyn PageHandle, ctx: &ExtractContext) -> Option<String> {
    ctx.known_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Alt text of a logo image.
pub fn from_logo_alt(page: &dyn PageHandle, _ctx: &ExtractContext) -> Option<String> {
    page.all("img[alt]")
        .into_iter()
        .filter(|img| {
            let marker = ["class", "id", "src"]
                .iter()
                .filter_map(|a| img.attr(a))
                .collect::<Vec<_>>()
                .join(" ")
                .to_ascii_lowercase();
            marker.contains("logo") || img.within_any(&["logo", "brand"])
        })
        .filter_map(|img| img.attr("alt").and_then(accept_candidate))
        .next()
}

/// Text of the first name-bearing element that validates.
pub fn from_name_elements(page: &dyn PageHandle, _ctx: &ExtractContext) -> Option<String> {
    NAME_SELECTORS
        .iter()
        .flat_map(|sel| page.all(sel))
        .find_map(|node| accept_candidate(&node.text))
}

/// `<meta property="og:site_name">`.
pub fn from_og_site_name(page: &dyn PageHandle, _ctx: &ExtractContext) -> Option<String> {
    page.attr(r#"meta[property="og:site_name"]"#, "content")
        .and_then(|v| accept_candidate(&v))
}

/// The first title segment that validates ("Home | Acme Vans" gives "Acme Vans").
pub fn from_title(page: &dyn PageHandle, _ctx: &ExtractContext) -> Option<String> {
    let title = page.title()?;
    TITLE_SPLIT_RE
        .split(&title)
        .find_map(accept_candidate)
}

/// Title-case the registrable label of a host name: `www.sunset-vans.com`
/// gives "Sunset Vans". Not part of the cascade; a host-derived name only
/// labels a record, it never counts as extracted.
pub fn name_from_host(host: &str) -> Option<String> {
    let host = host.trim_start_matches("www.");
    let labels: Vec<&str> = host.split('.').collect();
    let label = if labels.len() > 1 {
        labels[labels.len() - 2]
    } else {
        labels[0]
    };

    let words: Vec<String> = label
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

/// Normalize then require a domain token.
fn accept_candidate(raw: &str) -> Option<String> {
    normalize_name(raw).filter(|n| has_domain_token(n))
}

/// Whether a name contains one of the vehicle-conversion tokens.
pub fn has_domain_token(name: &str) -> bool {
    let lower = name.to_lowercase();
    DOMAIN_TOKENS.iter().any(|t| lower.contains(t))
}

/// Strip marketing, legal, and geographic decorations and reject generic or
/// badly sized results.
pub fn normalize_name(raw: &str) -> Option<String> {
    let mut name = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    // Decorations can stack ("Acme Vans, LLC - Home"), so strip to a fixpoint.
    loop {
        let before = name.clone();

        for prefix in MARKETING_PREFIXES {
            if name
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
            {
                name = name[prefix.len()..].to_string();
                break;
            }
        }

        for suffix in MARKETING_SUFFIXES {
            let Some(cut) = name.len().checked_sub(suffix.len()).filter(|c| *c > 0) else {
                continue;
            };
            if name.get(cut..).is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
                && name[..cut].ends_with([' ', '-', '|', ':'])
            {
                name.truncate(cut);
                break;
            }
        }

        name = LEGAL_SUFFIX_RE.replace(&name, "").into_owned();
        name = PLACE_SUFFIX_RE.replace(&name, "").into_owned();
        name = strip_place_phrase(&name);
        name = name
            .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '|' | ':' | ',' | '–' | '—'))
            .to_string();

        if name == before {
            break;
        }
    }

    let lower = name.to_lowercase();
    if name.chars().count() < MIN_LEN
        || name.chars().count() > MAX_LEN
        || name.split_whitespace().count() > MAX_WORDS
        || DENYLIST.contains(&lower.as_str())
        || lower.contains("http")
        || name.chars().all(|c| c.is_ascii_digit() || c.is_whitespace())
        || is_place(&name)
    {
        return None;
    }

    Some(name)
}

/// Drop a trailing " in <place>" / " of <place>" when the place is a known state or city.
fn strip_place_phrase(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    for connector in [" in ", " of "] {
        if let Some(idx) = lower.rfind(connector) {
            let tail = &name[idx + connector.len()..];
            if is_place(tail) {
                return name[..idx].to_string();
            }
        }
    }
    name.to_string()
}

/// Whether `text` is exactly a state name/code or a known city.
fn is_place(text: &str) -> bool {
    let text = text.trim();
    if places::state_by_name(text).is_some() {
        return true;
    }
    places::STATES.iter().any(|s| s.find_city(text).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vanbuilder_crawler::HtmlPage;

    fn page(url: &str, html: &str) -> HtmlPage {
        HtmlPage::parse(url::Url::parse(url).unwrap(), html)
    }

    fn ctx() -> ExtractContext {
        ExtractContext::new("CA")
    }

    #[test]
    fn normalizer_strips_decorations() {
        assert_eq!(normalize_name("Acme Vans, LLC").as_deref(), Some("Acme Vans"));
        assert_eq!(normalize_name("Welcome to Acme Vans").as_deref(), Some("Acme Vans"));
        assert_eq!(normalize_name("Acme Vans Inc. - Home").as_deref(), Some("Acme Vans"));
        assert_eq!(
            normalize_name("Acme Van Builds, San Diego, CA").as_deref(),
            Some("Acme Van Builds")
        );
        assert_eq!(
            normalize_name("Acme Camper Co. of Colorado").as_deref(),
            Some("Acme Camper")
        );
    }

    #[test]
    fn normalizer_rejects_generic_and_oversized() {
        assert!(normalize_name("Home").is_none());
        assert!(normalize_name("About Us").is_none());
        assert!(normalize_name("ab").is_none());
        assert!(normalize_name("San Diego").is_none());
        assert!(normalize_name(&"Vans ".repeat(20)).is_none());
    }

    #[test]
    fn domain_token_gate() {
        assert!(has_domain_token("Sunset Vanworks"));
        assert!(has_domain_token("Peak Campers"));
        assert!(!has_domain_token("Joe's Plumbing"));
    }

    #[test]
    fn caller_name_wins() {
        let p = page(
            "https://example-van.test/",
            r#"<html><head><title>Other Van Co</title></head></html>"#,
        );
        let ctx = ctx().with_known_name(Some("Given Name".into()));
        assert_eq!(cascade().run(&p, &ctx).as_deref(), Some("Given Name"));
    }

    #[test]
    fn logo_alt_before_title() {
        let p = page(
            "https://example-van.test/",
            r#"<html><head><title>Home | Title Vans</title></head><body>
            <header><a class="brand"><img src="/img/site-logo.png" alt="Sunset Van Conversions Logo"></a></header>
            <img src="/hero.jpg" alt="Beautiful Sprinter van">
            </body></html>"#,
        );
        assert_eq!(
            cascade().run(&p, &ctx()).as_deref(),
            Some("Sunset Van Conversions")
        );
    }

    #[test]
    fn title_segments_are_tried_in_order() {
        let p = page(
            "https://example-van.test/",
            r#"<html><head><title>Home | Peak Camper Builds | San Diego</title></head></html>"#,
        );
        assert_eq!(from_title(&p, &ctx()).as_deref(), Some("Peak Camper Builds"));
    }

    #[test]
    fn candidates_without_domain_token_yield_nothing() {
        let p = page(
            "https://www.sunset-overland.com/",
            r#"<html><head><title>Home | Welcome</title></head><body><h1>Adventure Awaits</h1></body></html>"#,
        );
        assert!(cascade().run(&p, &ctx()).is_none());
    }

    #[test]
    fn host_names() {
        assert_eq!(name_from_host("www.example-van.test").as_deref(), Some("Example Van"));
        assert_eq!(name_from_host("acmevans.com").as_deref(), Some("Acmevans"));
    }
}
