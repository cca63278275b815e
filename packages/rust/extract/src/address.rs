//! Street address, city, and postal code extraction.
//!
//! A street address must open its text segment with a street number. Segments
//! come from element text split on common separators, plus whatever follows
//! an address trigger phrase ("located at", "address:").

use std::sync::LazyLock;

use regex::Regex;
use vanbuilder_crawler::PageHandle;
use vanbuilder_shared::places::{self, StateInfo};

use crate::strategy::{Cascade, ExtractContext};

/// Number, up to five name words, a street type, and an optional unit.
static STREET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(\d{1,6}[a-z]?)\s+((?:[a-z0-9.'#\-]+\s+){0,5}?)(avenue|ave|street|st|boulevard|blvd|lane|ln|road|rd|drive|dr|circle|cir|court|ct|way|place|pl|parkway|pkwy|highway|hwy)\b\.?(?:,?\s+(?:suite|ste|unit|#)\s*[a-z0-9\-]+)?",
    )
    .expect("valid regex")
});

/// "123 Main St, City, ST" with an optional zip.
static STREET_CITY_STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,6}\s+[^,\n]{2,60}?,\s*([A-Z][A-Za-z .'\-]{1,40}?),?\s+([A-Z]{2})\b")
        .expect("valid regex")
});

/// "City, ST 12345" without a street.
static CITY_STATE_ZIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Z][A-Za-z .'\-]{1,40}?),\s*([A-Z]{2})\s+\d{5}(?:-\d{4})?\b")
        .expect("valid regex")
});

static STATE_ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2})\s+(\d{5})(?:-\d{4})?\b").expect("valid regex"));

/// Lower-case phrases after which an address usually follows.
const TRIGGERS: &[&str] = &[
    "address:",
    "located at",
    "visit us at",
    "find us at",
    "shop:",
    "location:",
];

/// Words that cannot be part of a street name.
const STOPWORDS: &[&str] = &["for", "at", "to", "call", "us", "our", "info", "and", "or", "the"];

/// Words that mark promotional, script, or markup noise.
const NOISE_WORDS: &[&str] = &[
    "sale",
    "free",
    "discount",
    "click",
    "subscribe",
    "cookie",
    "function",
    "var",
    "return",
    "copyright",
    "call",
];

const NOISE_CHARS: &[char] = &['{', '}', '<', '>', '=', '$', '©', ';'];

const MIN_LEN: usize = 10;
const MAX_LEN: usize = 80;

/// Elements that usually hold a postal address.
const ADDRESS_SELECTORS: &[&str] = &[
    r#"[itemprop="streetAddress"]"#,
    "address",
    r#"[class*="address"]"#,
    r#"[class*="location"]"#,
    "footer",
];

// ---------------------------------------------------------------------------
// Street
// ---------------------------------------------------------------------------

/// The street address cascade.
pub fn street_cascade() -> Cascade<String> {
    Cascade::new("address")
        .with_fn("address-elements", street_from_elements)
        .with_fn("document", street_from_document)
}

pub fn street_from_elements(page: &dyn PageHandle, ctx: &ExtractContext) -> Option<String> {
    ADDRESS_SELECTORS
        .iter()
        .flat_map(|sel| page.all(sel))
        .find_map(|node| find_street(&node.text, state_of(ctx)))
}

pub fn street_from_document(page: &dyn PageHandle, ctx: &ExtractContext) -> Option<String> {
    page.body_text()
        .lines()
        .find_map(|line| find_street(line, state_of(ctx)))
}

/// First valid street address in any segment of `text`.
pub fn find_street(text: &str, state: Option<&StateInfo>) -> Option<String> {
    segments(text)
        .into_iter()
        .find_map(|segment| parse_street(&segment, state))
}

/// Parse a street address that starts exactly at the beginning of `segment`.
pub fn parse_street(segment: &str, state: Option<&StateInfo>) -> Option<String> {
    let caps = STREET_RE.captures(segment.trim())?;
    let matched = caps.get(0)?.as_str();

    let name_words = caps.get(2).map_or("", |m| m.as_str());
    if name_words
        .split_whitespace()
        .any(|w| STOPWORDS.contains(&w.to_ascii_lowercase().as_str()))
    {
        return None;
    }

    let lower = matched.to_ascii_lowercase();
    if lower.contains("http")
        || matched.contains(NOISE_CHARS)
        || lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|w| NOISE_WORDS.contains(&w))
    {
        return None;
    }

    let street = trim_trailing_place(matched, state);
    let len = street.chars().count();
    if !(MIN_LEN..=MAX_LEN).contains(&len) {
        return None;
    }
    Some(street)
}

/// Split on separators and add the text after each trigger phrase.
fn segments(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for piece in text.split(['\n', '|', '•', '·']) {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        out.push(piece.to_string());

        let lower = piece.to_ascii_lowercase();
        for trigger in TRIGGERS {
            if let Some(idx) = lower.find(trigger) {
                let rest = piece[idx + trigger.len()..].trim_start_matches([' ', ':', '-']);
                if !rest.is_empty() {
                    out.push(rest.to_string());
                }
            }
        }
    }
    out
}

/// Remove city, state, and zip fragments that follow the street proper.
fn trim_trailing_place(street: &str, state: Option<&StateInfo>) -> String {
    let mut s = tidy(street);
    loop {
        let before = s.clone();

        if let Some((head, tail)) = s.rsplit_once(' ') {
            if is_zip(tail) {
                s = tidy(head);
            }
        }

        if let Some((head, tail)) = s.rsplit_once(',') {
            let tail = tail.trim();
            let is_state_code = tail.len() == 2
                && tail.chars().all(|c| c.is_ascii_uppercase())
                && places::state_by_code(tail).is_some();
            let is_city = state.is_some_and(|st| st.find_city(tail).is_some());
            if is_state_code || is_city {
                s = tidy(head);
            }
        }

        if let Some(state) = state {
            let lower = s.to_ascii_lowercase();
            if let Some(city) = state.cities.iter().find(|c| {
                let needle = format!(" {}", c.name.to_ascii_lowercase());
                lower.ends_with(&needle) && lower.len() > needle.len()
            }) {
                s.truncate(s.len() - city.name.len());
                s = tidy(&s);
            }
        }

        if s == before {
            return s;
        }
    }
}

fn tidy(s: &str) -> String {
    s.trim().trim_end_matches(',').trim_end().to_string()
}

fn is_zip(s: &str) -> bool {
    let (five, plus4) = s.split_once('-').unwrap_or((s, ""));
    five.len() == 5
        && five.chars().all(|c| c.is_ascii_digit())
        && (plus4.is_empty() || (plus4.len() == 4 && plus4.chars().all(|c| c.is_ascii_digit())))
}

// ---------------------------------------------------------------------------
// City
// ---------------------------------------------------------------------------

/// The city cascade. Returns `None` rather than a default city.
pub fn city_cascade() -> Cascade<String> {
    Cascade::new("city")
        .with_fn("street-city-state", city_from_street_pattern)
        .with_fn("city-state-zip", city_from_zip_pattern)
        .with_fn("known-cities", city_from_known_list)
}

/// `street, City, ST[ zip]` where `ST` is the target's state.
pub fn city_from_street_pattern(page: &dyn PageHandle, ctx: &ExtractContext) -> Option<String> {
    city_from_pattern(&STREET_CITY_STATE_RE, page, ctx)
}

/// `City, ST 12345` where `ST` is the target's state.
pub fn city_from_zip_pattern(page: &dyn PageHandle, ctx: &ExtractContext) -> Option<String> {
    city_from_pattern(&CITY_STATE_ZIP_RE, page, ctx)
}

fn city_from_pattern(re: &Regex, page: &dyn PageHandle, ctx: &ExtractContext) -> Option<String> {
    let text = page.body_text();
    for caps in re.captures_iter(&text) {
        let (Some(city), Some(code)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if !code.as_str().eq_ignore_ascii_case(&ctx.state) {
            continue;
        }
        if let Some(city) = clean_city(city.as_str(), state_of(ctx)) {
            return Some(city);
        }
    }
    None
}

/// Cut a captured city down to the place itself: "Located in Tempe" gives
/// "Tempe". Known cities use the table's spelling; unknown ones keep their
/// trailing capitalized words.
fn clean_city(raw: &str, state: Option<&StateInfo>) -> Option<String> {
    let words: Vec<&str> = raw.split_whitespace().collect();
    if words.is_empty() || raw.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    if let Some(state) = state {
        for start in 0..words.len() {
            if let Some(city) = state.find_city(&words[start..].join(" ")) {
                return Some(city.name.to_string());
            }
        }
    }

    let keep = words
        .iter()
        .rev()
        .take_while(|w| w.chars().next().is_some_and(char::is_uppercase))
        .count();
    if keep == 0 {
        return None;
    }
    Some(words[words.len() - keep..].join(" "))
}

/// The earliest mention of one of the state's major cities.
pub fn city_from_known_list(page: &dyn PageHandle, ctx: &ExtractContext) -> Option<String> {
    let state = state_of(ctx)?;
    let text = page.body_text();
    state
        .cities
        .iter()
        .filter_map(|c| find_word(&text, c.name).map(|pos| (pos, c.name)))
        .min_by(|a, b| a.0.cmp(&b.0).then(b.1.len().cmp(&a.1.len())))
        .map(|(_, name)| name.to_string())
}

/// Byte offset of `needle` in `text` as a whole word.
fn find_word(text: &str, needle: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = text[from..].find(needle) {
        let start = from + rel;
        let end = start + needle.len();
        let before_ok = text[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = text[end..].chars().next().is_none_or(|c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return Some(start);
        }
        from = end;
    }
    None
}

// ---------------------------------------------------------------------------
// Zip
// ---------------------------------------------------------------------------

/// The postal code cascade.
pub fn zip_cascade() -> Cascade<String> {
    Cascade::new("zip")
        .with_fn("postal-code-element", zip_from_element)
        .with_fn("state-zip", zip_from_text)
}

pub fn zip_from_element(page: &dyn PageHandle, _ctx: &ExtractContext) -> Option<String> {
    page.text(r#"[itemprop="postalCode"]"#)
        .map(|z| z.chars().take_while(char::is_ascii_digit).collect::<String>())
        .filter(|z| z.len() == 5)
}

/// Five digits right after the target's state code.
pub fn zip_from_text(page: &dyn PageHandle, ctx: &ExtractContext) -> Option<String> {
    let text = page.body_text();
    STATE_ZIP_RE
        .captures_iter(&text)
        .filter(|c| c.get(1).is_some_and(|m| m.as_str().eq_ignore_ascii_case(&ctx.state)))
        .find_map(|c| c.get(2).map(|m| m.as_str().to_string()))
}

fn state_of(ctx: &ExtractContext) -> Option<&'static StateInfo> {
    places::state_by_code(&ctx.state)
}
