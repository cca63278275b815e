//! Business description extraction.

use vanbuilder_crawler::PageHandle;

use crate::strategy::{Cascade, ExtractContext};

const META_MIN: usize = 20;
const META_MAX: usize = 500;
const PARAGRAPH_MIN: usize = 60;
const PARAGRAPH_MAX: usize = 600;

/// Paragraphs must mention at least one of these to count as a description.
const TOPIC_KEYWORDS: &[&str] = &[
    "van",
    "camper",
    "conversion",
    "build",
    "custom",
    "vehicle",
    "adventure",
    "overland",
    "sprinter",
    "transit",
    "promaster",
    "rv",
];

/// Cookie notices, legal footers, and newsletter prompts.
const BOILERPLATE: &[&str] = &[
    "cookie",
    "privacy policy",
    "all rights reserved",
    "copyright",
    "javascript",
    "subscribe",
    "newsletter",
    "terms of service",
];

/// Containers whose paragraphs are chrome, not content.
const CHROME: &[&str] = &["footer", "nav", "header", "cookie", "banner", "modal", "popup"];

pub fn cascade() -> Cascade<String> {
    Cascade::new("description")
        .with_fn("meta-description", from_meta)
        .with_fn("first-paragraph", from_paragraphs)
}

/// `<meta name="description">`, then `og:description`.
pub fn from_meta(page: &dyn PageHandle, _ctx: &ExtractContext) -> Option<String> {
    [
        r#"meta[name="description"]"#,
        r#"meta[property="og:description"]"#,
    ]
    .iter()
    .filter_map(|sel| page.attr(sel, "content"))
    .map(|v| collapse(&v))
    .find(|v| {
        let len = v.chars().count();
        (META_MIN..=META_MAX).contains(&len) && !is_boilerplate(v)
    })
}

/// The first substantive, on-topic paragraph outside page chrome.
pub fn from_paragraphs(page: &dyn PageHandle, _ctx: &ExtractContext) -> Option<String> {
    page.all("p")
        .into_iter()
        .filter(|p| !p.within_any(CHROME))
        .map(|p| p.text)
        .find(|text| {
            let len = text.chars().count();
            (PARAGRAPH_MIN..=PARAGRAPH_MAX).contains(&len)
                && !is_boilerplate(text)
                && is_on_topic(text)
        })
}

fn is_boilerplate(text: &str) -> bool {
    let lower = text.to_lowercase();
    BOILERPLATE.iter().any(|b| lower.contains(b))
}

fn is_on_topic(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| TOPIC_KEYWORDS.iter().any(|k| w.starts_with(k)))
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
