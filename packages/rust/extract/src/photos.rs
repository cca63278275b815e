//! Photo candidate collection, scoring, and selection.
//!
//! Candidates are scored on their URL, alt text, and caption. Logo, icon,
//! and social artwork is disqualified outright; so are images with known
//! dimensions below the size gate or outside the aspect-ratio gate.

use url::Url;
use vanbuilder_crawler::{PageHandle, PageNode};
use vanbuilder_shared::PhotoAsset;

/// Terms that reward a candidate, each counted once.
const POSITIVE: &[&str] = &[
    "van",
    "build",
    "interior",
    "exterior",
    "conversion",
    "camper",
    "sprinter",
    "transit",
    "promaster",
    "kitchen",
    "galley",
    "bed",
    "cabinet",
    "solar",
    "custom",
    "overland",
];

/// Tokens that disqualify a candidate.
const NEGATIVE: &[&str] = &[
    "logo",
    "icon",
    "favicon",
    "sprite",
    "avatar",
    "social",
    "facebook",
    "instagram",
    "twitter",
    "youtube",
    "pinterest",
    "tiktok",
    "nav",
    "menu",
    "badge",
    "payment",
    "placeholder",
    "spinner",
    "loader",
    "pixel",
    "tracking",
    "gravatar",
    "emoji",
];

/// Containers that hold build photos.
const GALLERY_CONTAINERS: &[&str] = &["gallery", "portfolio", "slider", "carousel", "lightbox", "builds"];

const POSITIVE_WEIGHT: i32 = 10;
const GALLERY_BONUS: i32 = 15;
const LARGE_BONUS: i32 = 5;
const MIN_SIDE: u32 = 200;
const LARGE_SIDE: u32 = 600;
const MIN_ASPECT: f64 = 0.33;
const MAX_ASPECT: f64 = 3.0;

/// One image found on a page, with the metadata used for scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoCandidate {
    pub url: String,
    pub alt: String,
    pub caption: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub in_gallery: bool,
}

impl PhotoCandidate {
    /// Pixel area, zero when unknown.
    pub fn area(&self) -> u64 {
        match (self.width, self.height) {
            (Some(w), Some(h)) => u64::from(w) * u64::from(h),
            _ => 0,
        }
    }

    fn into_asset(self) -> PhotoAsset {
        PhotoAsset {
            url: self.url,
            alt: self.alt,
            caption: self.caption,
        }
    }
}

/// Every `<img>` on the page plus `og:image`, resolved to absolute HTTP(S) URLs.
pub fn collect_candidates(page: &dyn PageHandle) -> Vec<PhotoCandidate> {
    let base = page.url();
    let mut out: Vec<PhotoCandidate> = page
        .all("img")
        .iter()
        .filter_map(|img| candidate_from_img(img, base))
        .collect();

    if let Some(og) = page.attr(r#"meta[property="og:image"]"#, "content") {
        if let Some(url) = absolutize(base, &og) {
            out.push(PhotoCandidate {
                url,
                alt: String::new(),
                caption: String::new(),
                width: None,
                height: None,
                in_gallery: false,
            });
        }
    }
    out
}

fn candidate_from_img(img: &PageNode, base: &Url) -> Option<PhotoCandidate> {
    let src = ["src", "data-src", "data-lazy-src"]
        .iter()
        .filter_map(|a| img.attr(a))
        .map(str::trim)
        .find(|s| !s.is_empty() && !s.starts_with("data:"))
        .or_else(|| {
            img.attr("srcset")
                .and_then(|set| set.split(',').next())
                .and_then(|first| first.split_whitespace().next())
        })?;

    Some(PhotoCandidate {
        url: absolutize(base, src)?,
        alt: img.attr("alt").unwrap_or_default().trim().to_string(),
        caption: img
            .attr("title")
            .or_else(|| img.attr("data-caption"))
            .unwrap_or_default()
            .trim()
            .to_string(),
        width: img.attr("width").and_then(parse_dimension),
        height: img.attr("height").and_then(parse_dimension),
        in_gallery: img.within_any(GALLERY_CONTAINERS),
    })
}

fn absolutize(base: &Url, raw: &str) -> Option<String> {
    let url = base.join(raw.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

fn parse_dimension(raw: &str) -> Option<u32> {
    raw.trim().trim_end_matches("px").parse().ok()
}

/// Score a candidate; `None` means disqualified.
pub fn score_candidate(candidate: &PhotoCandidate) -> Option<i32> {
    let haystack = format!(
        "{} {} {}",
        candidate.url, candidate.alt, candidate.caption
    )
    .to_lowercase();

    let disqualified = haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| {
            NEGATIVE.contains(&token) || token.starts_with("logo") || token.starts_with("icon")
        });
    if disqualified || candidate.url.to_ascii_lowercase().ends_with(".svg") {
        return None;
    }

    let mut score = 0;
    if let (Some(w), Some(h)) = (candidate.width, candidate.height) {
        if w < MIN_SIDE || h < MIN_SIDE || h == 0 {
            return None;
        }
        let aspect = f64::from(w) / f64::from(h);
        if !(MIN_ASPECT..=MAX_ASPECT).contains(&aspect) {
            return None;
        }
        if w >= LARGE_SIDE && h >= LARGE_SIDE {
            score += LARGE_BONUS;
        }
    }

    score += POSITIVE
        .iter()
        .filter(|term| haystack.contains(*term))
        .count() as i32
        * POSITIVE_WEIGHT;

    if candidate.in_gallery {
        score += GALLERY_BONUS;
    }
    Some(score)
}

/// Top `limit` candidates by score, then pixel area, deduplicated by URL.
pub fn select_photos(candidates: Vec<PhotoCandidate>, limit: usize) -> Vec<PhotoAsset> {
    let mut scored: Vec<(i32, PhotoCandidate)> = candidates
        .into_iter()
        .filter_map(|c| score_candidate(&c).map(|s| (s, c)))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.area().cmp(&a.1.area())));

    let mut out: Vec<PhotoAsset> = Vec::new();
    for (_, candidate) in scored {
        if out.len() >= limit {
            break;
        }
        if !out.iter().any(|p| p.url == candidate.url) {
            out.push(candidate.into_asset());
        }
    }
    out
}

/// Collect, score, and select in one step.
pub fn extract_photos(page: &dyn PageHandle, limit: usize) -> Vec<PhotoAsset> {
    select_photos(collect_candidates(page), limit)
}

/// Append `more` to `existing` until `limit`, skipping URLs already present.
pub fn merge_photos(mut existing: Vec<PhotoAsset>, more: Vec<PhotoAsset>, limit: usize) -> Vec<PhotoAsset> {
    for photo in more {
        if existing.len() >= limit {
            break;
        }
        if !existing.iter().any(|p| p.url == photo.url) {
            existing.push(photo);
        }
    }
    existing
}

#[cfg(test)]
mod tests {
    use super::*;
    use vanbuilder_crawler::HtmlPage;

    fn candidate(url: &str, alt: &str) -> PhotoCandidate {
        PhotoCandidate {
            url: url.into(),
            alt: alt.into(),
            caption: String::new(),
            width: None,
            height: None,
            in_gallery: false,
        }
    }

    fn asset(url: &str) -> PhotoAsset {
        PhotoAsset {
            url: url.into(),
            alt: String::new(),
            caption: String::new(),
        }
    }

    #[test]
    fn logos_and_icons_are_disqualified() {
        assert!(score_candidate(&candidate("https://a.test/img/site-logo.png", "")).is_none());
        assert!(score_candidate(&candidate("https://a.test/icons/fb.png", "Facebook")).is_none());
        assert!(score_candidate(&candidate("https://a.test/x.jpg", "Instagram")).is_none());
        assert!(score_candidate(&candidate("https://a.test/art.svg", "")).is_none());
    }

    #[test]
    fn size_and_aspect_gates() {
        let mut small = candidate("https://a.test/van.jpg", "");
        small.width = Some(120);
        small.height = Some(120);
        assert!(score_candidate(&small).is_none());

        let mut strip = candidate("https://a.test/van.jpg", "");
        strip.width = Some(1800);
        strip.height = Some(300);
        assert!(score_candidate(&strip).is_none());

        let mut good = candidate("https://a.test/van.jpg", "");
        good.width = Some(1200);
        good.height = Some(800);
        assert!(score_candidate(&good).is_some());
    }

    #[test]
    fn keywords_and_gallery_raise_score() {
        let plain = score_candidate(&candidate("https://a.test/p1.jpg", "")).unwrap();
        let described =
            score_candidate(&candidate("https://a.test/p2.jpg", "Sprinter van interior")).unwrap();
        let mut gallery = candidate("https://a.test/p3.jpg", "");
        gallery.in_gallery = true;
        let gallery = score_candidate(&gallery).unwrap();
        assert!(described > plain);
        assert!(gallery > plain);
    }

    #[test]
    fn selection_orders_by_score_then_area_and_dedupes() {
        let mut big = candidate("https://a.test/a.jpg", "");
        big.width = Some(1000);
        big.height = Some(700);
        let mut small = candidate("https://a.test/b.jpg", "");
        small.width = Some(400);
        small.height = Some(300);
        let best = candidate("https://a.test/c.jpg", "custom van build");
        let dup = candidate("https://a.test/c.jpg", "custom van build");

        let picked = select_photos(vec![small, big, best, dup], 2);
        let urls: Vec<&str> = picked.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.test/c.jpg", "https://a.test/a.jpg"]);
    }

    #[test]
    fn collects_from_page() {
        let p = HtmlPage::parse(
            Url::parse("https://example-van.test/").unwrap(),
            r#"<html><head><meta property="og:image" content="/og/build.jpg"></head><body>
            <header><img src="/logo.png" alt="Example Van Co"></header>
            <div class="gallery"><img data-src="/g/1.jpg" src="data:image/gif;base64,R0l" alt="Sprinter build"></div>
            <img srcset="/s/1.jpg 1x, /s/2.jpg 2x" alt="">
            </body></html>"#,
        );
        let candidates = collect_candidates(&p);
        let urls: Vec<&str> = candidates.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example-van.test/logo.png",
                "https://example-van.test/g/1.jpg",
                "https://example-van.test/s/1.jpg",
                "https://example-van.test/og/build.jpg",
            ]
        );
        assert!(candidates[1].in_gallery);

        let photos = extract_photos(&p, 8);
        assert_eq!(photos[0].url, "https://example-van.test/g/1.jpg");
        assert!(photos.iter().all(|p| !p.url.contains("logo")));
    }

    #[test]
    fn merge_respects_limit_and_uniqueness() {
        let merged = merge_photos(
            vec![asset("https://a.test/1.jpg")],
            vec![
                asset("https://a.test/1.jpg"),
                asset("https://a.test/2.jpg"),
                asset("https://a.test/3.jpg"),
            ],
            2,
        );
        let urls: Vec<&str> = merged.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.test/1.jpg", "https://a.test/2.jpg"]);
    }
}
