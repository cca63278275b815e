//! Validation of photo origins and policy remediation.

use tracing::{error, info, instrument, warn};
use vanbuilder_shared::{CspMode, PhotoAsset, VanBuilderError};

use crate::allowlist::{AllowList, origin_of};
use crate::store::PolicyStore;

/// An asset (or the site itself) whose origin is not allow-listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub url: String,
    pub origin: String,
    /// The site's own origin rather than a photo.
    pub site: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
    /// Distinct violating origins in first-seen order.
    pub new_origins: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    fn record(&mut self, url: &str, origin: String, site: bool) {
        if !self.new_origins.contains(&origin) {
            self.new_origins.push(origin.clone());
        }
        self.violations.push(Violation {
            url: url.to_string(),
            origin,
            site,
        });
    }
}

/// Check every photo URL, then the site's own origin, against `allow`.
/// Unparseable URLs are skipped.
pub fn validate<'a, I>(photo_urls: I, site_url: &str, allow: &AllowList) -> ValidationReport
where
    I: IntoIterator<Item = &'a str>,
{
    let mut report = ValidationReport::default();
    for url in photo_urls {
        match origin_of(url) {
            Some(origin) if !allow.allows(&origin) => report.record(url, origin, false),
            Some(_) => {}
            None => warn!(%url, "photo URL has no origin, skipped"),
        }
    }
    match origin_of(site_url) {
        Some(origin) if !allow.allows(&origin) => report.record(site_url, origin, true),
        Some(_) => {}
        None => warn!(url = %site_url, "site URL has no origin, skipped"),
    }
    report
}

/// Result of [`CspEngine::check`] for one record.
#[derive(Debug, Clone, Default)]
pub struct CspOutcome {
    /// Photos to persist.
    pub photos: Vec<PhotoAsset>,
    pub report: ValidationReport,
    /// Origins appended to the policy store.
    pub added: Vec<String>,
    /// Photos removed in drop mode.
    pub dropped: usize,
    /// Load or remediation failure; never fatal to the record.
    pub error: Option<String>,
}

/// Validates a record's photos against the policy store and applies the
/// configured [`CspMode`].
pub struct CspEngine {
    store: Box<dyn PolicyStore>,
    mode: CspMode,
}

impl CspEngine {
    pub fn new(store: Box<dyn PolicyStore>, mode: CspMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> CspMode {
        self.mode
    }

    /// Validate only, without touching the store.
    pub fn validate(&self, photo_urls: &[&str], site_url: &str) -> crate::Result<ValidationReport> {
        let allow = self.store.load()?;
        Ok(validate(photo_urls.iter().copied(), site_url, &allow))
    }

    /// Append origins, idempotently.
    pub fn auto_remediate(&self, origins: &[String]) -> crate::Result<Vec<String>> {
        self.store.append(origins)
    }

    #[instrument(skip_all, fields(site = %site_url, photos = photos.len(), mode = ?self.mode))]
    pub fn check(&self, photos: Vec<PhotoAsset>, site_url: &str) -> CspOutcome {
        let allow = match self.store.load() {
            Ok(allow) => allow,
            Err(e) => {
                error!(error = %e, "policy store unreadable, photos left unvalidated");
                return CspOutcome {
                    photos,
                    error: Some(e.to_string()),
                    ..CspOutcome::default()
                };
            }
        };

        let report = validate(photos.iter().map(|p| p.url.as_str()), site_url, &allow);
        if report.is_clean() {
            return CspOutcome {
                photos,
                report,
                ..CspOutcome::default()
            };
        }

        match self.mode {
            CspMode::Remediate => {
                let (added, error) = match self.store.append(&report.new_origins) {
                    Ok(added) => {
                        info!(added = added.len(), "allow-list remediated");
                        (added, None)
                    }
                    Err(e) => {
                        let e = VanBuilderError::CspRemediation(e.to_string());
                        error!(error = %e, origins = ?report.new_origins, "allow-list remediation failed");
                        (Vec::new(), Some(e.to_string()))
                    }
                };
                CspOutcome {
                    photos,
                    report,
                    added,
                    dropped: 0,
                    error,
                }
            }
            CspMode::Drop => {
                let blocked: Vec<&str> = report
                    .violations
                    .iter()
                    .filter(|v| !v.site)
                    .map(|v| v.url.as_str())
                    .collect();
                let before = photos.len();
                let kept: Vec<PhotoAsset> = photos
                    .into_iter()
                    .filter(|p| !blocked.contains(&p.url.as_str()))
                    .collect();
                let dropped = before - kept.len();
                if dropped > 0 {
                    warn!(dropped, "photos from disallowed origins dropped");
                }
                CspOutcome {
                    photos: kept,
                    report,
                    added: Vec::new(),
                    dropped,
                    error: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryPolicyStore;

    const SITE: &str = "https://example-van.test/";

    fn photo(url: &str) -> PhotoAsset {
        PhotoAsset {
            url: url.into(),
            alt: String::new(),
            caption: String::new(),
        }
    }

    fn allow() -> AllowList {
        AllowList::new([
            "'self'",
            "data:",
            "https://example-van.test",
            "https://*.cdn.example.com",
        ])
    }

    #[test]
    fn violation_iff_origin_not_allowed() {
        let allow = allow();
        let urls = [
            "https://example-van.test/a.jpg",
            "https://img.cdn.example.com/b.jpg",
            "https://a.b.cdn.example.com/c.jpg",
            "https://static.wixstatic.com/d.jpg",
            "data:image/png;base64,AAAA",
            "http://example-van.test/e.jpg",
        ];
        let report = validate(urls, SITE, &allow);
        let flagged: Vec<&str> = report.violations.iter().map(|v| v.url.as_str()).collect();
        for url in urls {
            let origin = origin_of(url).unwrap();
            assert_eq!(flagged.contains(&url), !allow.allows(&origin), "{url}");
        }
        assert_eq!(
            report.new_origins,
            vec![
                "https://a.b.cdn.example.com",
                "https://static.wixstatic.com",
                "http://example-van.test",
            ]
        );
    }

    #[test]
    fn new_origins_are_distinct_and_include_site() {
        let report = validate(
            ["https://x.test/1.jpg", "https://x.test/2.jpg"],
            "https://builder.test",
            &AllowList::new(["'self'"]),
        );
        assert_eq!(report.violations.len(), 3);
        assert_eq!(report.new_origins, vec!["https://x.test", "https://builder.test"]);
        assert!(report.violations[2].site);
    }

    #[test]
    fn remediate_mode_appends_and_keeps_photos() {
        let store = MemoryPolicyStore::with_entries(&["'self'", "data:"]);
        let engine = CspEngine::new(Box::new(store.clone()), CspMode::Remediate);
        let outcome = engine.check(vec![photo("https://img.wixstatic.test/a.jpg")], SITE);

        assert_eq!(outcome.photos.len(), 1);
        assert_eq!(
            outcome.added,
            vec!["https://img.wixstatic.test", "https://example-van.test"]
        );
        assert!(outcome.error.is_none());
        assert!(store.load().unwrap().allows("https://img.wixstatic.test"));
    }

    #[test]
    fn remediation_failure_is_not_fatal() {
        let store = MemoryPolicyStore::with_entries(&["'self'"]).read_only();
        let engine = CspEngine::new(Box::new(store), CspMode::Remediate);
        let outcome = engine.check(vec![photo("https://img.other.test/a.jpg")], SITE);

        assert_eq!(outcome.photos.len(), 1);
        assert!(outcome.added.is_empty());
        assert!(outcome.error.unwrap().contains("read-only"));
    }

    #[test]
    fn drop_mode_removes_violating_photos_only() {
        let store = MemoryPolicyStore::with_entries(&["https://example-van.test"]);
        let engine = CspEngine::new(Box::new(store.clone()), CspMode::Drop);
        let outcome = engine.check(
            vec![
                photo("https://example-van.test/keep.jpg"),
                photo("https://elsewhere.test/drop.jpg"),
            ],
            SITE,
        );
        assert_eq!(outcome.dropped, 1);
        assert_eq!(outcome.photos[0].url, "https://example-van.test/keep.jpg");
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn auto_remediate_twice_equals_once() {
        let store = MemoryPolicyStore::with_entries(&["'self'", "data:"]);
        let engine = CspEngine::new(Box::new(store.clone()), CspMode::Remediate);
        let origins = vec!["https://a.test".to_string(), "https://b.test".to_string()];

        engine.auto_remediate(&origins).unwrap();
        let once = store.text();
        engine.auto_remediate(&origins).unwrap();
        assert_eq!(store.text(), once);
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn repeated_runs_with_unchanged_list_agree() {
        let store = MemoryPolicyStore::with_entries(&["'self'", "https://example-van.test"]);
        let engine = CspEngine::new(Box::new(store.clone()), CspMode::Drop);
        let photos = vec![
            photo("https://example-van.test/a.jpg"),
            photo("https://cdn.other.test/b.jpg"),
        ];

        let first = engine.check(photos.clone(), SITE);
        let second = engine.check(photos, SITE);
        assert_eq!(first.report, second.report);
        assert_eq!(store.load().unwrap().len(), 2);

        // After remediation the same photos come back clean, with no duplicates.
        let remediating = CspEngine::new(Box::new(store.clone()), CspMode::Remediate);
        remediating.check(vec![photo("https://cdn.other.test/b.jpg")], SITE);
        let again = remediating.check(vec![photo("https://cdn.other.test/b.jpg")], SITE);
        assert!(again.report.is_clean());
        assert_eq!(store.load().unwrap().len(), 3);
    }
}
