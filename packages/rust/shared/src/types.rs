//! Core domain types for builder directory records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// One input unit from the batch file: a business website and its state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Two-letter state code, upper-case.
    pub state: String,
    /// The business website to process.
    pub url: Url,
    /// Caller-supplied business name. When present it always wins over extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_name: Option<String>,
}

impl Target {
    /// Create a target, upper-casing the state code.
    pub fn new(state: impl AsRef<str>, url: Url, known_name: Option<String>) -> Self {
        Self {
            state: state.as_ref().trim().to_ascii_uppercase(),
            url,
            known_name: known_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        }
    }
}

// ---------------------------------------------------------------------------
// PhotoAsset
// ---------------------------------------------------------------------------

/// A curated photo for a builder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoAsset {
    /// Absolute image URL.
    pub url: String,
    /// Alternative text from the page (may be empty).
    #[serde(default)]
    pub alt: String,
    /// Caption from `title`/`figcaption` (may be empty).
    #[serde(default)]
    pub caption: String,
}

// ---------------------------------------------------------------------------
// GeocodeResult
// ---------------------------------------------------------------------------

/// Qualitative confidence label attached to a geocode result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Accuracy {
    /// Rooftop-precision hit from the primary service.
    High,
    /// Any other primary-service hit.
    Medium,
    /// Centroid of a recognised city.
    CityLevel,
    /// State default city or country centroid.
    Default,
}

impl Accuracy {
    /// The wire label (`high`, `medium`, `city-level`, `default`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::CityLevel => "city-level",
            Self::Default => "default",
        }
    }
}

impl std::fmt::Display for Accuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinates resolved for one record attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub lat: f64,
    pub lng: f64,
    pub accuracy: Accuracy,
    /// Which layer produced the result (`google`, `city-centroid`, `state-default`, `country-centroid`).
    pub source: String,
}

// ---------------------------------------------------------------------------
// ProcessingOutcome
// ---------------------------------------------------------------------------

/// Terminal outcome attached to each target after the orchestrator finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingOutcome {
    Success,
    Partial,
    Skipped,
    Failed,
}

impl ProcessingOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ProcessingOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// BuilderRecord
// ---------------------------------------------------------------------------

/// The normalized directory record describing one van-conversion business.
///
/// Only `name`, `website`, and `state` are always present. Every other field
/// stays `None` or empty when extraction found nothing; no placeholder values
/// are ever substituted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderRecord {
    pub name: String,
    pub website: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: String,
    pub zip: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub van_types: Vec<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub social_media: BTreeMap<String, String>,
    #[serde(default)]
    pub photos: Vec<PhotoAsset>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl BuilderRecord {
    /// Create an otherwise empty record.
    pub fn new(name: impl Into<String>, website: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            website: website.into(),
            address: None,
            city: None,
            state: state.into(),
            zip: None,
            phone: None,
            email: None,
            description: None,
            van_types: Vec::new(),
            amenities: Vec::new(),
            services: Vec::new(),
            social_media: BTreeMap::new(),
            photos: Vec::new(),
            lat: None,
            lng: None,
        }
    }

    /// Duplicate-detection key: lower-case alphanumerics separated by single spaces.
    pub fn normalized_name(&self) -> String {
        normalize_name_key(&self.name)
    }

    /// Number of filled contact/location fields (phone, email, address, city, zip).
    pub fn contact_completeness(&self) -> usize {
        [
            self.phone.is_some(),
            self.email.is_some(),
            self.address.is_some(),
            self.city.is_some(),
            self.zip.is_some(),
        ]
        .into_iter()
        .filter(|filled| *filled)
        .count()
    }

    /// Comparable richness score: contact completeness dominates, photos break ties.
    pub fn richness(&self) -> usize {
        self.contact_completeness() * 100 + self.photos.len()
    }

    /// Van types as the comma-joined scalar the directory stores, `None` when empty.
    pub fn van_types_display(&self) -> Option<String> {
        if self.van_types.is_empty() {
            None
        } else {
            Some(self.van_types.join(", "))
        }
    }

    /// Apply (or clear) coordinates from a geocode result.
    pub fn set_coordinates(&mut self, geo: Option<&GeocodeResult>) {
        self.lat = geo.map(|g| g.lat);
        self.lng = geo.map(|g| g.lng);
    }

    /// SHA-256 over the canonical JSON form. Equal hashes mean identical records.
    pub fn content_hash(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        format!("{:x}", hasher.finalize())
    }
}

/// Normalize a business name into its duplicate key.
pub fn normalize_name_key(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BuilderRecord {
        let mut record = BuilderRecord::new("Example Van Co", "https://example-van.test/", "CA");
        record.phone = Some("(619) 812-1903".into());
        record.city = Some("San Diego".into());
        record.van_types = vec!["Mercedes Sprinter".into(), "Ford Transit".into()];
        record
    }

    #[test]
    fn normalized_name_collapses_punctuation() {
        assert_eq!(normalize_name_key("  Acme Vans, LLC. "), "acme vans llc");
        assert_eq!(normalize_name_key("Acme-Vans"), "acme vans");
        assert_eq!(sample().normalized_name(), "example van co");
    }

    #[test]
    fn completeness_and_richness() {
        let mut record = sample();
        assert_eq!(record.contact_completeness(), 2);
        let before = record.richness();
        record.photos.push(PhotoAsset {
            url: "https://example-van.test/a.jpg".into(),
            alt: String::new(),
            caption: String::new(),
        });
        assert_eq!(record.richness(), before + 1);
    }

    #[test]
    fn van_types_display_joins_or_is_absent() {
        assert_eq!(
            sample().van_types_display().as_deref(),
            Some("Mercedes Sprinter, Ford Transit")
        );
        let empty = BuilderRecord::new("A", "https://a.test", "CA");
        assert_eq!(empty.van_types_display(), None);
    }

    #[test]
    fn absent_fields_serialize_as_null() {
        let record = BuilderRecord::new("A Van Build", "https://a.test", "AZ");
        let json = serde_json::to_value(&record).expect("serialize");
        assert!(json["city"].is_null());
        assert!(json["lat"].is_null());
        assert_eq!(json["state"], "AZ");
    }

    #[test]
    fn accuracy_wire_labels() {
        let json = serde_json::to_string(&Accuracy::CityLevel).expect("serialize");
        assert_eq!(json, "\"city-level\"");
        assert_eq!(Accuracy::Default.to_string(), "default");
    }

    #[test]
    fn content_hash_tracks_changes() {
        let a = sample();
        let mut b = sample();
        assert_eq!(a.content_hash(), b.content_hash());
        b.email = Some("hi@example-van.test".into());
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn target_normalizes_inputs() {
        let url = Url::parse("https://example-van.test/").expect("url");
        let target = Target::new(" ca ", url, Some("   ".into()));
        assert_eq!(target.state, "CA");
        assert!(target.known_name.is_none());
    }
}
