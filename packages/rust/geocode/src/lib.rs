//! Coordinate resolution for builder records.
//!
//! A [`Resolver`] asks a primary [`Geocoder`] first and falls back through
//! curated city centroids, the state's default city, and finally the
//! country centroid. Every layer tags its result with an [`Accuracy`] tier.
//!
//! [`Accuracy`]: vanbuilder_shared::Accuracy

mod google;
mod resolver;

use async_trait::async_trait;
use vanbuilder_shared::{GeocodeResult, Result};

pub use google::GoogleGeocoder;
pub use resolver::{Resolution, Resolver};

// ---------------------------------------------------------------------------
// AddressQuery
// ---------------------------------------------------------------------------

/// The address fields a geocode is computed from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressQuery {
    pub street: Option<String>,
    pub city: Option<String>,
    /// Two-letter state code.
    pub state: String,
}

impl AddressQuery {
    pub fn new(street: Option<String>, city: Option<String>, state: impl Into<String>) -> Self {
        Self {
            street: clean(street),
            city: clean(city),
            state: state.into(),
        }
    }

    /// Neither street nor city is known.
    pub fn is_state_only(&self) -> bool {
        self.street.is_none() && self.city.is_none()
    }

    /// Query strings in preference order: street+city+state, city+state, state.
    pub fn candidates(&self) -> Vec<String> {
        let mut out = Vec::new();
        match (&self.street, &self.city) {
            (Some(street), Some(city)) => {
                out.push(format!("{street}, {city}, {}", self.state));
                out.push(format!("{city}, {}", self.state));
            }
            (Some(street), None) => out.push(format!("{street}, {}", self.state)),
            (None, Some(city)) => out.push(format!("{city}, {}", self.state)),
            (None, None) => {}
        }
        out.push(self.state.clone());
        out
    }

    /// Same location fields, ignoring case and surrounding whitespace.
    pub fn same_location(&self, other: &AddressQuery) -> bool {
        eq_opt(&self.street, &other.street)
            && eq_opt(&self.city, &other.city)
            && self.state.eq_ignore_ascii_case(&other.state)
    }
}

impl std::fmt::Display for AddressQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.candidates().first() {
            Some(best) => f.write_str(best),
            None => f.write_str(&self.state),
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn eq_opt(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        (None, None) => true,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Geocoder
// ---------------------------------------------------------------------------

/// A primary geocoding service.
#[async_trait(?Send)]
pub trait Geocoder {
    /// Resolve a free-form address. `Ok(None)` means the service had no match;
    /// `Err` means the service itself failed.
    async fn geocode(&self, query: &str) -> Result<Option<GeocodeResult>>;
}
