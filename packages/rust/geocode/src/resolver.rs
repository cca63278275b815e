//! Layered coordinate resolution.

use tracing::{debug, info, instrument, warn};

use vanbuilder_shared::places::{self, COUNTRY_CENTROID, City, US_BOUNDS};
use vanbuilder_shared::{Accuracy, GeocodeResult};

use crate::{AddressQuery, Geocoder};

/// A geocode together with the query it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub query: AddressQuery,
    /// `None` when every layer failed; the record keeps null coordinates.
    pub result: Option<GeocodeResult>,
}

/// Runs the fallback chain: primary service, city centroid, state default
/// city, country centroid.
pub struct Resolver {
    primary: Option<Box<dyn Geocoder>>,
    country_fallback: bool,
}

impl Resolver {
    /// `primary` is `None` when no geocoding key is configured.
    pub fn new(primary: Option<Box<dyn Geocoder>>, country_fallback: bool) -> Self {
        Self {
            primary,
            country_fallback,
        }
    }

    /// Resolver that only uses the curated tables.
    pub fn offline(country_fallback: bool) -> Self {
        Self::new(None, country_fallback)
    }

    /// Resolve `query` through every layer.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn resolve(&self, query: &AddressQuery) -> Resolution {
        let result = self.resolve_inner(query).await;
        match &result {
            Some(r) => info!(accuracy = %r.accuracy, source = %r.source, "geocode resolved"),
            None => warn!("geocode unavailable, coordinates left empty"),
        }
        Resolution {
            query: query.clone(),
            result,
        }
    }

    /// Re-resolve when the address fields changed since `previous`; the new
    /// result supersedes the old one. Unchanged queries keep `previous`.
    pub async fn refresh(&self, previous: &Resolution, query: &AddressQuery) -> Resolution {
        if previous.query.same_location(query) {
            return previous.clone();
        }
        info!(
            before = %previous.query,
            after = %query,
            "address changed, re-resolving coordinates"
        );
        self.resolve(query).await
    }

    async fn resolve_inner(&self, query: &AddressQuery) -> Option<GeocodeResult> {
        // A bare state carries nothing the primary service could improve on.
        if !query.is_state_only() {
            if let Some(hit) = self.primary_lookup(query).await {
                return Some(hit);
            }
        }

        let state = places::find_state(&query.state);

        if let (Some(state), Some(city)) = (state, query.city.as_deref()) {
            if let Some(known) = state.find_city(city) {
                debug!(city = known.name, "city centroid fallback");
                return Some(from_table(known, Accuracy::CityLevel, "city-centroid"));
            }
        }

        if let Some(state) = state {
            let default = state.default_city();
            debug!(city = default.name, "state default city fallback");
            return Some(from_table(default, Accuracy::Default, "state-default"));
        }

        if self.country_fallback {
            debug!("country centroid fallback");
            return Some(from_table(&COUNTRY_CENTROID, Accuracy::Default, "country-centroid"));
        }
        None
    }

    /// Try each non-state-only candidate until a plausible hit. A service
    /// error ends the primary layer; an empty answer moves to the next candidate.
    async fn primary_lookup(&self, query: &AddressQuery) -> Option<GeocodeResult> {
        let primary = self.primary.as_ref()?;
        for candidate in query.candidates() {
            if candidate == query.state {
                break;
            }
            match primary.geocode(&candidate).await {
                Ok(Some(hit)) if US_BOUNDS.contains(hit.lat, hit.lng) => return Some(hit),
                Ok(Some(hit)) => {
                    warn!(%candidate, lat = hit.lat, lng = hit.lng, "implausible geocode rejected");
                }
                Ok(None) => debug!(%candidate, "no primary match"),
                Err(e) => {
                    warn!(%candidate, error = %e, "primary geocoder failed");
                    return None;
                }
            }
        }
        None
    }
}

fn from_table(city: &City, accuracy: Accuracy, source: &str) -> GeocodeResult {
    GeocodeResult {
        lat: city.lat,
        lng: city.lng,
        accuracy,
        source: source.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use vanbuilder_shared::{Result, VanBuilderError};

    /// Answers from a fixed table and records every query.
    struct ScriptedGeocoder {
        answers: HashMap<&'static str, (f64, f64)>,
        fail: bool,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedGeocoder {
        fn new(answers: &[(&'static str, (f64, f64))]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                fail: false,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(&[])
            }
        }
    }

    #[async_trait(?Send)]
    impl Geocoder for ScriptedGeocoder {
        async fn geocode(&self, query: &str) -> Result<Option<GeocodeResult>> {
            self.calls.borrow_mut().push(query.to_string());
            if self.fail {
                return Err(VanBuilderError::Geocode("service down".into()));
            }
            Ok(self.answers.get(query).map(|&(lat, lng)| GeocodeResult {
                lat,
                lng,
                accuracy: Accuracy::Medium,
                source: "google".into(),
            }))
        }
    }

    fn city(name: &str) -> AddressQuery {
        AddressQuery::new(None, Some(name.into()), "AZ")
    }

    #[tokio::test]
    async fn primary_hit_wins() {
        let resolver = Resolver::new(
            Some(Box::new(ScriptedGeocoder::new(&[("Phoenix, AZ", (33.45, -112.07))]))),
            true,
        );
        let r = resolver.resolve(&city("Phoenix")).await.result.unwrap();
        assert_eq!(r.source, "google");
        assert_eq!(r.accuracy, Accuracy::Medium);
    }

    #[tokio::test]
    async fn state_only_skips_primary_and_uses_default_city() {
        let geocoder = ScriptedGeocoder::new(&[]);
        let resolver = Resolver::new(Some(Box::new(geocoder)), true);
        let query = AddressQuery::new(None, None, "AZ");
        let r = resolver.resolve(&query).await.result.unwrap();
        assert_eq!(r.accuracy, Accuracy::Default);
        assert_eq!(r.source, "state-default");
        let phoenix = places::state_by_code("AZ").unwrap().default_city();
        assert_eq!((r.lat, r.lng), (phoenix.lat, phoenix.lng));
    }

    #[tokio::test]
    async fn out_of_bounds_hit_falls_back_to_city_centroid() {
        let resolver = Resolver::new(
            Some(Box::new(ScriptedGeocoder::new(&[("Tempe, AZ", (51.5, -0.12))]))),
            true,
        );
        let r = resolver.resolve(&city("Tempe")).await.result.unwrap();
        assert_eq!(r.accuracy, Accuracy::CityLevel);
        assert_eq!(r.source, "city-centroid");
    }

    #[tokio::test]
    async fn service_failure_and_unknown_city_use_state_default() {
        let resolver = Resolver::new(Some(Box::new(ScriptedGeocoder::failing())), true);
        let r = resolver.resolve(&city("Nowhereville")).await.result.unwrap();
        assert_eq!(r.source, "state-default");
    }

    #[tokio::test]
    async fn unknown_state_uses_country_centroid_only_when_enabled() {
        let query = AddressQuery::new(None, None, "ZZ");
        let r = Resolver::offline(true).resolve(&query).await.result.unwrap();
        assert_eq!(r.source, "country-centroid");
        assert_eq!(r.accuracy, Accuracy::Default);

        assert!(Resolver::offline(false).resolve(&query).await.result.is_none());
    }

    #[tokio::test]
    async fn later_city_supersedes_first_geocode() {
        let resolver = Resolver::new(
            Some(Box::new(ScriptedGeocoder::new(&[
                ("Phoenix, AZ", (33.4484, -112.0740)),
                ("Tempe, AZ", (33.4255, -111.9400)),
            ]))),
            true,
        );

        let first = resolver.resolve(&city("Phoenix")).await;
        let refreshed = resolver.refresh(&first, &city("Tempe")).await;

        let r = refreshed.result.unwrap();
        assert_eq!((r.lat, r.lng), (33.4255, -111.9400));
        assert_eq!(refreshed.query.city.as_deref(), Some("Tempe"));
    }

    #[tokio::test]
    async fn refresh_keeps_unchanged_resolution() {
        let resolver = Resolver::offline(true);
        let first = resolver.resolve(&city("Tempe")).await;
        let again = resolver.refresh(&first, &city("tempe")).await;
        assert_eq!(first, again);
    }

    #[tokio::test]
    async fn offline_tempe_is_city_level() {
        let r = Resolver::offline(true).resolve(&city("Tempe")).await.result.unwrap();
        assert_eq!((r.lat, r.lng), (33.4255, -111.9400));
        assert_eq!(r.accuracy, Accuracy::CityLevel);
    }
}
