//! Field extractors for builder websites.
//!
//! Each single-valued field is a [`Cascade`] of ranked strategies over a
//! [`PageHandle`]. List-valued fields (taxonomy, social links, photos) are
//! plain scans. Nothing here touches the network.

pub mod address;
pub mod description;
pub mod email;
pub mod name;
pub mod phone;
pub mod photos;
pub mod social;
pub mod strategy;
pub mod taxonomy;

use std::collections::BTreeMap;

use tracing::{debug, instrument};
use vanbuilder_crawler::PageHandle;
use vanbuilder_shared::{BuilderRecord, PhotoAsset};

pub use photos::{PhotoCandidate, merge_photos, score_candidate, select_photos};
pub use strategy::{Cascade, ExtractContext, FnStrategy, Strategy};

/// Containers that usually carry contact details.
pub(crate) const CONTACT_REGIONS: &[&str] = &[
    r#"[class*="contact"]"#,
    r#"[id*="contact"]"#,
    r#"[class*="phone"]"#,
    r#"[class*="email"]"#,
    "address",
    "footer",
    r#"[class*="footer"]"#,
];

// ---------------------------------------------------------------------------
// ExtractedFields
// ---------------------------------------------------------------------------

/// Everything the extractors recovered from one page. Gaps stay `None`/empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub description: Option<String>,
    pub van_types: Vec<String>,
    pub amenities: Vec<String>,
    pub services: Vec<String>,
    pub social_media: BTreeMap<String, String>,
    pub photos: Vec<PhotoAsset>,
}

impl ExtractedFields {
    /// Phone, email, or street address is still missing.
    pub fn needs_contact_page(&self) -> bool {
        self.phone.is_none() || self.email.is_none() || self.address.is_none()
    }

    /// At least one contact field was found.
    pub fn has_contact_fields(&self) -> bool {
        self.phone.is_some()
            || self.email.is_some()
            || self.address.is_some()
            || self.city.is_some()
            || self.zip.is_some()
    }

    /// Fill contact gaps from a contact sub-page. Phone, email, and social
    /// links from the main page win.
    ///
    /// Street, city, and zip travel together. A main-page street keeps the
    /// main-page location and only its gaps are filled. Without one, the
    /// contact page's city supersedes a different main-page city.
    pub fn merge_contact(&mut self, contact: ExtractedFields) {
        fill(&mut self.phone, contact.phone);
        fill(&mut self.email, contact.email);

        if self.address.is_some() {
            let same_place = match (&self.city, &contact.city) {
                (Some(main), Some(other)) => main.eq_ignore_ascii_case(other),
                _ => true,
            };
            if same_place {
                fill(&mut self.city, contact.city);
                fill(&mut self.zip, contact.zip);
            }
        } else {
            match contact.city {
                Some(city) if self.city.is_none() => {
                    self.city = Some(city);
                    fill(&mut self.zip, contact.zip);
                }
                Some(city) if !self.city.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(&city)) => {
                    debug!(from = ?self.city, to = %city, "contact page city supersedes main page");
                    self.city = Some(city);
                    // A main-page zip belongs to the superseded city.
                    self.zip = contact.zip;
                }
                _ => fill(&mut self.zip, contact.zip),
            }
            self.address = contact.address;
        }

        for (platform, url) in contact.social_media {
            self.social_media.entry(platform).or_insert(url);
        }
    }

    /// Build the record. `name` is the resolved business name.
    pub fn into_record(self, name: String, website: &str, state: &str) -> BuilderRecord {
        let mut record = BuilderRecord::new(name, website, state);
        record.phone = self.phone;
        record.email = self.email;
        record.address = self.address;
        record.city = self.city;
        record.zip = self.zip;
        record.description = self.description;
        record.van_types = self.van_types;
        record.amenities = self.amenities;
        record.services = self.services;
        record.social_media = self.social_media;
        record.photos = self.photos;
        record
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

// ---------------------------------------------------------------------------
// FieldExtractors
// ---------------------------------------------------------------------------

/// Holds one cascade per single-valued field, built once and reused.
pub struct FieldExtractors {
    name: Cascade<String>,
    phone: Cascade<String>,
    email: Cascade<String>,
    address: Cascade<String>,
    city: Cascade<String>,
    zip: Cascade<String>,
    description: Cascade<String>,
}

impl FieldExtractors {
    /// Create the extractors with every built-in strategy.
    pub fn new() -> Self {
        Self {
            name: name::cascade(),
            phone: phone::cascade(),
            email: email::cascade(),
            address: address::street_cascade(),
            city: address::city_cascade(),
            zip: address::zip_cascade(),
            description: description::cascade(),
        }
    }

    /// Run every extractor against a main page.
    #[instrument(skip_all, fields(url = %page.url()))]
    pub fn extract_all(&self, page: &dyn PageHandle, ctx: &ExtractContext) -> ExtractedFields {
        let fields = ExtractedFields {
            name: self.name.run(page, ctx),
            phone: self.phone.run(page, ctx),
            email: self.email.run(page, ctx),
            address: self.address.run(page, ctx),
            city: self.city.run(page, ctx),
            zip: self.zip.run(page, ctx),
            description: self.description.run(page, ctx),
            van_types: taxonomy::van_types(page),
            amenities: taxonomy::amenities(page),
            services: taxonomy::services(page),
            social_media: social::social_links(page),
            photos: photos::extract_photos(page, ctx.photo_limit),
        };
        debug!(
            name = fields.name.as_deref().unwrap_or("-"),
            has_phone = fields.phone.is_some(),
            has_email = fields.email.is_some(),
            has_address = fields.address.is_some(),
            city = fields.city.as_deref().unwrap_or("-"),
            photos = fields.photos.len(),
            "page extracted"
        );
        fields
    }

    /// Contact-only pass used on contact sub-pages.
    pub fn extract_contact(&self, page: &dyn PageHandle, ctx: &ExtractContext) -> ExtractedFields {
        ExtractedFields {
            phone: self.phone.run(page, ctx),
            email: self.email.run(page, ctx),
            address: self.address.run(page, ctx),
            city: self.city.run(page, ctx),
            zip: self.zip.run(page, ctx),
            social_media: social::social_links(page),
            ..ExtractedFields::default()
        }
    }
}

impl Default for FieldExtractors {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;
    use vanbuilder_crawler::HtmlPage;

    const SCENARIO_A: &str = r#"<!doctype html>
<html><head>
  <title>Example Van Co | Custom Sprinter Conversions</title>
  <meta name="description" content="Custom camper van conversions built in San Diego.">
</head><body>
  <header><img class="logo" src="/img/logo.png" alt="Example Van Co"></header>
  <main>
    <p>We build Sprinter and Transit vans with solar, lithium power and a full galley.</p>
    <div class="gallery">
      <img src="/gallery/sprinter-build-1.jpg" alt="Sprinter build interior" width="1200" height="800">
      <img src="/gallery/sprinter-build-2.jpg" alt="Sprinter build exterior" width="1200" height="800">
    </div>
  </main>
  <footer>
    <a href="tel:+1-619-812-1903">Call us</a>
    <a href="mailto:contact@example-van.test">Email</a>
    <p>9393 Trade Pl, San Diego, CA</p>
    <a href="https://instagram.com/examplevan">Instagram</a>
  </footer>
</body></html>"#;

    fn page(html: &str) -> HtmlPage {
        HtmlPage::parse(Url::parse("https://example-van.test/").unwrap(), html)
    }

    #[test]
    fn scenario_a_contact_fields() {
        let extractors = FieldExtractors::new();
        let fields = extractors.extract_all(&page(SCENARIO_A), &ExtractContext::new("CA"));

        assert_eq!(fields.name.as_deref(), Some("Example Van Co"));
        assert_eq!(fields.phone.as_deref(), Some("(619) 812-1903"));
        assert_eq!(fields.email.as_deref(), Some("contact@example-van.test"));
        assert_eq!(fields.address.as_deref(), Some("9393 Trade Pl"));
        assert_eq!(fields.city.as_deref(), Some("San Diego"));
        assert!(fields.zip.is_none());
        assert_eq!(fields.van_types, vec!["Mercedes Sprinter", "Ford Transit"]);
        assert!(fields.amenities.contains(&"Solar Power".to_string()));
        assert_eq!(
            fields.social_media.get("instagram").map(String::as_str),
            Some("https://instagram.com/examplevan")
        );
        assert_eq!(fields.photos.len(), 2);
        assert!(!fields.needs_contact_page());
    }

    #[test]
    fn scenario_b_state_only_leaves_gaps() {
        let html = r#"<html><head><title>Desert Camper Vans</title></head>
            <body><p>Proudly converting vans in Arizona.</p></body></html>"#;
        let fields = FieldExtractors::new().extract_all(&page(html), &ExtractContext::new("AZ"));
        assert!(fields.city.is_none());
        assert!(fields.address.is_none());
        assert!(fields.needs_contact_page());
        assert!(!fields.has_contact_fields());
    }

    #[test]
    fn contact_merge_fills_gaps_only() {
        let mut main = ExtractedFields {
            phone: Some("(619) 812-1903".into()),
            ..ExtractedFields::default()
        };
        let contact = ExtractedFields {
            phone: Some("(720) 812-4455".into()),
            email: Some("hi@acmevans.com".into()),
            city: Some("Tempe".into()),
            ..ExtractedFields::default()
        };
        main.merge_contact(contact);
        assert_eq!(main.phone.as_deref(), Some("(619) 812-1903"));
        assert_eq!(main.email.as_deref(), Some("hi@acmevans.com"));
        assert_eq!(main.city.as_deref(), Some("Tempe"));
    }

    #[test]
    fn contact_city_supersedes_bare_main_page_city() {
        let mut main = ExtractedFields {
            city: Some("Phoenix".into()),
            zip: Some("85004".into()),
            ..ExtractedFields::default()
        };
        let contact = ExtractedFields {
            address: Some("1200 W University Dr".into()),
            city: Some("Tempe".into()),
            ..ExtractedFields::default()
        };
        main.merge_contact(contact);
        assert_eq!(main.address.as_deref(), Some("1200 W University Dr"));
        assert_eq!(main.city.as_deref(), Some("Tempe"));
        assert!(main.zip.is_none());
    }

    #[test]
    fn main_page_street_keeps_its_city() {
        let mut main = ExtractedFields {
            address: Some("9393 Trade Pl".into()),
            city: Some("San Diego".into()),
            ..ExtractedFields::default()
        };
        let contact = ExtractedFields {
            address: Some("100 Harbor Dr".into()),
            city: Some("Oceanside".into()),
            zip: Some("92054".into()),
            ..ExtractedFields::default()
        };
        main.merge_contact(contact);
        assert_eq!(main.address.as_deref(), Some("9393 Trade Pl"));
        assert_eq!(main.city.as_deref(), Some("San Diego"));
        assert!(main.zip.is_none());
    }

    #[test]
    fn into_record_keeps_absence() {
        let fields = ExtractedFields::default();
        let record = fields.into_record("Acme Vans".into(), "https://acmevans.test/", "AZ");
        assert_eq!(record.state, "AZ");
        assert!(record.city.is_none());
        assert!(record.photos.is_empty());
    }
}
