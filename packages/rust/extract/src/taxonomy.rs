//! Keyword vocabularies for van types, amenities, and services.
//!
//! Each vocabulary entry is a display label and the lower-case phrases that
//! signal it. Output order follows the vocabulary, not the page.

use vanbuilder_crawler::PageHandle;

/// One vocabulary: `(label, phrases)`.
pub type Vocabulary = &'static [(&'static str, &'static [&'static str])];

pub const VAN_TYPES: Vocabulary = &[
    ("Mercedes Sprinter", &["sprinter"]),
    ("Ford Transit", &["ford transit", "transit van", "transit 250", "transit 350", "transit"]),
    ("Ram ProMaster", &["promaster", "pro master"]),
    ("Nissan NV", &["nissan nv", "nv200", "nv2500", "nv3500"]),
    ("Chevy Express", &["chevy express", "chevrolet express"]),
    ("GMC Savana", &["savana"]),
    ("Ford E-Series", &["e-series", "econoline"]),
    ("Box Truck", &["box truck"]),
    ("Skoolie", &["skoolie", "school bus"]),
];

pub const AMENITIES: Vocabulary = &[
    ("Solar Power", &["solar"]),
    ("Lithium Batteries", &["lithium"]),
    ("Shower", &["shower"]),
    ("Toilet", &["toilet"]),
    ("Kitchen", &["kitchen", "galley"]),
    ("Refrigerator", &["fridge", "refrigerator"]),
    ("Heater", &["heater", "diesel heat", "webasto", "espar"]),
    ("Air Conditioning", &["air conditioning", "a/c"]),
    ("Fixed Bed", &["fixed bed", "platform bed", "murphy bed"]),
    ("Fresh Water System", &["water tank", "fresh water", "water pump"]),
    ("Ventilation Fan", &["maxxfan", "roof fan", "vent fan", "fan-tastic"]),
    ("Awning", &["awning"]),
    ("Bike Rack", &["bike rack"]),
    ("Pop-Top", &["pop top", "pop-top"]),
];

pub const SERVICES: Vocabulary = &[
    ("Custom Builds", &["custom build", "custom van", "custom conversion"]),
    ("Full Conversions", &["full conversion", "turnkey"]),
    ("Partial Builds", &["partial build", "diy"]),
    ("Electrical Systems", &["electrical"]),
    ("Repairs", &["repair"]),
    ("Upfitting", &["upfit"]),
    ("Rentals", &["rental", "rent a van"]),
    ("Consultations", &["consultation", "consulting"]),
    ("Design Services", &["design service", "3d design", "layout design"]),
    ("Financing", &["financing"]),
    ("Van Sales", &["for sale", "inventory"]),
];

pub fn van_types(page: &dyn PageHandle) -> Vec<String> {
    scan(&page.body_text(), VAN_TYPES)
}

pub fn amenities(page: &dyn PageHandle) -> Vec<String> {
    scan(&page.body_text(), AMENITIES)
}

pub fn services(page: &dyn PageHandle) -> Vec<String> {
    scan(&page.body_text(), SERVICES)
}

/// Labels whose phrases appear in `text` as whole words, deduplicated.
pub fn scan(text: &str, vocabulary: Vocabulary) -> Vec<String> {
    let lower = text.to_lowercase();
    vocabulary
        .iter()
        .filter(|(_, phrases)| phrases.iter().any(|p| contains_phrase(&lower, p)))
        .map(|(label, _)| (*label).to_string())
        .collect()
}

/// Phrase match that does not start inside a word. Plurals and suffixes
/// ("sprinters", "repairs") still count.
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    haystack.match_indices(phrase).any(|(idx, _)| {
        haystack[..idx]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn van_types_in_vocabulary_order() {
        let text = "We convert Ford Transit and Mercedes Sprinters. Also the ProMaster 2500.";
        assert_eq!(
            scan(text, VAN_TYPES),
            vec!["Mercedes Sprinter", "Ford Transit", "Ram ProMaster"]
        );
    }

    #[test]
    fn phrases_do_not_match_inside_words() {
        // "solar" inside "parasolar", "rental" inside "incremental"
        let text = "parasolar incremental upgrades";
        assert!(scan(text, AMENITIES).is_empty());
        assert!(scan(text, SERVICES).is_empty());
    }

    #[test]
    fn amenities_and_services_deduplicate() {
        let text = "Solar, more solar, a galley kitchen, and repairs. We also do repair work.";
        assert_eq!(scan(text, AMENITIES), vec!["Solar Power", "Kitchen"]);
        assert_eq!(scan(text, SERVICES), vec!["Repairs"]);
    }
}
