//! Duplicate detection by normalized name and the merge/overwrite decision.

use serde::Serialize;
use tracing::info;

use vanbuilder_shared::{BuilderRecord, DuplicatePolicy, Result};
use vanbuilder_storage::RecordStore;

/// What happens to an incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// No existing record.
    Insert,
    /// Existing record is identical; nothing to write.
    Unchanged,
    /// Incoming record is at least as rich and replaces the existing one.
    Overwrite,
    /// Existing record is richer; the incoming one is written with its gaps
    /// backfilled from the existing one.
    Merge,
    /// The operator or policy refused to touch the existing record.
    Declined,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Unchanged => "unchanged",
            Self::Overwrite => "overwrite",
            Self::Merge => "merge",
            Self::Declined => "declined",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`DuplicateResolver::resolve`].
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Whether the pipeline continues to the persistence sink.
    pub proceed: bool,
    pub existing: Option<BuilderRecord>,
    pub decision: Decision,
    /// The record to write when `proceed` is true.
    pub record: BuilderRecord,
}

impl Resolution {
    /// A write is needed (proceeding and not identical to what is stored).
    pub fn needs_write(&self) -> bool {
        self.proceed && self.decision != Decision::Unchanged
    }
}

/// Asks an operator whether an existing record may be replaced.
pub trait Confirmer {
    /// `proposed` is what would be written (already merged when `decision` is `Merge`).
    fn confirm(&self, existing: &BuilderRecord, proposed: &BuilderRecord, decision: Decision) -> bool;
}

/// Fixed answer, for tests and non-interactive runs.
pub struct AutoConfirm(pub bool);

impl Confirmer for AutoConfirm {
    fn confirm(&self, _existing: &BuilderRecord, _proposed: &BuilderRecord, _decision: Decision) -> bool {
        self.0
    }
}

/// Applies the configured [`DuplicatePolicy`].
pub struct DuplicateResolver {
    policy: DuplicatePolicy,
    confirmer: Box<dyn Confirmer>,
}

impl DuplicateResolver {
    pub fn new(policy: DuplicatePolicy, confirmer: Box<dyn Confirmer>) -> Self {
        Self { policy, confirmer }
    }

    /// Automatic overwrite policy; never prompts.
    pub fn automatic() -> Self {
        Self::new(DuplicatePolicy::Overwrite, Box::new(AutoConfirm(true)))
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Look up `incoming` by normalized name and decide.
    pub async fn resolve(&self, store: &dyn RecordStore, incoming: BuilderRecord) -> Result<Resolution> {
        let key = incoming.normalized_name();
        let Some(stored) = store.find_by_normalized_name(&key).await? else {
            info!(name = %incoming.name, decision = %Decision::Insert, "duplicate check");
            return Ok(Resolution {
                proceed: true,
                existing: None,
                decision: Decision::Insert,
                record: incoming,
            });
        };
        let existing = stored.record;

        if stored.content_hash == incoming.content_hash() {
            info!(name = %incoming.name, decision = %Decision::Unchanged, "duplicate check");
            return Ok(Resolution {
                proceed: true,
                existing: Some(existing),
                decision: Decision::Unchanged,
                record: incoming,
            });
        }

        let (decision, proposed) = decide(&existing, incoming);
        let allowed = match self.policy {
            DuplicatePolicy::Overwrite => true,
            DuplicatePolicy::Confirm => self.confirmer.confirm(&existing, &proposed, decision),
        };
        let decision = if allowed { decision } else { Decision::Declined };

        info!(
            name = %proposed.name,
            decision = %decision,
            policy = ?self.policy,
            existing_richness = existing.richness(),
            incoming_richness = proposed.richness(),
            "duplicate check"
        );

        Ok(Resolution {
            proceed: allowed,
            existing: Some(existing),
            decision,
            record: proposed,
        })
    }
}

/// Richer data wins: an incoming record at least as rich overwrites, a
/// poorer one is merged onto the existing values.
fn decide(existing: &BuilderRecord, incoming: BuilderRecord) -> (Decision, BuilderRecord) {
    if incoming.richness() >= existing.richness() {
        (Decision::Overwrite, incoming)
    } else {
        (Decision::Merge, backfill(incoming, existing))
    }
}

/// Fill every gap in `record` from `existing`.
///
/// Street, city, zip, and coordinates are one location. When the records
/// name different cities the incoming location is kept whole; otherwise any
/// location field taken from `existing` brings its coordinates along.
pub fn backfill(mut record: BuilderRecord, existing: &BuilderRecord) -> BuilderRecord {
    fn gap(slot: &mut Option<String>, from: &Option<String>) -> bool {
        if slot.is_none() && from.is_some() {
            slot.clone_from(from);
            return true;
        }
        false
    }

    let same_place = match (&record.city, &existing.city) {
        (Some(incoming), Some(stored)) => incoming.eq_ignore_ascii_case(stored),
        _ => true,
    };
    if same_place {
        let mut moved = gap(&mut record.address, &existing.address);
        moved |= gap(&mut record.city, &existing.city);
        moved |= gap(&mut record.zip, &existing.zip);
        let missing = record.lat.is_none() || record.lng.is_none();
        if (moved || missing) && existing.lat.is_some() && existing.lng.is_some() {
            record.lat = existing.lat;
            record.lng = existing.lng;
        }
    }

    gap(&mut record.phone, &existing.phone);
    gap(&mut record.email, &existing.email);
    gap(&mut record.description, &existing.description);

    if record.van_types.is_empty() {
        record.van_types.clone_from(&existing.van_types);
    }
    if record.amenities.is_empty() {
        record.amenities.clone_from(&existing.amenities);
    }
    if record.services.is_empty() {
        record.services.clone_from(&existing.services);
    }
    for (platform, url) in &existing.social_media {
        record
            .social_media
            .entry(platform.clone())
            .or_insert_with(|| url.clone());
    }
    if record.photos.len() < existing.photos.len() {
        record.photos.clone_from(&existing.photos);
    }
    record
}
