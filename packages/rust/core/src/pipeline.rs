//! One full pipeline attempt for one target:
//! load → extract → contact page → geocode → gallery photos → CSP → duplicates → persist.

use tracing::{debug, info, instrument};

use vanbuilder_crawler::{PageHandle, PageLoader, discover_gallery_links, find_contact_page};
use vanbuilder_csp::CspEngine;
use vanbuilder_extract::name::name_from_host;
use vanbuilder_extract::{ExtractContext, ExtractedFields, FieldExtractors, merge_photos};
use vanbuilder_geocode::{AddressQuery, Resolver};
use vanbuilder_shared::{Accuracy, BuilderRecord, PipelineConfig, Result, Target, VanBuilderError};
use vanbuilder_storage::RecordStore;

use crate::duplicates::{Decision, DuplicateResolver};

/// Gallery sub-pages visited when the main page is short of photos.
const GALLERY_PAGE_LIMIT: usize = 3;

/// What an attempt learned, kept across a failure so the orchestrator can
/// partial-save and report.
#[derive(Debug, Clone, Default)]
pub struct AttemptLog {
    /// Latest best-effort record. Only set once a page was loaded and a
    /// business name was extracted from it (or supplied by the caller).
    pub draft: Option<BuilderRecord>,
    pub accuracy: Option<Accuracy>,
    pub origins_added: Vec<String>,
    pub photos_dropped: usize,
    pub csp_error: Option<String>,
}

impl AttemptLog {
    fn record(&mut self, draft: &BuilderRecord, name: &ResolvedName) {
        if name.extracted {
            self.draft = Some(draft.clone());
        }
    }
}

/// The record's name and where it came from.
struct ResolvedName {
    value: String,
    /// From the page or the caller rather than derived from the host.
    extracted: bool,
}

/// Result of an attempt that did not fail.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// The record went through the duplicate check and (unless unchanged) was written.
    Saved { record: BuilderRecord, decision: Decision },
    /// The duplicate policy refused to overwrite an existing record.
    Declined { record: BuilderRecord },
}

/// Everything one attempt needs. Page loads and record writes go through
/// borrowed collaborators so callers keep ownership of them.
pub struct Pipeline<'a> {
    loader: &'a dyn PageLoader,
    store: &'a dyn RecordStore,
    extractors: FieldExtractors,
    resolver: Resolver,
    csp: CspEngine,
    duplicates: DuplicateResolver,
    config: PipelineConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        loader: &'a dyn PageLoader,
        store: &'a dyn RecordStore,
        resolver: Resolver,
        csp: CspEngine,
        duplicates: DuplicateResolver,
        config: PipelineConfig,
    ) -> Self {
        Self {
            loader,
            store,
            extractors: FieldExtractors::new(),
            resolver,
            csp,
            duplicates,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one attempt from the page load onwards. Progress is written to
    /// `log` as it happens so a later failure still leaves a draft behind.
    #[instrument(skip_all, fields(url = %target.url))]
    pub async fn attempt(&self, target: &Target, log: &mut AttemptLog) -> Result<AttemptOutcome> {
        let cfg = &self.config;
        let page = self.loader.load(&target.url, cfg.page_timeout).await?;

        let ctx = ExtractContext::new(target.state.clone())
            .with_known_name(target.known_name.clone())
            .with_photo_limit(cfg.photo_limit);
        let mut fields = self.extractors.extract_all(&page, &ctx);
        let name = resolve_name(&fields, target)?;
        log.record(&draft(&fields, &name, target), &name);

        // First geocode from the main page alone.
        let first = self.resolver.resolve(&query_for(&fields, target)).await;

        if fields.needs_contact_page() {
            let contact = find_contact_page(self.loader, &target.url, cfg.contact_timeout, |p| {
                self.extractors.extract_contact(p, &ctx).has_contact_fields()
            })
            .await;
            if let Some(contact) = contact {
                info!(url = %contact.url(), "merging contact page fields");
                fields.merge_contact(self.extractors.extract_contact(&contact, &ctx));
                log.record(&draft(&fields, &name, target), &name);
            }
        }

        // Address fields may have changed; coordinates must follow them.
        let resolution = self.resolver.refresh(&first, &query_for(&fields, target)).await;
        log.accuracy = resolution.result.as_ref().map(|r| r.accuracy);

        if fields.photos.len() < cfg.photo_limit {
            self.top_up_photos(&page, &mut fields).await;
        }

        let mut record = fields.into_record(name.value.clone(), target.url.as_str(), &target.state);
        record.set_coordinates(resolution.result.as_ref());
        log.record(&record, &name);

        let csp = self.csp.check(std::mem::take(&mut record.photos), target.url.as_str());
        record.photos = csp.photos;
        log.origins_added = csp.added;
        log.photos_dropped = csp.dropped;
        log.csp_error = csp.error;
        log.record(&record, &name);

        self.persist(record).await
    }

    /// Persist a draft left by a failed attempt, through the same duplicate check.
    pub async fn save_partial(&self, draft: BuilderRecord) -> Result<AttemptOutcome> {
        self.persist(draft).await
    }

    async fn persist(&self, record: BuilderRecord) -> Result<AttemptOutcome> {
        let resolution = self.duplicates.resolve(self.store, record).await?;
        if !resolution.proceed {
            return Ok(AttemptOutcome::Declined {
                record: resolution.record,
            });
        }
        if resolution.needs_write() {
            self.store.upsert(&resolution.record).await?;
        }
        Ok(AttemptOutcome::Saved {
            record: resolution.record,
            decision: resolution.decision,
        })
    }

    /// Fill the photo set from gallery sub-pages. Sub-page failures only cost photos.
    async fn top_up_photos(&self, page: &dyn PageHandle, fields: &mut ExtractedFields) {
        let limit = self.config.photo_limit;
        for link in discover_gallery_links(page, GALLERY_PAGE_LIMIT) {
            if fields.photos.len() >= limit {
                break;
            }
            match self.loader.load(&link, self.config.contact_timeout).await {
                Ok(gallery) => {
                    let more = vanbuilder_extract::photos::extract_photos(&gallery, limit);
                    let before = fields.photos.len();
                    fields.photos = merge_photos(std::mem::take(&mut fields.photos), more, limit);
                    debug!(url = %link, added = fields.photos.len() - before, "gallery photos merged");
                }
                Err(e) => debug!(url = %link, error = %e, "gallery page failed"),
            }
        }
    }
}

/// Extracted name, else one derived from the host.
fn resolve_name(fields: &ExtractedFields, target: &Target) -> Result<ResolvedName> {
    if let Some(name) = &fields.name {
        return Ok(ResolvedName {
            value: name.clone(),
            extracted: true,
        });
    }
    let host = target
        .url
        .host_str()
        .ok_or_else(|| VanBuilderError::validation(format!("{}: no host to name the record", target.url)))?;
    debug!(host, "no business name on the page, naming the record after its host");
    Ok(ResolvedName {
        value: name_from_host(host).unwrap_or_else(|| host.to_string()),
        extracted: false,
    })
}

fn draft(fields: &ExtractedFields, name: &ResolvedName, target: &Target) -> BuilderRecord {
    fields
        .clone()
        .into_record(name.value.clone(), target.url.as_str(), &target.state)
}

fn query_for(fields: &ExtractedFields, target: &Target) -> AddressQuery {
    AddressQuery::new(fields.address.clone(), fields.city.clone(), target.state.clone())
}
