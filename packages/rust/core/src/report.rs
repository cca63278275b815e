//! Run report: per-target outcomes, counts, and photo statistics.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use vanbuilder_shared::{Accuracy, ProcessingOutcome, Result, VanBuilderError};

use crate::duplicates::Decision;
use crate::input::RejectedRow;

/// Terminal detail for one target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub url: String,
    pub state: String,
    pub name: Option<String>,
    pub outcome: ProcessingOutcome,
    pub attempts: u32,
    /// Why the target did not succeed cleanly. Always set for partial, failed, and skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub photos: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub origins_added: Vec<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub photos_dropped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csp_error: Option<String>,
    pub accuracy: Option<Accuracy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub success: usize,
    pub partial: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl OutcomeCounts {
    pub fn total(&self) -> usize {
        self.success + self.partial + self.skipped + self.failed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PhotoStats {
    /// Photos across persisted records.
    pub total: usize,
    /// Persisted records with at least one photo.
    pub records_with_photos: usize,
    pub records_without_photos: usize,
    pub average_per_record: f64,
    pub max_per_record: usize,
    pub origins_added: usize,
    pub dropped: usize,
}

/// Summary of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub targets: Vec<TargetReport>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            targets: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: TargetReport) {
        self.targets.push(entry);
    }

    /// Record an input row that never became a target. It counts as failed
    /// with zero attempts.
    pub fn push_rejected(&mut self, row: &RejectedRow) {
        self.targets.push(TargetReport {
            url: row.url.clone(),
            state: row.state.clone(),
            name: None,
            outcome: ProcessingOutcome::Failed,
            attempts: 0,
            reason: Some(format!("invalid input on line {}: {}", row.line, row.reason)),
            photos: 0,
            origins_added: Vec::new(),
            photos_dropped: 0,
            csp_error: None,
            accuracy: None,
            decision: None,
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for t in &self.targets {
            match t.outcome {
                ProcessingOutcome::Success => counts.success += 1,
                ProcessingOutcome::Partial => counts.partial += 1,
                ProcessingOutcome::Skipped => counts.skipped += 1,
                ProcessingOutcome::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Statistics over targets whose record was persisted (success or partial).
    pub fn photo_stats(&self) -> PhotoStats {
        let persisted: Vec<&TargetReport> = self
            .targets
            .iter()
            .filter(|t| matches!(t.outcome, ProcessingOutcome::Success | ProcessingOutcome::Partial))
            .collect();

        let total: usize = persisted.iter().map(|t| t.photos).sum();
        let with = persisted.iter().filter(|t| t.photos > 0).count();
        PhotoStats {
            total,
            records_with_photos: with,
            records_without_photos: persisted.len() - with,
            average_per_record: if persisted.is_empty() {
                0.0
            } else {
                total as f64 / persisted.len() as f64
            },
            max_per_record: persisted.iter().map(|t| t.photos).max().unwrap_or(0),
            origins_added: self.targets.iter().map(|t| t.origins_added.len()).sum(),
            dropped: self.targets.iter().map(|t| t.photos_dropped).sum(),
        }
    }

    /// Serialized report, with counts and photo statistics included.
    pub fn to_json(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Full<'a> {
            #[serde(flatten)]
            report: &'a RunReport,
            counts: OutcomeCounts,
            photos: PhotoStats,
        }
        serde_json::to_string_pretty(&Full {
            report: self,
            counts: self.counts(),
            photos: self.photo_stats(),
        })
        .map_err(|e| VanBuilderError::validation(format!("report serialization failed: {e}")))
    }

    /// Human-readable summary.
    pub fn render_text(&self) -> String {
        let counts = self.counts();
        let photos = self.photo_stats();
        let mut out = String::new();

        let _ = writeln!(out, "Run report ({} targets)", counts.total());
        let _ = writeln!(
            out,
            "  success: {}  partial: {}  skipped: {}  failed: {}",
            counts.success, counts.partial, counts.skipped, counts.failed
        );
        let _ = writeln!(
            out,
            "  photos: {} total, {:.1} avg, {} max, {} records without photos",
            photos.total, photos.average_per_record, photos.max_per_record, photos.records_without_photos
        );
        if photos.origins_added > 0 || photos.dropped > 0 {
            let _ = writeln!(
                out,
                "  csp: {} origins added, {} photos dropped",
                photos.origins_added, photos.dropped
            );
        }
        let _ = writeln!(out);

        for t in &self.targets {
            let name = t.name.as_deref().unwrap_or("-");
            let accuracy = t.accuracy.map_or("-", |a| a.as_str());
            let _ = writeln!(
                out,
                "  [{:<7}] {} ({}) {} attempts={} photos={} geo={}",
                t.outcome.as_str(),
                name,
                t.state,
                t.url,
                t.attempts,
                t.photos,
                accuracy
            );
            if let Some(reason) = &t.reason {
                let _ = writeln!(out, "            reason: {reason}");
            }
            if let Some(err) = &t.csp_error {
                let _ = writeln!(out, "            csp: {err}");
            }
        }
        out
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
