//! Batch input: a CSV file with `state`, `website_url`, and optional `name`.

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use vanbuilder_shared::places;
use vanbuilder_shared::{Result, Target, VanBuilderError};

/// An input row that could not become a [`Target`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    /// 1-based line in the input file; the header is line 1.
    pub line: usize,
    /// Raw `state` cell, empty when the row was unreadable.
    pub state: String,
    /// Raw `website_url` cell, empty when the row was unreadable.
    pub url: String,
    pub reason: String,
}

/// Parsed input: the valid targets plus every rejected row.
#[derive(Debug, Clone, Default)]
pub struct TargetBatch {
    pub targets: Vec<Target>,
    pub rejected: Vec<RejectedRow>,
}

impl TargetBatch {
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty() && self.rejected.is_empty()
    }
}

/// Read targets from a CSV file.
pub fn read_targets(path: &Path) -> Result<TargetBatch> {
    let text = std::fs::read_to_string(path).map_err(|e| VanBuilderError::io(path, e))?;
    let batch = parse_targets(&text)?;
    info!(
        path = %path.display(),
        targets = batch.targets.len(),
        rejected = batch.rejected.len(),
        "input loaded"
    );
    Ok(batch)
}

/// Parse targets from CSV text. Invalid rows are kept as [`RejectedRow`]s
/// for the run report; a missing required column is an error.
pub fn parse_targets(text: &str) -> Result<TargetBatch> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| VanBuilderError::input(format!("unreadable header row: {e}")))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
    };
    let state_col =
        column("state").ok_or_else(|| VanBuilderError::input("missing required column: state"))?;
    let url_col = column("website_url")
        .ok_or_else(|| VanBuilderError::input("missing required column: website_url"))?;
    let name_col = column("name");

    let mut batch = TargetBatch::default();
    for (i, row) in reader.records().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let mut reject = |state: &str, url: &str, reason: String| {
            warn!(line, state, url, reason = %reason, "input row rejected");
            batch.rejected.push(RejectedRow {
                line,
                state: state.to_string(),
                url: url.to_string(),
                reason,
            });
        };

        let row = match row {
            Ok(row) => row,
            Err(e) => {
                reject("", "", format!("unreadable row: {e}"));
                continue;
            }
        };

        let state = row.get(state_col).unwrap_or_default();
        let raw_url = row.get(url_col).unwrap_or_default();
        if state.is_empty() && raw_url.is_empty() {
            continue;
        }

        let Some(code) = normalize_state(state) else {
            reject(state, raw_url, format!("unknown state {state:?}"));
            continue;
        };
        let Some(url) = normalize_url(raw_url) else {
            reject(state, raw_url, format!("invalid website_url {raw_url:?}"));
            continue;
        };
        let known_name = name_col
            .and_then(|c| row.get(c))
            .map(str::to_string);

        batch.targets.push(Target::new(code, url, known_name));
    }
    Ok(batch)
}

/// Two-letter code for a state code or full name.
fn normalize_state(raw: &str) -> Option<&'static str> {
    places::find_state(raw).map(|s| s.code)
}

/// Parse a website URL, adding `https://` when the scheme is missing.
fn normalize_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };
    let url = Url::parse(&candidate).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Some(url),
        _ => None,
    }
}
