//! Core pipeline orchestration for vanbuilder.
//!
//! This crate ties together page loading, field extraction, geocoding, CSP
//! validation, duplicate resolution, and persistence into the per-target
//! pipeline, and drives batches of targets through it with bounded retries.

pub mod duplicates;
pub mod input;
pub mod orchestrator;
pub mod pipeline;
pub mod report;

pub use duplicates::{AutoConfirm, Confirmer, Decision, DuplicateResolver, Resolution};
pub use input::{RejectedRow, TargetBatch, parse_targets, read_targets};
pub use orchestrator::{BatchProgress, Orchestrator, SilentProgress, TargetEvent, TargetState};
pub use pipeline::{AttemptLog, AttemptOutcome, Pipeline};
pub use report::{OutcomeCounts, PhotoStats, RunReport, TargetReport};
