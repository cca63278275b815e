//! Shared types, error model, and configuration for vanbuilder.
//!
//! This crate is the foundation depended on by all other vanbuilder crates.
//! It provides:
//! - [`VanBuilderError`]: the unified error type
//! - Domain types ([`Target`], [`BuilderRecord`], [`PhotoAsset`], [`GeocodeResult`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)
//! - [`places`]: curated state/city tables

pub mod config;
pub mod error;
pub mod places;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CspConfig, CspMode, DefaultsConfig, DuplicatePolicy, DuplicatesConfig,
    GeocodingConfig, PipelineConfig, PipelineSection, config_dir, config_file_path,
    geocoding_api_key, init_config, load_config, load_config_from,
};
pub use error::{Result, VanBuilderError};
pub use types::{
    Accuracy, BuilderRecord, GeocodeResult, PhotoAsset, ProcessingOutcome, Target,
    normalize_name_key,
};
