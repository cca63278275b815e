//! Application configuration for vanbuilder.
//!
//! User config lives at `~/.vanbuilder/vanbuilder.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VanBuilderError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "vanbuilder.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".vanbuilder";

// ---------------------------------------------------------------------------
// Config structs (matching vanbuilder.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Retry, timeout, and pacing settings.
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Geocoding service settings.
    #[serde(default)]
    pub geocoding: GeocodingConfig,

    /// CSP allow-list handling.
    #[serde(default)]
    pub csp: CspConfig,

    /// Duplicate-name handling.
    #[serde(default)]
    pub duplicates: DuplicatesConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Path of the directory database.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Path of the file holding the `img-src` allow-list.
    #[serde(default = "default_policy_file")]
    pub policy_file: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            policy_file: default_policy_file(),
        }
    }
}

fn default_database_path() -> String {
    "vanbuilder.db".into()
}
fn default_policy_file() -> String {
    "csp-policy.js".into()
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Retries after the first attempt (total attempts = 1 + max_retries).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay before a retry attempt.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Fixed delay between targets.
    #[serde(default = "default_target_delay")]
    pub target_delay_ms: u64,

    /// Main page load timeout.
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,

    /// Shorter timeout used when probing contact/gallery sub-pages.
    #[serde(default = "default_contact_timeout")]
    pub contact_timeout_secs: u64,

    /// Quiet period after the body is read, before extraction starts.
    #[serde(default = "default_settle")]
    pub settle_ms: u64,

    /// Maximum photos kept per record.
    #[serde(default = "default_photo_limit")]
    pub photo_limit: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
            target_delay_ms: default_target_delay(),
            page_timeout_secs: default_page_timeout(),
            contact_timeout_secs: default_contact_timeout(),
            settle_ms: default_settle(),
            photo_limit: default_photo_limit(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    5_000
}
fn default_target_delay() -> u64 {
    2_000
}
fn default_page_timeout() -> u64 {
    30
}
fn default_contact_timeout() -> u64 {
    10
}
fn default_settle() -> u64 {
    500
}
fn default_photo_limit() -> usize {
    8
}

/// `[geocoding]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Geocoding JSON endpoint.
    #[serde(default = "default_geocode_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_geocode_key_env")]
    pub api_key_env: String,

    /// Request timeout.
    #[serde(default = "default_geocode_timeout")]
    pub timeout_secs: u64,

    /// Whether the country centroid is used as the last fallback layer.
    #[serde(default = "default_true")]
    pub country_fallback: bool,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_geocode_endpoint(),
            api_key_env: default_geocode_key_env(),
            timeout_secs: default_geocode_timeout(),
            country_fallback: true,
        }
    }
}

fn default_geocode_endpoint() -> String {
    "https://maps.googleapis.com/maps/api/geocode/json".into()
}
fn default_geocode_key_env() -> String {
    "GOOGLE_MAPS_API_KEY".into()
}
fn default_geocode_timeout() -> u64 {
    10
}
fn default_true() -> bool {
    true
}

/// What to do with photos whose origin is not allow-listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CspMode {
    /// Append the missing origins to the policy store.
    #[default]
    Remediate,
    /// Drop the violating photos and leave the policy untouched.
    Drop,
}

/// `[csp]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CspConfig {
    #[serde(default)]
    pub mode: CspMode,
}

/// How an existing record with the same normalized name is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Decide automatically: richer data wins, gaps are backfilled.
    #[default]
    Overwrite,
    /// Ask an operator before touching an existing record.
    Confirm,
}

/// `[duplicates]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicatesConfig {
    #[serde(default)]
    pub policy: DuplicatePolicy,
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub target_delay: Duration,
    pub page_timeout: Duration,
    pub contact_timeout: Duration,
    pub settle: Duration,
    pub photo_limit: usize,
    pub csp_mode: CspMode,
    pub duplicate_policy: DuplicatePolicy,
}

impl PipelineConfig {
    /// Total attempts per target: the first one plus the retries.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        let p = &config.pipeline;
        Self {
            max_retries: p.max_retries,
            retry_delay: Duration::from_millis(p.retry_delay_ms),
            target_delay: Duration::from_millis(p.target_delay_ms),
            page_timeout: Duration::from_secs(p.page_timeout_secs),
            contact_timeout: Duration::from_secs(p.contact_timeout_secs),
            settle: Duration::from_millis(p.settle_ms),
            photo_limit: p.photo_limit,
            csp_mode: config.csp.mode,
            duplicate_policy: config.duplicates.policy,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.vanbuilder/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| VanBuilderError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.vanbuilder/vanbuilder.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| VanBuilderError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        VanBuilderError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| VanBuilderError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| VanBuilderError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| VanBuilderError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the geocoding API key from the configured env var, if set and non-empty.
pub fn geocoding_api_key(config: &AppConfig) -> Option<String> {
    std::env::var(&config.geocoding.api_key_env)
        .ok()
        .filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("database_path"));
        assert!(toml_str.contains("GOOGLE_MAPS_API_KEY"));
        assert!(toml_str.contains("remediate"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.pipeline.max_retries, 3);
        assert_eq!(parsed.pipeline.photo_limit, 8);
        assert_eq!(parsed.duplicates.policy, DuplicatePolicy::Overwrite);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[pipeline]
max_retries = 1

[csp]
mode = "drop"

[duplicates]
policy = "confirm"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.pipeline.max_retries, 1);
        assert_eq!(config.pipeline.retry_delay_ms, 5_000);
        assert_eq!(config.csp.mode, CspMode::Drop);
        assert_eq!(config.duplicates.policy, DuplicatePolicy::Confirm);
        assert_eq!(config.defaults.policy_file, "csp-policy.js");
    }

    #[test]
    fn pipeline_config_from_app_config() {
        let app = AppConfig::default();
        let pipeline = PipelineConfig::from(&app);
        assert_eq!(pipeline.max_attempts(), 4);
        assert_eq!(pipeline.retry_delay, Duration::from_secs(5));
        assert_eq!(pipeline.page_timeout, Duration::from_secs(30));
        assert_eq!(pipeline.contact_timeout, Duration::from_secs(10));
    }

    #[test]
    fn missing_api_key_is_none() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.geocoding.api_key_env = "VB_TEST_NONEXISTENT_KEY_12345".into();
        assert!(geocoding_api_key(&config).is_none());
    }
}
