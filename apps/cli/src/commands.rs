//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use tracing::{info, warn};
use url::Url;

use vanbuilder_core::{DuplicateResolver, Orchestrator, Pipeline, read_targets};
use vanbuilder_crawler::HttpPageLoader;
use vanbuilder_csp::{CspEngine, FilePolicyStore, PolicyStore};
use vanbuilder_geocode::{Geocoder, GoogleGeocoder, Resolver};
use vanbuilder_shared::{
    AppConfig, CspMode, DuplicatePolicy, PipelineConfig, geocoding_api_key, init_config,
    load_config, load_config_from,
};
use vanbuilder_storage::Storage;

use crate::progress::{CliProgress, StdinConfirmer};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// VanBuilder: collect camper van builder listings into a local directory.
#[derive(Parser)]
#[command(
    name = "vanbuilder",
    version,
    about = "Collect camper van builder listings from their websites into a local directory database.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.vanbuilder/vanbuilder.toml.
    #[arg(long, global = true, env = "VANBUILDER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum DuplicatesArg {
    Overwrite,
    Confirm,
}

impl From<DuplicatesArg> for DuplicatePolicy {
    fn from(arg: DuplicatesArg) -> Self {
        match arg {
            DuplicatesArg::Overwrite => DuplicatePolicy::Overwrite,
            DuplicatesArg::Confirm => DuplicatePolicy::Confirm,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum CspModeArg {
    Remediate,
    Drop,
}

impl From<CspModeArg> for CspMode {
    fn from(arg: CspModeArg) -> Self {
        match arg {
            CspModeArg::Remediate => CspMode::Remediate,
            CspModeArg::Drop => CspMode::Drop,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Process every target in a CSV file (columns: state, website_url, optional name).
    Run(RunArgs),

    /// Inspect or repair the image CSP allow-list.
    Csp {
        #[command(subcommand)]
        action: CspAction,
    },

    /// List the builders stored in the directory database.
    List {
        /// Database path (defaults to the configured one).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
pub(crate) struct RunArgs {
    /// CSV file of targets.
    pub input: PathBuf,

    /// Database path (defaults to the configured one).
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Policy file holding the img-src allow-list.
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// Retries after the first attempt.
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Delay before each retry, in milliseconds.
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Delay between targets, in milliseconds.
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Maximum photos kept per record.
    #[arg(long)]
    pub photo_limit: Option<usize>,

    /// How an existing record with the same name is handled.
    #[arg(long, value_enum)]
    pub duplicates: Option<DuplicatesArg>,

    /// What to do with photos whose origin is not allow-listed.
    #[arg(long, value_enum)]
    pub csp_mode: Option<CspModeArg>,

    /// Also write the run report as JSON to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Skip the geocoding service and use only the offline layers.
    #[arg(long)]
    pub offline: bool,
}

/// CSP subcommands.
#[derive(Subcommand)]
pub(crate) enum CspAction {
    /// Validate photo URLs and a site URL against the allow-list.
    Check {
        /// Policy file (defaults to the configured one).
        #[arg(long)]
        policy: Option<PathBuf>,

        /// The builder's website.
        #[arg(long)]
        site: String,

        /// Photo URLs to validate.
        photos: Vec<String>,

        /// Append missing origins to the policy file.
        #[arg(long)]
        fix: bool,
    },
    /// Print the allow-list entries.
    Show {
        /// Policy file (defaults to the configured one).
        #[arg(long)]
        policy: Option<PathBuf>,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "vanbuilder=info",
        1 => "vanbuilder=debug",
        _ => "vanbuilder=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Run(args) => cmd_run(&config, args).await,
        Command::Csp { action } => match action {
            CspAction::Check {
                policy,
                site,
                photos,
                fix,
            } => cmd_csp_check(&config, policy.as_deref(), &site, &photos, fix),
            CspAction::Show { policy } => cmd_csp_show(&config, policy.as_deref()),
        },
        Command::List { db } => cmd_list(&config, db.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

/// Merge config file values with CLI overrides.
fn pipeline_config(config: &AppConfig, args: &RunArgs) -> PipelineConfig {
    let mut cfg = PipelineConfig::from(config);
    if let Some(n) = args.max_retries {
        cfg.max_retries = n;
    }
    if let Some(ms) = args.retry_delay_ms {
        cfg.retry_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = args.delay_ms {
        cfg.target_delay = Duration::from_millis(ms);
    }
    if let Some(n) = args.photo_limit {
        cfg.photo_limit = n;
    }
    if let Some(policy) = args.duplicates {
        cfg.duplicate_policy = policy.into();
    }
    if let Some(mode) = args.csp_mode {
        cfg.csp_mode = mode.into();
    }
    cfg
}

fn resolver(config: &AppConfig, offline: bool) -> Result<Resolver> {
    let geo = &config.geocoding;
    if offline {
        return Ok(Resolver::offline(geo.country_fallback));
    }
    match geocoding_api_key(config) {
        Some(key) => {
            let google = GoogleGeocoder::new(&geo.endpoint, key, Duration::from_secs(geo.timeout_secs))?;
            let primary: Box<dyn Geocoder> = Box::new(google);
            Ok(Resolver::new(Some(primary), geo.country_fallback))
        }
        None => {
            warn!(
                env = %geo.api_key_env,
                "no geocoding API key set, using offline fallbacks only"
            );
            Ok(Resolver::offline(geo.country_fallback))
        }
    }
}

async fn cmd_run(config: &AppConfig, args: RunArgs) -> Result<()> {
    let cfg = pipeline_config(config, &args);
    let batch = read_targets(&args.input)?;
    if batch.is_empty() {
        return Err(eyre!("no targets in '{}'", args.input.display()));
    }

    let db_path = args
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.defaults.database_path));
    let policy_path = args
        .policy
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.defaults.policy_file));

    let storage = Storage::open(&db_path).await?;
    let input = args.input.display().to_string();
    let run_id = storage.insert_run(&input).await?;

    info!(
        input = %input,
        targets = batch.targets.len(),
        rejected = batch.rejected.len(),
        db = %db_path.display(),
        policy = %policy_path.display(),
        max_attempts = cfg.max_attempts(),
        "starting run"
    );

    let loader = HttpPageLoader::new(cfg.settle)?;
    let progress = CliProgress::new(batch.targets.len());
    let duplicates = match cfg.duplicate_policy {
        DuplicatePolicy::Overwrite => DuplicateResolver::automatic(),
        DuplicatePolicy::Confirm => DuplicateResolver::new(
            DuplicatePolicy::Confirm,
            Box::new(StdinConfirmer::new(Some(progress.bar()))),
        ),
    };
    let csp = CspEngine::new(Box::new(FilePolicyStore::new(&policy_path)), cfg.csp_mode);

    let pipeline = Pipeline::new(
        &loader,
        &storage,
        resolver(config, args.offline)?,
        csp,
        duplicates,
        cfg,
    );
    let orchestrator = Orchestrator::new(pipeline);
    let report = orchestrator.run_input(&batch, &progress).await;
    progress.finish();

    let json = report.to_json()?;
    storage.finish_run(&run_id, &json).await?;
    if let Some(path) = &args.report {
        std::fs::write(path, &json).map_err(|e| eyre!("cannot write report '{}': {e}", path.display()))?;
    }

    println!();
    print!("{}", report.render_text());
    println!("  Run:    {run_id}");
    println!("  Stored: {} builders in {}", storage.count_builders().await?, db_path.display());
    println!();

    Ok(())
}

fn policy_store(config: &AppConfig, policy: Option<&Path>) -> FilePolicyStore {
    let path = policy
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.defaults.policy_file));
    FilePolicyStore::new(path)
}

fn cmd_csp_check(
    config: &AppConfig,
    policy: Option<&Path>,
    site: &str,
    photos: &[String],
    fix: bool,
) -> Result<()> {
    Url::parse(site).map_err(|e| eyre!("invalid site URL '{site}': {e}"))?;
    let store = policy_store(config, policy);
    let engine = CspEngine::new(Box::new(store), config.csp.mode);

    let urls: Vec<&str> = photos.iter().map(String::as_str).collect();
    let report = engine.validate(&urls, site)?;

    if report.is_clean() {
        println!("  All {} URLs allowed.", urls.len() + 1);
        return Ok(());
    }

    println!("  Violations:");
    for v in &report.violations {
        let kind = if v.site { "site " } else { "photo" };
        println!("    {kind} {}  ({})", v.url, v.origin);
    }
    println!("  Missing origins:");
    for origin in &report.new_origins {
        println!("    {origin}");
    }

    if fix {
        let added = engine.auto_remediate(&report.new_origins)?;
        println!("  Added {} origins to the allow-list.", added.len());
        Ok(())
    } else {
        Err(eyre!("{} origins are not allow-listed", report.new_origins.len()))
    }
}

fn cmd_csp_show(config: &AppConfig, policy: Option<&Path>) -> Result<()> {
    let store = policy_store(config, policy);
    let allow = store.load()?;
    println!("  {} ({} entries)", store.path().display(), allow.len());
    for entry in allow.entries() {
        println!("    {entry}");
    }
    Ok(())
}

async fn cmd_list(config: &AppConfig, db: Option<&Path>) -> Result<()> {
    let path = db
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.defaults.database_path));
    let storage = Storage::open_readonly(&path).await?;
    let builders = storage.list_builders().await?;

    if builders.is_empty() {
        println!("  No builders stored in {}.", path.display());
        return Ok(());
    }

    println!();
    for b in &builders {
        let r = &b.record;
        let place = match &r.city {
            Some(city) => format!("{city}, {}", r.state),
            None => r.state.clone(),
        };
        println!(
            "  {:<32} {:<22} {:<15} {:>2} photos  {}",
            r.name,
            place,
            r.phone.as_deref().unwrap_or("-"),
            r.photos.len(),
            r.website
        );
    }
    println!();
    println!("  {} builders", builders.len());
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}
