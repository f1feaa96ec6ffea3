use crate::services::{
    catalog::{AgeFilterMode, BreedMatch, CatalogConfig},
    statistics::{ReportingTimezone, StatsConfig},
};
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::{env, fmt, str::FromStr};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub media_dir: String,
    pub database_url: String,
    pub page_size: usize,
    pub related_limit: usize,
    pub featured_limit: usize,
    pub timezone: ReportingTimezone,
    pub adopted_visible_by_default: bool,
    pub breed_match: BreedMatch,
    pub age_filter_mode: AgeFilterMode,
    pub age_threshold: u32,
    pub session_ttl_hours: i64,
    pub max_image_bytes: u64,
}

/// One-shot task requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Serve,
    Migrate,
    Seed,
    PromoteStaff(String),
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Pet adoption listing service")]
pub struct Args {
    /// Host to bind to (overrides PETCONNECT_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PETCONNECT_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded pet images are stored (overrides PETCONNECT_MEDIA_DIR)
    #[arg(long)]
    pub media_dir: Option<String>,

    /// Database URL (overrides PETCONNECT_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Pets per catalog page (overrides PETCONNECT_PAGE_SIZE)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Reporting timezone: UTC, local or an offset like +02:00 (overrides PETCONNECT_TIMEZONE)
    #[arg(long)]
    pub timezone: Option<ReportingTimezone>,

    /// List adopted pets unless a request says otherwise (overrides PETCONNECT_ADOPTED_VISIBLE)
    #[arg(long, action = clap::ArgAction::Set)]
    pub adopted_visible_by_default: Option<bool>,

    /// Breed filter semantics: exact or contains (overrides PETCONNECT_BREED_MATCH)
    #[arg(long)]
    pub breed_match: Option<BreedMatch>,

    /// Age filter semantics: bands or numeric (overrides PETCONNECT_AGE_FILTER_MODE)
    #[arg(long)]
    pub age_filter_mode: Option<AgeFilterMode>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,

    /// Replace all pets with the sample catalog and exit
    #[arg(long)]
    pub seed: bool,

    /// Grant the staff role to an existing user and exit
    #[arg(long, value_name = "USERNAME")]
    pub promote_staff: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the requested task.
    pub fn from_env_and_args() -> Result<(Self, Task)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("PETCONNECT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_parse("PETCONNECT_PORT", 8000u16)?;
        let env_media =
            env::var("PETCONNECT_MEDIA_DIR").unwrap_or_else(|_| "./data/media".into());
        let env_db = env::var("PETCONNECT_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/db/petconnect.db".into());
        let env_page_size = env_parse("PETCONNECT_PAGE_SIZE", 9usize)?;
        let env_timezone = env_parse("PETCONNECT_TIMEZONE", ReportingTimezone::Utc)?;
        let env_adopted_visible = env_parse("PETCONNECT_ADOPTED_VISIBLE", false)?;
        let env_breed_match = env_parse("PETCONNECT_BREED_MATCH", BreedMatch::Exact)?;
        let env_age_mode = env_parse("PETCONNECT_AGE_FILTER_MODE", AgeFilterMode::Bands)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            media_dir: args.media_dir.unwrap_or(env_media),
            database_url: args.database_url.unwrap_or(env_db),
            page_size: args.page_size.unwrap_or(env_page_size).max(1),
            related_limit: env_parse("PETCONNECT_RELATED_LIMIT", 3)?,
            featured_limit: env_parse("PETCONNECT_FEATURED_LIMIT", 3)?,
            timezone: args.timezone.unwrap_or(env_timezone),
            adopted_visible_by_default: args
                .adopted_visible_by_default
                .unwrap_or(env_adopted_visible),
            breed_match: args.breed_match.unwrap_or(env_breed_match),
            age_filter_mode: args.age_filter_mode.unwrap_or(env_age_mode),
            age_threshold: env_parse("PETCONNECT_AGE_THRESHOLD", 5)?,
            session_ttl_hours: env_parse("PETCONNECT_SESSION_TTL_HOURS", 24 * 14)?,
            max_image_bytes: env_parse("PETCONNECT_MAX_IMAGE_BYTES", 5 * 1024 * 1024)?,
        };

        let task = if args.migrate {
            Task::Migrate
        } else if args.seed {
            Task::Seed
        } else if let Some(username) = args.promote_staff {
            Task::PromoteStaff(username)
        } else {
            Task::Serve
        };

        Ok((cfg, task))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            page_size: self.page_size,
            related_limit: self.related_limit,
            featured_limit: self.featured_limit,
            adopted_visible_by_default: self.adopted_visible_by_default,
            breed_match: self.breed_match,
            age_filter_mode: self.age_filter_mode,
            age_threshold: self.age_threshold,
        }
    }

    pub fn stats_config(&self) -> StatsConfig {
        StatsConfig {
            timezone: self.timezone.clone(),
            ..StatsConfig::default()
        }
    }
}

/// Read and parse an environment variable, falling back to `default` when unset.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|err| anyhow!("parsing {} value `{}`: {}", key, value, err)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}
