//! Dashboard statistics.
//!
//! Every call reads the whole pet collection and recomputes from scratch;
//! nothing is cached between requests.

use crate::{
    errors::ServiceResult,
    models::pet::Pet,
    services::{accounts::AccountService, media::MediaService, pet_store::PetStore},
};
use chrono::{DateTime, Datelike, FixedOffset, Local, TimeZone, Utc};
use serde::Serialize;
use std::{collections::HashMap, fmt, str::FromStr};

pub const NO_BREED: &str = "N/A";

/// Timezone used to decide where "this month" starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportingTimezone {
    Utc,
    /// The server's local zone.
    Local,
    Fixed(FixedOffset),
}

impl ReportingTimezone {
    /// First instant of the calendar month containing `now`, in this zone.
    pub fn month_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            ReportingTimezone::Utc => month_start_in(now, &Utc),
            ReportingTimezone::Local => month_start_in(now, &Local),
            ReportingTimezone::Fixed(offset) => month_start_in(now, offset),
        }
    }
}

impl FromStr for ReportingTimezone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("utc") || s == "Z" {
            return Ok(ReportingTimezone::Utc);
        }
        if s.eq_ignore_ascii_case("local") {
            return Ok(ReportingTimezone::Local);
        }
        s.parse::<FixedOffset>()
            .map(ReportingTimezone::Fixed)
            .map_err(|_| format!("unknown timezone `{s}` (expected UTC, local or ±HH:MM)"))
    }
}

impl fmt::Display for ReportingTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportingTimezone::Utc => write!(f, "UTC"),
            ReportingTimezone::Local => write!(f, "local"),
            ReportingTimezone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

fn month_start_in<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let local = now.with_timezone(tz);
    local
        .date_naive()
        .with_day(1)
        .and_then(|first| first.and_hms_opt(0, 0, 0))
        .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or(now)
}

#[derive(Clone, Debug)]
pub struct StatsConfig {
    pub timezone: ReportingTimezone,
    /// Size of the "recently added" list.
    pub recent_limit: usize,
    /// Number of breeds in the breakdown table.
    pub breed_stats_limit: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            timezone: ReportingTimezone::Utc,
            recent_limit: 10,
            breed_stats_limit: 5,
        }
    }
}

/// Per-breed adoption counts.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BreedStat {
    pub breed: String,
    pub total: u64,
    pub available: u64,
    pub adopted: u64,
}

/// Aggregates derived purely from the pet collection.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PetStats {
    pub total_pets: u64,
    pub available_pets: u64,
    pub adopted_pets: u64,
    /// Percentage with one decimal; 0 for an empty collection.
    pub adoption_rate: f64,
    pub recent_pets: Vec<Pet>,
    pub popular_breed: String,
    pub average_age: f64,
    pub pets_this_month: u64,
    pub breed_stats: Vec<BreedStat>,
}

impl PetStats {
    /// Compute every pet-derived metric in one pass over `pets`.
    pub fn compute(pets: &[Pet], month_start: DateTime<Utc>, config: &StatsConfig) -> Self {
        let total_pets = pets.len() as u64;
        let adopted_pets = pets.iter().filter(|p| p.adopted).count() as u64;
        let available_pets = total_pets - adopted_pets;
        let pets_this_month = pets.iter().filter(|p| p.created_at >= month_start).count() as u64;
        let age_sum: u64 = pets.iter().map(|p| u64::from(p.age)).sum();

        let mut recent_pets = pets.to_vec();
        recent_pets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        recent_pets.truncate(config.recent_limit);

        let breed_stats = breed_breakdown(pets);
        let popular_breed = breed_stats
            .first()
            .map(|stat| stat.breed.clone())
            .unwrap_or_else(|| NO_BREED.to_string());

        Self {
            total_pets,
            available_pets,
            adopted_pets,
            adoption_rate: percentage(adopted_pets, total_pets),
            recent_pets,
            popular_breed,
            average_age: mean(age_sum, total_pets),
            pets_this_month,
            breed_stats: breed_stats
                .into_iter()
                .take(config.breed_stats_limit)
                .collect(),
        }
    }
}

/// Everything the staff dashboard shows.
#[derive(Serialize, Debug, Clone)]
pub struct DashboardStats {
    #[serde(flatten)]
    pub pets: PetStats,
    pub total_users: u64,
    pub media_files_count: u64,
    pub app_version: &'static str,
    pub timezone: String,
}

#[derive(Clone)]
pub struct StatisticsService {
    store: PetStore,
    accounts: AccountService,
    media: MediaService,
    config: StatsConfig,
}

impl StatisticsService {
    pub fn new(
        store: PetStore,
        accounts: AccountService,
        media: MediaService,
        config: StatsConfig,
    ) -> Self {
        Self {
            store,
            accounts,
            media,
            config,
        }
    }

    pub async fn dashboard(&self, now: DateTime<Utc>) -> ServiceResult<DashboardStats> {
        let pets = self.store.all().await?;
        let month_start = self.config.timezone.month_start(now);
        let stats = PetStats::compute(&pets, month_start, &self.config);

        Ok(DashboardStats {
            pets: stats,
            total_users: self.accounts.count_users().await?,
            media_files_count: self.media.count_pet_images().await?,
            app_version: env!("CARGO_PKG_VERSION"),
            timezone: self.config.timezone.to_string(),
        })
    }
}

/// Breeds by total descending, then name ascending.
fn breed_breakdown(pets: &[Pet]) -> Vec<BreedStat> {
    let mut by_breed: HashMap<&str, BreedStat> = HashMap::new();
    for pet in pets {
        let stat = by_breed.entry(pet.breed.as_str()).or_insert_with(|| BreedStat {
            breed: pet.breed.clone(),
            total: 0,
            available: 0,
            adopted: 0,
        });
        stat.total += 1;
        if pet.adopted {
            stat.adopted += 1;
        } else {
            stat.available += 1;
        }
    }

    let mut stats: Vec<BreedStat> = by_breed.into_values().collect();
    stats.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.breed.cmp(&b.breed)));
    stats
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round1(part as f64 / whole as f64 * 100.0)
}

fn mean(sum: u64, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    round1(sum as f64 / count as f64)
}
