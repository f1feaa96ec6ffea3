//! Catalog queries: the public adoption listing, pet detail with related
//! pets, and the landing page summary.
//!
//! Request parameters arrive as raw strings. Anything blank or unparseable is
//! treated as "no constraint" so a malformed link still renders a listing.

use crate::{
    errors::ServiceResult,
    models::pet::Pet,
    services::pet_store::{AgeFilter, BreedFilter, PetFilter, PetOrder, PetStore, Window},
};
use serde::Serialize;
use std::{num::IntErrorKind, str::FromStr};
use tracing::debug;

/// Breed filter semantics for a deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreedMatch {
    Exact,
    Contains,
}

impl FromStr for BreedMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(BreedMatch::Exact),
            "contains" => Ok(BreedMatch::Contains),
            other => Err(format!("unknown breed match `{other}` (expected exact or contains)")),
        }
    }
}

/// Age filter semantics for a deployment.
///
/// - `Bands`: `young`, `adult`, `senior`.
/// - `Numeric`: `N` is an exact age, except that the configured threshold
///   means "at least N"; `N+` always means "at least N".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgeFilterMode {
    Bands,
    Numeric,
}

impl FromStr for AgeFilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bands" => Ok(AgeFilterMode::Bands),
            "numeric" => Ok(AgeFilterMode::Numeric),
            other => Err(format!("unknown age filter mode `{other}` (expected bands or numeric)")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    /// Pets per listing page.
    pub page_size: usize,
    /// Maximum related pets on a detail page.
    pub related_limit: usize,
    /// Pets featured on the landing page.
    pub featured_limit: usize,
    pub adopted_visible_by_default: bool,
    pub breed_match: BreedMatch,
    pub age_filter_mode: AgeFilterMode,
    pub age_threshold: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: 9,
            related_limit: 3,
            featured_limit: 3,
            adopted_visible_by_default: false,
            breed_match: BreedMatch::Exact,
            age_filter_mode: AgeFilterMode::Bands,
            age_threshold: 5,
        }
    }
}

/// Query string of `GET /adopt`, kept as text so parsing never rejects a request.
#[derive(Debug, Default, Clone)]
pub struct RawCatalogQuery {
    pub search: Option<String>,
    pub breed: Option<String>,
    pub age: Option<String>,
    pub include_adopted: Option<String>,
    pub page: Option<String>,
}

impl RawCatalogQuery {
    /// Fold decoded query pairs. A repeated key keeps its last value and
    /// unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "search" => &mut raw.search,
                "breed" => &mut raw.breed,
                "age" => &mut raw.age,
                "include_adopted" => &mut raw.include_adopted,
                "page" => &mut raw.page,
                _ => continue,
            };
            *slot = Some(value.into());
        }
        raw
    }
}

/// A parsed listing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogRequest {
    pub search: Option<String>,
    pub breed: Option<String>,
    pub age: Option<AgeFilter>,
    pub include_adopted: bool,
    /// 1-indexed; clamped against the result size when the page is built.
    pub page: usize,
}

impl CatalogRequest {
    pub fn from_query(raw: &RawCatalogQuery, config: &CatalogConfig) -> Self {
        Self {
            search: non_blank(raw.search.as_deref()),
            breed: non_blank(raw.breed.as_deref()),
            age: raw
                .age
                .as_deref()
                .and_then(|age| parse_age(age, config.age_filter_mode, config.age_threshold)),
            include_adopted: raw
                .include_adopted
                .as_deref()
                .and_then(parse_bool)
                .unwrap_or(config.adopted_visible_by_default),
            page: raw.page.as_deref().map(parse_page).unwrap_or(1),
        }
    }
}

/// One page of the listing plus what a filter form needs.
#[derive(Serialize, Debug, Clone)]
pub struct PetPage {
    pub items: Vec<Pet>,
    pub page_number: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_count: u64,
    pub has_previous: bool,
    pub has_next: bool,
    /// Breeds present in the same adoption-status scope, sorted.
    pub distinct_breeds: Vec<String>,
    pub total_available: u64,
}

#[derive(Serialize, Debug, Clone)]
pub struct PetDetail {
    pub pet: Pet,
    pub related_pets: Vec<Pet>,
}

#[derive(Serialize, Debug, Clone)]
pub struct HomeSummary {
    pub featured_pets: Vec<Pet>,
    pub total_pets: u64,
    pub available_pets: u64,
    pub adopted_pets: u64,
}

#[derive(Clone)]
pub struct CatalogService {
    store: PetStore,
    config: CatalogConfig,
}

impl CatalogService {
    pub fn new(store: PetStore, config: CatalogConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Build the pet filter for a request. Constraints are ANDed.
    pub fn filter_for(&self, request: &CatalogRequest) -> PetFilter {
        let breed = request.breed.clone().map(|breed| match self.config.breed_match {
            BreedMatch::Exact => BreedFilter::Exact(breed),
            BreedMatch::Contains => BreedFilter::Contains(breed),
        });

        PetFilter {
            adopted: if request.include_adopted { None } else { Some(false) },
            search: request.search.clone(),
            breed,
            age: request.age,
            exclude_id: None,
        }
    }

    /// Filtered, newest-first, paginated listing.
    pub async fn list(&self, request: &CatalogRequest) -> ServiceResult<PetPage> {
        let filter = self.filter_for(request);
        let page_size = self.config.page_size.max(1);

        let total_count = self.store.count(&filter).await?;
        let (page_number, total_pages) = clamp_page(request.page, total_count, page_size);
        let window = Window {
            limit: page_size,
            offset: (page_number - 1) * page_size,
        };
        let items = self
            .store
            .find(&filter, PetOrder::NewestFirst, Some(window))
            .await?;
        let distinct_breeds = self.store.distinct_breeds(filter.adopted).await?;
        let total_available = self.store.count(&PetFilter::available()).await?;

        debug!(
            ?filter,
            total_count, page_number, total_pages, "built catalog page"
        );

        Ok(PetPage {
            items,
            page_number,
            page_size,
            total_pages,
            total_count,
            has_previous: page_number > 1,
            has_next: page_number < total_pages,
            distinct_breeds,
            total_available,
        })
    }

    /// Other available pets of exactly the same breed, newest first.
    pub async fn related(&self, pet: &Pet) -> ServiceResult<Vec<Pet>> {
        let filter = PetFilter {
            adopted: Some(false),
            breed: Some(BreedFilter::Exact(pet.breed.clone())),
            exclude_id: Some(pet.id),
            ..PetFilter::default()
        };
        let window = Window {
            limit: self.config.related_limit,
            offset: 0,
        };
        self.store
            .find(&filter, PetOrder::NewestFirst, Some(window))
            .await
    }

    pub async fn detail(&self, id: i64) -> ServiceResult<PetDetail> {
        let pet = self.store.get_by_id(id).await?;
        let related_pets = self.related(&pet).await?;
        Ok(PetDetail { pet, related_pets })
    }

    /// Newest available pets plus headline counts.
    pub async fn home(&self) -> ServiceResult<HomeSummary> {
        let window = Window {
            limit: self.config.featured_limit,
            offset: 0,
        };
        let featured_pets = self
            .store
            .find(&PetFilter::available(), PetOrder::NewestFirst, Some(window))
            .await?;
        let total_pets = self.store.count(&PetFilter::default()).await?;
        let available_pets = self.store.count(&PetFilter::available()).await?;

        Ok(HomeSummary {
            featured_pets,
            total_pets,
            available_pets,
            adopted_pets: total_pets.saturating_sub(available_pets),
        })
    }
}

/// Clamp a requested page into `1..=total_pages`. An empty result still has
/// one (empty) page.
pub fn clamp_page(requested: usize, total_count: u64, page_size: usize) -> (usize, usize) {
    let page_size = page_size.max(1) as u64;
    let total_pages = total_count.div_ceil(page_size).max(1) as usize;
    (requested.clamp(1, total_pages), total_pages)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_age(value: &str, mode: AgeFilterMode, threshold: u32) -> Option<AgeFilter> {
    let value = value.trim().to_ascii_lowercase();
    match mode {
        AgeFilterMode::Bands => match value.as_str() {
            "young" => Some(AgeFilter::Young),
            "adult" => Some(AgeFilter::Adult),
            "senior" => Some(AgeFilter::Senior),
            _ => None,
        },
        AgeFilterMode::Numeric => {
            if let Some(min) = value.strip_suffix('+') {
                return min.trim().parse().ok().map(AgeFilter::AtLeast);
            }
            let age: u32 = value.parse().ok()?;
            if age == threshold {
                Some(AgeFilter::AtLeast(age))
            } else {
                Some(AgeFilter::Exact(age))
            }
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Numbers too large to represent still mean "past the end" and clamp to
/// the last page.
fn parse_page(value: &str) -> usize {
    match value.trim().parse::<i64>() {
        Ok(page) if page < 1 => 1,
        Ok(page) => usize::try_from(page).unwrap_or(usize::MAX),
        Err(err) if *err.kind() == IntErrorKind::PosOverflow => usize::MAX,
        Err(_) => 1,
    }
}
