//! src/services/pet_store.rs
//!
//! PetStore: the durable pet collection, backed by SQLite. Every mutation is
//! a single statement (or one explicit transaction), so callers never observe
//! partial writes. Listings are built with `QueryBuilder` from a `PetFilter`.

use crate::{
    errors::{ServiceError, ServiceResult},
    models::pet::{Pet, PetFields},
};
use chrono::{DateTime, Utc};
use sqlx::{Executor, QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use tracing::debug;

const PET_COLUMNS: &str =
    "id, name, breed, age, description, adopted, image, created_at, updated_at";

/// How a breed constraint is compared against the stored value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BreedFilter {
    Exact(String),
    Contains(String),
}

/// Age constraint. The three bands partition all ages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgeFilter {
    /// age <= 2
    Young,
    /// 2 < age <= 7
    Adult,
    /// age > 7
    Senior,
    Exact(u32),
    AtLeast(u32),
}

impl AgeFilter {
    #[cfg(test)]
    pub fn matches(&self, age: u32) -> bool {
        match *self {
            AgeFilter::Young => age <= 2,
            AgeFilter::Adult => age > 2 && age <= 7,
            AgeFilter::Senior => age > 7,
            AgeFilter::Exact(n) => age == n,
            AgeFilter::AtLeast(n) => age >= n,
        }
    }
}

/// Conjunction of optional constraints over the pet collection.
///
/// `search` matches when any of name, breed or description contains it,
/// ignoring ASCII case.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PetFilter {
    pub adopted: Option<bool>,
    pub search: Option<String>,
    pub breed: Option<BreedFilter>,
    pub age: Option<AgeFilter>,
    pub exclude_id: Option<i64>,
}

impl PetFilter {
    /// Only pets still waiting for a home.
    pub fn available() -> Self {
        Self {
            adopted: Some(false),
            ..Self::default()
        }
    }

    /// In-memory mirror of the SQL predicate.
    #[cfg(test)]
    pub fn matches(&self, pet: &Pet) -> bool {
        if self.adopted.is_some_and(|adopted| pet.adopted != adopted) {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_ascii_lowercase();
            let hit = [&pet.name, &pet.breed, &pet.description]
                .iter()
                .any(|field| field.to_ascii_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        match &self.breed {
            Some(BreedFilter::Exact(breed)) if &pet.breed != breed => return false,
            Some(BreedFilter::Contains(part))
                if !pet
                    .breed
                    .to_ascii_lowercase()
                    .contains(&part.to_ascii_lowercase()) =>
            {
                return false;
            }
            _ => {}
        }
        if self.age.is_some_and(|age| !age.matches(pet.age)) {
            return false;
        }
        self.exclude_id != Some(pet.id)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PetOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl PetOrder {
    fn sql(self) -> &'static str {
        match self {
            PetOrder::NewestFirst => " ORDER BY created_at DESC, id DESC",
            PetOrder::OldestFirst => " ORDER BY created_at ASC, id ASC",
        }
    }
}

/// LIMIT/OFFSET slice of a listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub limit: usize,
    pub offset: usize,
}

#[derive(Clone)]
pub struct PetStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl PetStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Insert a new pet; `created_at` and `updated_at` are both set to now.
    pub async fn create(&self, fields: &PetFields) -> ServiceResult<Pet> {
        let pet = insert_pet(&*self.db, fields, Utc::now()).await?;
        debug!(id = pet.id, "created pet {}", pet);
        Ok(pet)
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<Pet> {
        sqlx::query_as::<_, Pet>(&format!("SELECT {PET_COLUMNS} FROM pets WHERE id = ?"))
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or(ServiceError::PetNotFound(id))
    }

    /// Replace every editable field of an existing pet.
    pub async fn update(&self, id: i64, fields: &PetFields) -> ServiceResult<Pet> {
        sqlx::query_as::<_, Pet>(&format!(
            "UPDATE pets SET name = ?, breed = ?, age = ?, description = ?, adopted = ?,
                    updated_at = ?
             WHERE id = ?
             RETURNING {PET_COLUMNS}"
        ))
        .bind(&fields.name)
        .bind(&fields.breed)
        .bind(fields.age)
        .bind(&fields.description)
        .bind(fields.adopted)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(ServiceError::PetNotFound(id))
    }

    /// Point the pet at a new image path (or clear it).
    pub async fn set_image(&self, id: i64, image: Option<&str>) -> ServiceResult<Pet> {
        sqlx::query_as::<_, Pet>(&format!(
            "UPDATE pets SET image = ?, updated_at = ? WHERE id = ? RETURNING {PET_COLUMNS}"
        ))
        .bind(image)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(ServiceError::PetNotFound(id))
    }

    /// Flip `adopted` in a single statement so concurrent toggles cannot
    /// lose an update.
    pub async fn toggle_adopted(&self, id: i64) -> ServiceResult<Pet> {
        let pet = sqlx::query_as::<_, Pet>(&format!(
            "UPDATE pets SET adopted = NOT adopted, updated_at = ?
             WHERE id = ?
             RETURNING {PET_COLUMNS}"
        ))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(ServiceError::PetNotFound(id))?;
        debug!(id, adopted = pet.adopted, "toggled adoption status");
        Ok(pet)
    }

    /// Remove a single pet, returning the deleted row.
    pub async fn delete(&self, id: i64) -> ServiceResult<Pet> {
        sqlx::query_as::<_, Pet>(&format!(
            "DELETE FROM pets WHERE id = ? RETURNING {PET_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(ServiceError::PetNotFound(id))
    }

    /// Delete every pet and insert `pets` in one transaction.
    pub async fn replace_all(&self, pets: &[PetFields]) -> ServiceResult<u64> {
        let mut tx = self.db.begin().await?;
        let removed = sqlx::query("DELETE FROM pets")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let now = Utc::now();
        for fields in pets {
            insert_pet(&mut *tx, fields, now).await?;
        }
        tx.commit().await?;
        debug!(removed, inserted = pets.len(), "replaced pet collection");
        Ok(pets.len() as u64)
    }

    /// Query primitive: matching pets in the requested order, optionally sliced.
    pub async fn find(
        &self,
        filter: &PetFilter,
        order: PetOrder,
        window: Option<Window>,
    ) -> ServiceResult<Vec<Pet>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {PET_COLUMNS} FROM pets"));
        push_filter(&mut builder, filter);
        builder.push(order.sql());
        if let Some(window) = window {
            builder.push(" LIMIT ");
            builder.push_bind(window.limit as i64);
            builder.push(" OFFSET ");
            builder.push_bind(window.offset as i64);
        }

        let pets = builder.build_query_as::<Pet>().fetch_all(&*self.db).await?;
        Ok(pets)
    }

    /// Every pet, newest first.
    pub async fn all(&self) -> ServiceResult<Vec<Pet>> {
        self.find(&PetFilter::default(), PetOrder::NewestFirst, None)
            .await
    }

    pub async fn count(&self, filter: &PetFilter) -> ServiceResult<u64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM pets");
        push_filter(&mut builder, filter);
        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&*self.db).await?;
        Ok(count.max(0) as u64)
    }

    /// Distinct breed values, ascending, optionally restricted by adoption status.
    pub async fn distinct_breeds(&self, adopted: Option<bool>) -> ServiceResult<Vec<String>> {
        let filter = PetFilter {
            adopted,
            ..PetFilter::default()
        };
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT DISTINCT breed FROM pets");
        push_filter(&mut builder, &filter);
        builder.push(" ORDER BY breed ASC");
        let breeds = builder
            .build_query_scalar::<String>()
            .fetch_all(&*self.db).await?;
        Ok(breeds)
    }
}

async fn insert_pet<'e, E>(executor: E, fields: &PetFields, now: DateTime<Utc>) -> ServiceResult<Pet>
where
    E: Executor<'e, Database = Sqlite>,
{
    let pet = sqlx::query_as::<_, Pet>(&format!(
        "INSERT INTO pets (name, breed, age, description, adopted, image, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, NULL, ?, ?)
         RETURNING {PET_COLUMNS}"
    ))
    .bind(&fields.name)
    .bind(&fields.breed)
    .bind(fields.age)
    .bind(&fields.description)
    .bind(fields.adopted)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await?;
    Ok(pet)
}

/// Append a `WHERE` clause for `filter`. Constraints are ANDed; the search
/// term is ORed across the three text columns.
fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &PetFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(adopted) = filter.adopted {
        builder.push(" AND adopted = ");
        builder.push_bind(adopted);
    }

    if let Some(search) = &filter.search {
        let pattern = contains_pattern(search);
        builder.push(" AND (name LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" ESCAPE '\\' OR breed LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" ESCAPE '\\' OR description LIKE ");
        builder.push_bind(pattern);
        builder.push(" ESCAPE '\\')");
    }

    match &filter.breed {
        Some(BreedFilter::Exact(breed)) => {
            builder.push(" AND breed = ");
            builder.push_bind(breed.clone());
        }
        Some(BreedFilter::Contains(part)) => {
            builder.push(" AND breed LIKE ");
            builder.push_bind(contains_pattern(part));
            builder.push(" ESCAPE '\\'");
        }
        None => {}
    }

    match filter.age {
        Some(AgeFilter::Young) => {
            builder.push(" AND age <= 2");
        }
        Some(AgeFilter::Adult) => {
            builder.push(" AND age > 2 AND age <= 7");
        }
        Some(AgeFilter::Senior) => {
            builder.push(" AND age > 7");
        }
        Some(AgeFilter::Exact(age)) => {
            builder.push(" AND age = ");
            builder.push_bind(age);
        }
        Some(AgeFilter::AtLeast(age)) => {
            builder.push(" AND age >= ");
            builder.push_bind(age);
        }
        None => {}
    }

    if let Some(id) = filter.exclude_id {
        builder.push(" AND id <> ");
        builder.push_bind(id);
    }
}

/// `%needle%` with LIKE wildcards in the needle escaped by backslash.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
