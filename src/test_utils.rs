//! Shared test utilities.
//!
//! Helpers for setting up an in-memory database and creating test entities
//! with sensible defaults.

use crate::{
    models::{
        pet::{Pet, PetFields},
        user::RegistrationForm,
    },
    services::{accounts::Identity, pet_store::PetStore},
    state::{AppState, StateOptions},
};
use chrono::{DateTime, Utc};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::{path::PathBuf, sync::Arc};
use uuid::Uuid;

/// Creates an in-memory SQLite database with all tables initialized.
///
/// The pool holds exactly one connection that never expires; every new
/// connection to `sqlite::memory:` would otherwise see an empty database.
pub async fn setup_test_db() -> Arc<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    crate::db::run_migrations(&pool)
        .await
        .expect("schema migration");
    Arc::new(pool)
}

/// Creates a pet with a generic description.
pub async fn insert_pet(
    store: &PetStore,
    name: &str,
    breed: &str,
    age: u32,
    adopted: bool,
) -> Pet {
    let mut fields = PetFields::new(name, breed, age, "A lovely companion.");
    fields.adopted = adopted;
    store.create(&fields).await.expect("insert pet")
}

/// Builds an unsaved pet for pure computations.
pub fn pet_at(id: i64, breed: &str, age: u32, adopted: bool, created_at: DateTime<Utc>) -> Pet {
    Pet {
        id,
        name: format!("Pet {id}"),
        breed: breed.to_string(),
        age,
        description: "A lovely companion.".to_string(),
        adopted,
        image: None,
        created_at,
        updated_at: created_at,
    }
}

/// Removes a scratch media directory when dropped.
pub struct TempMediaDir(pub PathBuf);

impl Drop for TempMediaDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// Full application state over an in-memory database and a scratch media
/// directory. Keep the returned guard alive for the duration of the test.
pub async fn test_state() -> (AppState, TempMediaDir) {
    let dir = std::env::temp_dir().join(format!("petconnect-test-{}", Uuid::new_v4()));
    let options = StateOptions {
        catalog: Default::default(),
        stats: Default::default(),
        media_dir: dir.clone(),
        max_image_bytes: 1024,
        session_ttl_hours: 1,
    };
    (AppState::new(setup_test_db().await, options), TempMediaDir(dir))
}

/// Registers `username` (password `s3cure-pass`) and returns its identity.
pub async fn member(state: &AppState, username: &str) -> Identity {
    let form = RegistrationForm {
        username: username.into(),
        email: format!("{username}@example.com"),
        password1: "s3cure-pass".into(),
        password2: "s3cure-pass".into(),
    };
    let user = state.accounts.register(&form).await.expect("register");
    Identity { user: Some(user) }
}

/// Registers `username` and grants the staff role.
pub async fn staff(state: &AppState, username: &str) -> Identity {
    member(state, username).await;
    let user = state
        .accounts
        .promote_staff(username)
        .await
        .expect("promote staff");
    Identity { user: Some(user) }
}
