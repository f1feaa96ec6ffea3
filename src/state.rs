//! Shared application state handed to every handler.

use crate::{
    config::AppConfig,
    services::{
        accounts::AccountService,
        catalog::{CatalogConfig, CatalogService},
        media::MediaService,
        pet_admin::PetAdminService,
        pet_store::PetStore,
        statistics::{StatisticsService, StatsConfig},
    },
};
use sqlx::SqlitePool;
use std::{path::PathBuf, sync::Arc};

/// Cheap to clone: every field is a handle over the same pool or directory.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub store: PetStore,
    pub catalog: CatalogService,
    pub statistics: StatisticsService,
    pub accounts: AccountService,
    pub admin: PetAdminService,
    pub media: MediaService,
}

/// Construction parameters that do not come from the pool itself.
#[derive(Clone, Debug)]
pub struct StateOptions {
    pub catalog: CatalogConfig,
    pub stats: StatsConfig,
    pub media_dir: PathBuf,
    pub max_image_bytes: u64,
    pub session_ttl_hours: i64,
}

impl From<&AppConfig> for StateOptions {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            catalog: cfg.catalog_config(),
            stats: cfg.stats_config(),
            media_dir: PathBuf::from(&cfg.media_dir),
            max_image_bytes: cfg.max_image_bytes,
            session_ttl_hours: cfg.session_ttl_hours,
        }
    }
}

impl AppState {
    pub fn new(db: Arc<SqlitePool>, options: StateOptions) -> Self {
        let store = PetStore::new(db.clone());
        let media = MediaService::new(options.media_dir, options.max_image_bytes);
        let accounts = AccountService::new(db.clone(), options.session_ttl_hours);
        let catalog = CatalogService::new(store.clone(), options.catalog);
        let statistics = StatisticsService::new(
            store.clone(),
            accounts.clone(),
            media.clone(),
            options.stats,
        );
        let admin = PetAdminService::new(store.clone(), media.clone());

        Self {
            db,
            store,
            catalog,
            statistics,
            accounts,
            admin,
            media,
        }
    }
}
