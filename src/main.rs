use anyhow::Result;
use axum::Router;
use config::{AppConfig, Task};
use state::{AppState, StateOptions};
use std::{fs, io::ErrorKind, path::Path};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;
#[cfg(test)]
mod test_utils;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + one-shot task ---
    let (cfg, task) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting petconnect with config: {:?}", cfg);

    // --- Initialize SQLite connection ---
    let db = db::connect(&cfg.database_url).await?;

    // The schema is idempotent, so it is applied on every start.
    db::run_migrations(&db).await?;

    match task {
        Task::Migrate => {
            tracing::info!("Database migration complete.");
            return Ok(());
        }
        Task::Seed => {
            let store = services::pet_store::PetStore::new(db.clone());
            services::seed::seed_sample_pets(&store).await?;
            return Ok(());
        }
        Task::PromoteStaff(username) => {
            let accounts =
                services::accounts::AccountService::new(db.clone(), cfg.session_ttl_hours);
            accounts.promote_staff(&username).await?;
            tracing::info!("{} is now a staff member.", username);
            return Ok(());
        }
        Task::Serve => {}
    }

    // --- Ensure media directory exists ---
    if !Path::new(&cfg.media_dir).exists() {
        fs::create_dir_all(&cfg.media_dir)?;
        tracing::info!("Created media directory at {}", cfg.media_dir);
    }

    // --- Build router ---
    let state = AppState::new(db, StateOptions::from(&cfg));
    let app: Router = routes::routes::routes().with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
