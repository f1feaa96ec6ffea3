//! Defines routes for the public catalog, staff management and accounts.
//!
//! ## Structure
//! - **Public**
//!   - `GET  /`, `/adopt`, `/pets/{id}`, `/about`, `/media/{*path}`
//!   - `POST /register`, `/login`, `/contact`
//!
//! - **Signed-in users**
//!   - `POST /pets/{id}/interest`, `/logout`
//!
//! - **Staff**
//!   - `POST   /pets` (create), `PUT /pets/{id}` (edit), `DELETE /pets/{id}`
//!   - `PUT    /pets/{id}/image` (raw image body)
//!   - `POST   /toggle-adoption/{id}` (any other method is a 400)
//!   - `GET    /admin-dashboard`

use crate::{
    handlers::{
        admin_handlers::admin_dashboard,
        auth_handlers::{login, logout, register},
        health_handlers::{healthz, readyz},
        media_handlers::get_media,
        pet_handlers::{
            adopt, adoption_interest, create_pet, delete_pet, home, pet_detail, toggle_adoption,
            toggle_invalid_method, update_pet, upload_pet_image,
        },
        site_handlers::{about, contact},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Build the router. Role checks happen inside the handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Catalog
        .route("/", get(home))
        .route("/adopt", get(adopt))
        .route("/pets", post(create_pet))
        .route(
            "/pets/{id}",
            get(pet_detail).put(update_pet).delete(delete_pet),
        )
        .route("/pets/{id}/interest", post(adoption_interest))
        .route("/pets/{id}/image", put(upload_pet_image))
        .route(
            "/toggle-adoption/{id}",
            post(toggle_adoption).fallback(toggle_invalid_method),
        )
        .route("/admin-dashboard", get(admin_dashboard))
        .route("/media/{*path}", get(get_media))
        // Accounts
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        // Site
        .route("/contact", post(contact))
        .route("/about", get(about))
}
