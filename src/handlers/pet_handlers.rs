//! HTTP handlers for browsing and managing pets.
//! Upload bodies are streamed straight to the media service; nothing is
//! buffered in memory.

use super::extract::{JsonBody, PathParam};
use crate::{
    errors::AppError,
    models::pet::{Pet, PetForm},
    services::{
        accounts::Identity,
        catalog::{CatalogRequest, HomeSummary, PetDetail, PetPage, RawCatalogQuery},
        pet_admin::ToggleOutcome,
    },
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
};
use futures::StreamExt;
use serde::Serialize;
use std::io;

/// Plain acknowledgement body.
#[derive(Serialize, Debug)]
pub struct Notice {
    pub success: bool,
    pub message: String,
}

impl Notice {
    fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// `GET /`
pub async fn home(State(state): State<AppState>) -> Result<Json<HomeSummary>, AppError> {
    Ok(Json(state.catalog.home().await?))
}

/// `GET /adopt`. Unparseable filter values are ignored, never rejected, and a
/// repeated key keeps its last value.
pub async fn adopt(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<PetPage>, AppError> {
    let raw = RawCatalogQuery::from_pairs(pairs);
    let request = CatalogRequest::from_query(&raw, state.catalog.config());
    Ok(Json(state.catalog.list(&request).await?))
}

/// `GET /pets/{id}`
pub async fn pet_detail(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<PetDetail>, AppError> {
    Ok(Json(state.catalog.detail(id).await?))
}

/// `POST /pets/{id}/interest`
pub async fn adoption_interest(
    State(state): State<AppState>,
    identity: Identity,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Notice>, AppError> {
    let user = identity.require_authenticated()?;
    let pet = state.store.get_by_id(id).await?;
    tracing::info!(pet = pet.id, username = %user.username, "adoption interest registered");
    Ok(Json(Notice::new(format!(
        "Thank you for your interest in {}! We will contact you soon.",
        pet.name
    ))))
}

/// `POST /pets`
pub async fn create_pet(
    State(state): State<AppState>,
    identity: Identity,
    JsonBody(form): JsonBody<PetForm>,
) -> Result<(StatusCode, Json<Pet>), AppError> {
    identity.require_staff()?;
    let pet = state.admin.create(form).await?;
    Ok((StatusCode::CREATED, Json(pet)))
}

/// `PUT /pets/{id}`
pub async fn update_pet(
    State(state): State<AppState>,
    identity: Identity,
    PathParam(id): PathParam<i64>,
    JsonBody(form): JsonBody<PetForm>,
) -> Result<Json<Pet>, AppError> {
    identity.require_staff()?;
    Ok(Json(state.admin.update(id, form).await?))
}

/// `DELETE /pets/{id}`
pub async fn delete_pet(
    State(state): State<AppState>,
    identity: Identity,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Notice>, AppError> {
    identity.require_staff()?;
    let pet = state.admin.delete(id).await?;
    Ok(Json(Notice::new(format!("{} has been removed.", pet.name))))
}

/// `PUT /pets/{id}/image` with the raw image as body.
pub async fn upload_pet_image(
    State(state): State<AppState>,
    identity: Identity,
    PathParam(id): PathParam<i64>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<Pet>, AppError> {
    identity.require_staff()?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let stream = body
        .into_data_stream()
        .map(|chunk| chunk.map_err(io::Error::other));

    let pet = state
        .admin
        .upload_image(id, content_type.as_deref(), stream)
        .await?;
    Ok(Json(pet))
}

/// `POST /toggle-adoption/{id}`
pub async fn toggle_adoption(
    State(state): State<AppState>,
    identity: Identity,
    PathParam(id): PathParam<i64>,
) -> Result<Json<ToggleOutcome>, AppError> {
    identity.require_authenticated()?;
    identity.require_staff()?;
    Ok(Json(state.admin.toggle_adoption(id).await?))
}

/// Any other method on `/toggle-adoption/{id}`.
pub async fn toggle_invalid_method() -> AppError {
    AppError::bad_request("Invalid request method.")
}
