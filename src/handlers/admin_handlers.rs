//! Staff dashboard.

use crate::{
    errors::AppError,
    services::{accounts::Identity, statistics::DashboardStats},
    state::AppState,
};
use axum::{Json, extract::State};
use chrono::Utc;

/// `GET /admin-dashboard`
pub async fn admin_dashboard(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<DashboardStats>, AppError> {
    identity.require_staff()?;
    Ok(Json(state.statistics.dashboard(Utc::now()).await?))
}
