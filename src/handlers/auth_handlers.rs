//! Registration, login and logout.

use super::{extract::JsonBody, identity::bearer_token};
use crate::{
    errors::AppError,
    models::user::{LoginForm, RegistrationForm, User},
    services::accounts::Identity,
    state::AppState,
};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct RegisteredResponse {
    pub success: bool,
    pub message: String,
    pub user: User,
}

#[derive(Serialize, Debug)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Serialize, Debug)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: &'static str,
}

/// `POST /register`
pub async fn register(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<RegistrationForm>,
) -> Result<(StatusCode, Json<RegisteredResponse>), AppError> {
    let user = state.accounts.register(&form).await?;
    let message = format!(
        "Account created successfully for {}! You can now log in.",
        user.username
    );
    Ok((
        StatusCode::CREATED,
        Json(RegisteredResponse {
            success: true,
            message,
            user,
        }),
    ))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<LoginForm>,
) -> Result<Json<LoginResponse>, AppError> {
    let session = state.accounts.login(&form).await?;
    Ok(Json(LoginResponse {
        success: true,
        message: format!("Welcome back, {}!", session.user.username),
        token: session.token,
        expires_at: session.expires_at,
        user: session.user,
    }))
}

/// `POST /logout`
pub async fn logout(
    State(state): State<AppState>,
    identity: Identity,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, AppError> {
    identity.require_authenticated()?;
    if let Some(token) = bearer_token(&headers) {
        state.accounts.logout(token).await?;
    }
    Ok(Json(LogoutResponse {
        success: true,
        message: "You have been logged out successfully.",
    }))
}
