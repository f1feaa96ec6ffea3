//! Contact form and the static about page.

use super::extract::JsonBody;
use crate::{
    errors::{AppError, ServiceError},
    models::contact::ContactForm,
};
use axum::Json;
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Serialize, Debug)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
}

/// `POST /contact`. Submissions are logged; nothing is mailed.
pub async fn contact(JsonBody(form): JsonBody<ContactForm>) -> Result<Json<ContactResponse>, AppError> {
    form.validate().map_err(ServiceError::ValidationFailed)?;
    tracing::info!(
        name = %form.name.trim(),
        email = %form.email.trim(),
        subject = %form.subject.trim(),
        "contact message received"
    );
    Ok(Json(ContactResponse {
        success: true,
        message: format!(
            "Thank you, {}! Your message has been sent. We will get back to you soon.",
            form.name.trim()
        ),
    }))
}

/// `GET /about`
pub async fn about() -> Json<Value> {
    Json(json!({
        "name": "PetConnect",
        "version": env!("CARGO_PKG_VERSION"),
        "about": "PetConnect helps shelters list animals looking for a home and \
                  lets adopters browse, filter and register their interest.",
    }))
}
