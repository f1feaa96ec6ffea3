//! Extractors whose rejections render as `AppError` JSON instead of axum's
//! plain-text bodies.

use crate::errors::AppError;
use axum::extract::{FromRequest, FromRequestParts};

/// `axum::Json` with an `AppError` rejection.
#[derive(FromRequest, Debug)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// `axum::extract::Path` with an `AppError` rejection.
#[derive(FromRequestParts, Debug)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParam<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::IntoResponse,
    };
    use serde_json::Value;

    #[tokio::test]
    async fn malformed_json_is_an_app_error() {
        let request = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\": "))
            .unwrap();
        let err = JsonBody::<Value>::from_request(request, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let response = err.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["status"], 400);
    }

    #[tokio::test]
    async fn missing_content_type_is_an_app_error() {
        let request = Request::builder()
            .method("POST")
            .body(Body::from("{}"))
            .unwrap();
        let err = JsonBody::<Value>::from_request(request, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
