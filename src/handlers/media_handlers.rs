//! Serves stored pet images.

use super::extract::PathParam;
use crate::{errors::AppError, state::AppState};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

/// `GET /media/{*path}` as a streaming response.
pub async fn get_media(
    State(state): State<AppState>,
    PathParam(path): PathParam<String>,
) -> Result<Response, AppError> {
    let (file, size_bytes, content_type) = state.media.open(&path).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size_bytes));
    Ok(response)
}
