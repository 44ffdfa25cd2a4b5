//! Request extractors.

use axum::extract::FromRequest;

use crate::error::ApiError;

/// `Json` whose rejections answer with the API error body
/// (`400 invalid_json`) instead of axum's plain-text response.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);
