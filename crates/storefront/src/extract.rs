//! Request extractors whose rejections use the API's error body.
//!
//! axum's own `Json` and `Path` reject with plain text. These wrap them so a
//! malformed body or path segment answers `400 {"error": "..."}` like every
//! other failure.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// `Json` body rejected as [`AppError::BadRequest`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `Path` parameters rejected as [`AppError::BadRequest`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
