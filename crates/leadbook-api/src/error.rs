//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::{
    multipart::{MultipartError, MultipartRejection},
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use leadbook_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  /// The request could not be decoded at all.
  #[error("bad request: {0}")]
  BadRequest(String),

  /// A server-side failure that is not the store's, e.g. token signing.
  #[error("internal error: {0}")]
  Internal(String),
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<MultipartRejection> for ApiError {
  fn from(rejection: MultipartRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<MultipartError> for ApiError {
  fn from(e: MultipartError) -> Self { Self::BadRequest(e.body_text()) }
}

fn internal() -> Response {
  (
    StatusCode::INTERNAL_SERVER_ERROR,
    Json(json!({ "error": "internal server error" })),
  )
    .into_response()
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Core(CoreError::Unauthenticated) => {
        let mut res = (
          StatusCode::UNAUTHORIZED,
          Json(json!({ "error": "unauthenticated" })),
        )
          .into_response();
        res
          .headers_mut()
          .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        res
      }
      ApiError::Core(CoreError::Forbidden(m)) => {
        (StatusCode::FORBIDDEN, Json(json!({ "error": m }))).into_response()
      }
      ApiError::Core(CoreError::NotFound(m)) => {
        (StatusCode::NOT_FOUND, Json(json!({ "error": m }))).into_response()
      }
      ApiError::Core(CoreError::Validation(details)) => (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "validation failed", "details": details })),
      )
        .into_response(),
      ApiError::Core(CoreError::Store(e)) => {
        tracing::error!(error = %e, "store failure");
        internal()
      }
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": m }))).into_response()
      }
      ApiError::Internal(m) => {
        tracing::error!(error = %m, "internal failure");
        internal()
      }
    }
  }
}
