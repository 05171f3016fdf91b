//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,

  /// A body or query string that could not be decoded.
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Core(#[from] gavel_core::Error),
}

impl Error {
  fn status(&self) -> StatusCode {
    use gavel_core::Error as Core;

    match self {
      Error::Unauthorized => StatusCode::UNAUTHORIZED,
      Error::BadRequest(_) => StatusCode::BAD_REQUEST,
      Error::Core(Core::StrikeNotFound(_)) => StatusCode::NOT_FOUND,
      Error::Core(Core::InvalidSeverity(_) | Core::TimeOutOfRange) => {
        StatusCode::BAD_REQUEST
      }
      // No enforcement decision can be made on a failed read.
      Error::Core(Core::StoreUnavailable(_) | Core::InconsistentRecordState { .. }) => {
        StatusCode::SERVICE_UNAVAILABLE
      }
    }
  }
}

impl From<JsonRejection> for Error {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for Error {
  fn from(rejection: QueryRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let mut res = (status, Json(json!({ "error": self.to_string() }))).into_response();
    if matches!(self, Error::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"gavel\""),
      );
    }
    res
  }
}
