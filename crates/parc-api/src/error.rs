//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every response body carries a stable machine-readable `kind` next to the
//! human-readable `error` message, so clients can branch without parsing
//! message text.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use parc_core::{replace::ReplaceError, store::DeleteError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("terminal state: {0}")]
  TerminalState(String),

  #[error("no-op request: {0}")]
  NoOp(String),

  #[error("invalid request: {0}")]
  InvalidRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Stable discriminant for the response body.
  pub fn kind(&self) -> &'static str {
    match self {
      ApiError::NotFound(_) => "not_found",
      ApiError::TerminalState(_) => "terminal_state",
      ApiError::NoOp(_) => "no_op",
      ApiError::InvalidRequest(_) => "invalid_request",
      ApiError::Conflict(_) => "conflict",
      ApiError::Store(_) => "store",
    }
  }

  pub fn from_replace<E>(err: ReplaceError<E>) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    match err {
      ReplaceError::NotFound(_) => ApiError::NotFound(err.to_string()),
      ReplaceError::TerminalStateViolation { .. } => {
        ApiError::TerminalState(err.to_string())
      }
      ReplaceError::NoOpRequest => ApiError::NoOp(err.to_string()),
      ReplaceError::InvalidChangeRequest(_) => {
        ApiError::InvalidRequest(err.to_string())
      }
      ReplaceError::ConflictingReplacement(_) => {
        ApiError::Conflict(err.to_string())
      }
      ReplaceError::StorageUnavailable(e) => ApiError::Store(Box::new(e)),
    }
  }

  pub fn from_delete<E>(err: DeleteError<E>) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    match err {
      DeleteError::NotFound(_) => ApiError::NotFound(err.to_string()),
      DeleteError::Referenced(_) => ApiError::Conflict(err.to_string()),
      DeleteError::Storage(e) => ApiError::Store(Box::new(e)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::TerminalState(_)
      | ApiError::NoOp(_)
      | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = json!({ "error": self.to_string(), "kind": self.kind() });
    (status, Json(body)).into_response()
  }
}
