//! Error types and axum `IntoResponse` implementation.

use axum::{
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// No credentials, or credentials that do not verify.
  #[error("unauthorized")]
  Unauthorized,
  /// Verified principal whose role does not permit the operation.
  #[error("forbidden: {0}")]
  Forbidden(String),
  #[error("not found: {0}")]
  NotFound(String),
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("conflict: {0}")]
  Conflict(String),
  #[error("sequencer unavailable: {0}")]
  Unavailable(String),
  #[error("storage timeout during {0}")]
  Timeout(&'static str),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<caseline_ingest::Error> for Error {
  fn from(e: caseline_ingest::Error) -> Self {
    use caseline_core::Error as Core;
    match e {
      caseline_ingest::Error::Core(core) => match core {
        Core::Unauthorized { .. } => Error::Forbidden(core.to_string()),
        Core::InvalidCapture(msg) => Error::BadRequest(msg),
        Core::DanglingReference(msg) => Error::Conflict(msg),
        Core::SequencerUnavailable(msg) => Error::Unavailable(msg),
        Core::Timeout(op) => Error::Timeout(op),
      },
      caseline_ingest::Error::Store(e) => Error::Store(e),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let mut res =
          (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"caseline\""),
        );
        res
      }
      Error::Forbidden(msg) => (StatusCode::FORBIDDEN, msg).into_response(),
      Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
      Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
      Error::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
      Error::Unavailable(msg) => {
        (StatusCode::SERVICE_UNAVAILABLE, msg).into_response()
      }
      Error::Timeout(op) => {
        (StatusCode::GATEWAY_TIMEOUT, format!("timed out during {op}"))
          .into_response()
      }
      Error::Store(e) => {
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
      }
    }
  }
}
