//! Error type for `caseline-ingest`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Domain-level failure: authorization, validation, timeout,
  /// sequencer loss.
  #[error(transparent)]
  Core(#[from] caseline_core::Error),

  /// Opaque failure from the underlying storage backend.
  #[error("store error: {0}")]
  Store(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub fn is_unauthorized(&self) -> bool {
    matches!(self, Error::Core(caseline_core::Error::Unauthorized { .. }))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
