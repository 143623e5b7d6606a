//! Error type for `caseline-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] caseline_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl Error {
  /// Whether this is a dangling-reference failure from the core taxonomy.
  pub fn is_dangling_reference(&self) -> bool {
    matches!(self, Error::Core(caseline_core::Error::DanglingReference(_)))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
