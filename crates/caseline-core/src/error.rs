//! Error types for `caseline-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed input handed to the page archive. Nothing is written; the
  /// caller may retry with corrected input.
  #[error("invalid capture: {0}")]
  InvalidCapture(String),

  /// A raw write referenced a page or scrape group that does not exist.
  /// Indicates an ordering bug upstream; not retried automatically.
  #[error("dangling reference: {0}")]
  DanglingReference(String),

  /// The calling principal's role does not permit the operation.
  #[error("principal {principal:?} is not authorized to {operation}")]
  Unauthorized {
    principal: String,
    operation: &'static str,
  },

  /// Batch-id allocation failed. Fatal to the whole ingestion run; no
  /// partial group is left behind.
  #[error("scrape group sequencer unavailable: {0}")]
  SequencerUnavailable(String),

  /// A storage call exceeded the caller-supplied deadline. The write is
  /// treated as failed and is safe to retry.
  #[error("storage operation timed out: {0}")]
  Timeout(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
