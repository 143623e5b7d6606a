//! Captured pages and the content hash that deduplicates them.
//!
//! A page is immutable once written. Two captures with identical raw text
//! collapse to one row, keyed by the SHA-256 digest of the text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{Error, Result};

/// A raw page as stored in the archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
  pub page_id:      Uuid,
  /// Where the page was fetched from.
  pub url:          String,
  pub raw_text:     String,
  /// SHA-256 hex digest of `raw_text`; the dedup key.
  pub content_hash: String,
  /// Capture timestamp of the first capture that stored this content.
  pub captured_at:  DateTime<Utc>,
}

/// Input to [`crate::store::ScrapeStore::archive_page`].
#[derive(Debug, Clone)]
pub struct NewPage {
  pub url:         String,
  pub raw_text:    String,
  pub captured_at: DateTime<Utc>,
}

impl NewPage {
  /// Reject malformed captures before anything touches storage.
  pub fn validate(&self) -> Result<()> {
    if self.raw_text.trim().is_empty() {
      return Err(Error::InvalidCapture("raw text is empty".to_string()));
    }
    validate_url(&self.url)
  }
}

/// Hex SHA-256 digest of captured text.
pub fn content_hash(raw_text: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(raw_text.as_bytes());
  hex::encode(hasher.finalize())
}

/// Minimal well-formedness check: http(s) scheme and a non-empty host.
pub fn validate_url(url: &str) -> Result<()> {
  let rest = url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .ok_or_else(|| {
      Error::InvalidCapture(format!("url has no http(s) scheme: {url:?}"))
    })?;

  let host = rest.split('/').next().unwrap_or("");
  if host.is_empty() || host.contains(char::is_whitespace) {
    return Err(Error::InvalidCapture(format!("url has no valid host: {url:?}")));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identical_text_hashes_identically() {
    assert_eq!(content_hash("<html>42</html>"), content_hash("<html>42</html>"));
    assert_ne!(content_hash("<html>42</html>"), content_hash("<html>43</html>"));
  }

  #[test]
  fn url_validation() {
    assert!(validate_url("https://health.example.gov/cases").is_ok());
    assert!(validate_url("http://example.gov").is_ok());
    assert!(validate_url("ftp://example.gov").is_err());
    assert!(validate_url("https://").is_err());
    assert!(validate_url("not a url").is_err());
  }

  #[test]
  fn empty_capture_is_rejected() {
    let page = NewPage {
      url:         "https://example.gov".to_string(),
      raw_text:    "   \n".to_string(),
      captured_at: Utc::now(),
    };
    assert!(matches!(page.validate(), Err(Error::InvalidCapture(_))));
  }
}
