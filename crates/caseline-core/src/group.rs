//! Scrape groups — the batch identifier shared by everything captured in
//! one ingestion run.
//!
//! Group ids are strictly increasing and never reused, which makes
//! point-in-time reconstruction a simple `group_id <= n` filter. An empty
//! group (cancelled run) is valid and simply ignored by readers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeGroup {
  pub group_id:   i64,
  pub created_at: DateTime<Utc>,
}
