//! Raw and canonical observation records.
//!
//! A raw observation is one scraped measurement set tagged with the
//! free-text jurisdiction names found on the source page. It is append-only
//! and never updated. Canonical observations are the typed projections the
//! normalization mapper writes once the jurisdiction is resolved against
//! the reference registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::Metrics;

// ─── Jurisdiction tag ────────────────────────────────────────────────────────

/// Free-text jurisdiction names exactly as the source page spelled them.
/// Resolution to canonical identifiers happens later; sources abbreviate,
/// misspell, and use legacy names, so this is never a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionTag {
  pub country: String,
  pub state:   String,
  pub county:  Option<String>,
}

impl JurisdictionTag {
  pub fn state_level(country: impl Into<String>, state: impl Into<String>) -> Self {
    Self {
      country: country.into(),
      state:   state.into(),
      county:  None,
    }
  }

  pub fn county_level(
    country: impl Into<String>,
    state: impl Into<String>,
    county: impl Into<String>,
  ) -> Self {
    Self {
      country: country.into(),
      state:   state.into(),
      county:  Some(county.into()),
    }
  }
}

// ─── Raw observations ────────────────────────────────────────────────────────

/// One scraped measurement set, exactly as captured. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawObservation {
  pub observation_id: Uuid,
  pub tag:            JurisdictionTag,
  pub url:            String,
  pub page_id:        Uuid,
  pub group_id:       i64,
  pub captured_at:    DateTime<Utc>,
  pub metrics:        Metrics,
}

/// Input to [`crate::store::ScrapeStore::record_raw`].
#[derive(Debug, Clone)]
pub struct NewRawObservation {
  pub tag:         JurisdictionTag,
  pub url:         String,
  pub page_id:     Uuid,
  pub group_id:    i64,
  pub captured_at: DateTime<Utc>,
  pub metrics:     Metrics,
}

// ─── Canonical observations ──────────────────────────────────────────────────

/// A state-level observation with its jurisdiction resolved to canonical
/// registry identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateObservation {
  pub country_code: String,
  pub state_abbrev: String,
  pub captured_at:  DateTime<Utc>,
  /// Bumped when a later normalization pass re-attaches the same mapping.
  /// Metric values are never overwritten after the first commit.
  pub updated_at:   DateTime<Utc>,
  pub metrics:      Metrics,
  pub group_id:     i64,
  pub page_id:      Uuid,
  pub raw_id:       Uuid,
}

/// A county-level observation resolved down to a FIPS code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountyObservation {
  pub country_code: String,
  pub state_abbrev: String,
  pub county_fips:  String,
  /// Canonical display name, not the raw spelling from the capture.
  pub county_name:  String,
  pub captured_at:  DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
  pub metrics:      Metrics,
  pub group_id:     i64,
  pub page_id:      Uuid,
  pub raw_id:       Uuid,
}

/// Input to [`crate::store::ScrapeStore::put_state_observation`].
#[derive(Debug, Clone)]
pub struct NewStateObservation {
  pub country_code: String,
  pub state_abbrev: String,
  pub captured_at:  DateTime<Utc>,
  pub metrics:      Metrics,
  pub group_id:     i64,
  pub page_id:      Uuid,
  pub raw_id:       Uuid,
}

/// Input to [`crate::store::ScrapeStore::put_county_observation`].
#[derive(Debug, Clone)]
pub struct NewCountyObservation {
  pub country_code: String,
  pub state_abbrev: String,
  pub county_fips:  String,
  pub county_name:  String,
  pub captured_at:  DateTime<Utc>,
  pub metrics:      Metrics,
  pub group_id:     i64,
  pub page_id:      Uuid,
  pub raw_id:       Uuid,
}
