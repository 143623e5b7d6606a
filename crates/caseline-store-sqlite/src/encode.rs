//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated
//! lowercase strings. Metric columns map directly to nullable INTEGER /
//! REAL columns so "not reported" round-trips as NULL.

use caseline_core::{
  metrics::Metrics,
  observation::{CountyObservation, JurisdictionTag, RawObservation, StateObservation},
  page::Page,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Metrics ─────────────────────────────────────────────────────────────────

/// Column list shared by the raw and canonical observation tables, in the
/// order [`metrics_from_row`] reads them.
pub const METRIC_COLUMNS: &str = "cases, deaths, presumptive, recovered, \
   tested, hospitalized, negative, monitored, no_longer_monitored, \
   pending, active, inconclusive, severe, lat, lon";

/// Read the fifteen metric columns starting at index `start`.
pub fn metrics_from_row(
  row: &rusqlite::Row<'_>,
  start: usize,
) -> rusqlite::Result<Metrics> {
  Ok(Metrics {
    cases:               row.get(start)?,
    deaths:              row.get(start + 1)?,
    presumptive:         row.get(start + 2)?,
    recovered:           row.get(start + 3)?,
    tested:              row.get(start + 4)?,
    hospitalized:        row.get(start + 5)?,
    negative:            row.get(start + 6)?,
    monitored:           row.get(start + 7)?,
    no_longer_monitored: row.get(start + 8)?,
    pending:             row.get(start + 9)?,
    active:              row.get(start + 10)?,
    inconclusive:        row.get(start + 11)?,
    severe:              row.get(start + 12)?,
    lat:                 row.get(start + 13)?,
    lon:                 row.get(start + 14)?,
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `scraping_pages` row.
pub struct RawPage {
  pub page_id:      String,
  pub url:          String,
  pub raw_text:     String,
  pub content_hash: String,
  pub captured_at:  String,
}

impl RawPage {
  pub fn into_page(self) -> Result<Page> {
    Ok(Page {
      page_id:      decode_uuid(&self.page_id)?,
      url:          self.url,
      raw_text:     self.raw_text,
      content_hash: self.content_hash,
      captured_at:  decode_dt(&self.captured_at)?,
    })
  }
}

/// Raw strings read directly from a `scraping_raw_data` row.
pub struct RawRawObservation {
  pub observation_id: String,
  pub country:        String,
  pub state:          String,
  pub county:         Option<String>,
  pub url:            String,
  pub page_id:        String,
  pub group_id:       i64,
  pub captured_at:    String,
  pub metrics:        Metrics,
}

impl RawRawObservation {
  pub fn into_observation(self) -> Result<RawObservation> {
    Ok(RawObservation {
      observation_id: decode_uuid(&self.observation_id)?,
      tag:            JurisdictionTag {
        country: self.country,
        state:   self.state,
        county:  self.county,
      },
      url:            self.url,
      page_id:        decode_uuid(&self.page_id)?,
      group_id:       self.group_id,
      captured_at:    decode_dt(&self.captured_at)?,
      metrics:        self.metrics,
    })
  }
}

/// Raw strings read directly from a `scraping_state_data` row.
pub struct RawStateObservation {
  pub country_code: String,
  pub state_abbrev: String,
  pub captured_at:  String,
  pub updated_at:   String,
  pub metrics:      Metrics,
  pub group_id:     i64,
  pub page_id:      String,
  pub raw_id:       String,
}

impl RawStateObservation {
  pub fn into_observation(self) -> Result<StateObservation> {
    Ok(StateObservation {
      country_code: self.country_code,
      state_abbrev: self.state_abbrev,
      captured_at:  decode_dt(&self.captured_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
      metrics:      self.metrics,
      group_id:     self.group_id,
      page_id:      decode_uuid(&self.page_id)?,
      raw_id:       decode_uuid(&self.raw_id)?,
    })
  }
}

/// Raw strings read directly from a `scraping_county_data` row.
pub struct RawCountyObservation {
  pub country_code: String,
  pub state_abbrev: String,
  pub county_fips:  String,
  pub county_name:  String,
  pub captured_at:  String,
  pub updated_at:   String,
  pub metrics:      Metrics,
  pub group_id:     i64,
  pub page_id:      String,
  pub raw_id:       String,
}

impl RawCountyObservation {
  pub fn into_observation(self) -> Result<CountyObservation> {
    Ok(CountyObservation {
      country_code: self.country_code,
      state_abbrev: self.state_abbrev,
      county_fips:  self.county_fips,
      county_name:  self.county_name,
      captured_at:  decode_dt(&self.captured_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
      metrics:      self.metrics,
      group_id:     self.group_id,
      page_id:      decode_uuid(&self.page_id)?,
      raw_id:       decode_uuid(&self.raw_id)?,
    })
  }
}
