//! The sparse metrics bag carried by every observation.
//!
//! Every field is optional: `None` means "not reported by the source",
//! which is distinct from a reported zero. Sources publish wildly
//! different subsets of these counters, so the bag is an explicit
//! optional-field record rather than a key-value map — absent vs. zero
//! stays type-checked.

use serde::{Deserialize, Serialize};

/// One scraped measurement set. All counts are cumulative as reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
  pub cases:               Option<i64>,
  pub deaths:              Option<i64>,
  pub presumptive:         Option<i64>,
  pub recovered:           Option<i64>,
  pub tested:              Option<i64>,
  pub hospitalized:        Option<i64>,
  pub negative:            Option<i64>,
  pub monitored:           Option<i64>,
  pub no_longer_monitored: Option<i64>,
  pub pending:             Option<i64>,
  pub active:              Option<i64>,
  pub inconclusive:        Option<i64>,
  pub severe:              Option<i64>,
  /// Reported coordinates of the jurisdiction, when the source gives them.
  pub lat:                 Option<f64>,
  pub lon:                 Option<f64>,
}

impl Metrics {
  /// `true` when the source reported nothing at all.
  pub fn is_empty(&self) -> bool {
    self.cases.is_none()
      && self.deaths.is_none()
      && self.presumptive.is_none()
      && self.recovered.is_none()
      && self.tested.is_none()
      && self.hospitalized.is_none()
      && self.negative.is_none()
      && self.monitored.is_none()
      && self.no_longer_monitored.is_none()
      && self.pending.is_none()
      && self.active.is_none()
      && self.inconclusive.is_none()
      && self.severe.is_none()
      && self.lat.is_none()
      && self.lon.is_none()
  }
}
