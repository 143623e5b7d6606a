//! One ingestion run: a scrape group plus the validate → archive →
//! record → normalize pipeline executed under it.

use std::{future::Future, time::Duration};

use caseline_core::{
  group::ScrapeGroup,
  metrics::Metrics,
  observation::{
    CountyObservation, JurisdictionTag, NewCountyObservation,
    NewRawObservation, NewStateObservation, RawObservation, StateObservation,
  },
  page::NewPage,
  registry::RegistrySnapshot,
  resolve::Resolution,
  role::Principal,
  store::{ObservationQuery, ScrapeStore},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Gate, Result};

/// One scraped measurement set as handed over by a scraper collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capture {
  pub tag:         JurisdictionTag,
  pub url:         String,
  pub raw_text:    String,
  pub captured_at: DateTime<Utc>,
  #[serde(default)]
  pub metrics:     Metrics,
}

/// Result of running the mapper over one raw observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeOutcome {
  pub resolution: Resolution,
  /// The slot was already owned by a different raw row; the committed
  /// row was left untouched and this row was retired from the queue.
  pub duplicate:  bool,
}

/// Outcome counts of a deferred normalization pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NormalizeReport {
  pub state_rows:  usize,
  pub county_rows: usize,
  pub duplicates:  usize,
  pub unresolved:  usize,
}

/// An open scrape group bound to one principal.
///
/// Storage calls made through the run are bounded by `timeout`; a
/// timed-out write is reported failed and is safe to retry, since every
/// store write is a single atomic insert or a no-op.
pub struct IngestRun<S> {
  gate:      Gate<S>,
  principal: Principal,
  group:     ScrapeGroup,
  timeout:   Duration,
}

impl<S> IngestRun<S>
where
  S: ScrapeStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  /// Allocate a fresh scrape group. Failure here is fatal to the run:
  /// there is no group to record anything under.
  pub async fn open(
    gate: Gate<S>,
    principal: Principal,
    timeout: Duration,
  ) -> Result<Self> {
    let group = match tokio::time::timeout(
      timeout,
      gate.new_group(&principal),
    )
    .await
    {
      Ok(res) => res?,
      Err(_) => {
        return Err(Error::Core(
          caseline_core::Error::SequencerUnavailable(
            "group allocation timed out".into(),
          ),
        ));
      }
    };
    tracing::info!(group_id = group.group_id, principal = %principal.name,
      "opened scrape group");
    Ok(Self { gate, principal, group, timeout })
  }

  /// Re-attach to an existing group, e.g. for a deferred normalization
  /// pass over data recorded by an earlier run.
  pub async fn attach(
    gate: Gate<S>,
    principal: Principal,
    group_id: i64,
    timeout: Duration,
  ) -> Result<Option<Self>> {
    let Some(group) = gate.get_group(&principal, group_id).await? else {
      return Ok(None);
    };
    Ok(Some(Self { gate, principal, group, timeout }))
  }

  pub fn group(&self) -> &ScrapeGroup { &self.group }

  async fn bounded<T>(
    &self,
    op: &'static str,
    fut: impl Future<Output = Result<T>>,
  ) -> Result<T> {
    match tokio::time::timeout(self.timeout, fut).await {
      Ok(res) => res,
      Err(_) => Err(Error::Core(caseline_core::Error::Timeout(op))),
    }
  }

  /// Validate → archive → record, all under this run's group.
  ///
  /// The page insert and the raw insert are separate atomic writes; if
  /// the second fails the archived page stands alone, which is harmless
  /// and deduplicated on retry.
  pub async fn submit_capture(&self, capture: Capture) -> Result<RawObservation> {
    let page = self
      .bounded(
        "archive page",
        self.gate.archive_page(&self.principal, NewPage {
          url:         capture.url.clone(),
          raw_text:    capture.raw_text,
          captured_at: capture.captured_at,
        }),
      )
      .await?;

    self
      .bounded(
        "record raw observation",
        self.gate.record_raw(&self.principal, NewRawObservation {
          tag:         capture.tag,
          url:         capture.url,
          page_id:     page.page_id,
          group_id:    self.group.group_id,
          captured_at: capture.captured_at,
          metrics:     capture.metrics,
        }),
      )
      .await
  }

  /// Run the four-tier mapper over one raw observation and, on a hit,
  /// write the canonical row. `Unresolved` is an outcome, not an error:
  /// the raw row stays queued for a later pass. A hit against a slot
  /// already owned by a different raw row is reported as a duplicate;
  /// the committed row is not touched.
  pub async fn normalize_capture(
    &self,
    snapshot: &RegistrySnapshot,
    raw: &RawObservation,
  ) -> Result<NormalizeOutcome> {
    let resolution = snapshot.resolve(&raw.tag);
    let mut duplicate = false;
    match &resolution {
      Resolution::State { country_code, state_abbrev } => {
        let stored = self
          .bounded(
            "write state observation",
            self.gate.put_state_observation(&self.principal, NewStateObservation {
              country_code: country_code.clone(),
              state_abbrev: state_abbrev.clone(),
              captured_at:  raw.captured_at,
              metrics:      raw.metrics.clone(),
              group_id:     raw.group_id,
              page_id:      raw.page_id,
              raw_id:       raw.observation_id,
            }),
          )
          .await?;
        duplicate = stored.raw_id != raw.observation_id;
      },
      Resolution::County {
        country_code,
        state_abbrev,
        county_fips,
        county_name,
      } => {
        let stored = self
          .bounded(
            "write county observation",
            self.gate.put_county_observation(&self.principal, NewCountyObservation {
              country_code: country_code.clone(),
              state_abbrev: state_abbrev.clone(),
              county_fips:  county_fips.clone(),
              county_name:  county_name.clone(),
              captured_at:  raw.captured_at,
              metrics:      raw.metrics.clone(),
              group_id:     raw.group_id,
              page_id:      raw.page_id,
              raw_id:       raw.observation_id,
            }),
          )
          .await?;
        duplicate = stored.raw_id != raw.observation_id;
      },
      Resolution::Unresolved => {
        tracing::warn!(
          country = %raw.tag.country,
          state = %raw.tag.state,
          county = raw.tag.county.as_deref().unwrap_or("-"),
          group_id = raw.group_id,
          "jurisdiction did not resolve; row stays queued"
        );
      },
    }
    Ok(NormalizeOutcome { resolution, duplicate })
  }

  /// Deferred pass: normalize every raw row in this group that has no
  /// canonical counterpart yet.
  pub async fn normalize_group(&self) -> Result<NormalizeReport> {
    let snapshot = self.gate.registry_snapshot(&self.principal).await?;
    let queued = self
      .gate
      .unresolved(&self.principal, self.group.group_id)
      .await?;

    let mut report = NormalizeReport {
      state_rows:  0,
      county_rows: 0,
      duplicates:  0,
      unresolved:  0,
    };
    for raw in &queued {
      let outcome = self.normalize_capture(&snapshot, raw).await?;
      match (&outcome.resolution, outcome.duplicate) {
        (Resolution::Unresolved, _) => report.unresolved += 1,
        (_, true) => report.duplicates += 1,
        (Resolution::State { .. }, false) => report.state_rows += 1,
        (Resolution::County { .. }, false) => report.county_rows += 1,
      }
    }
    tracing::info!(
      group_id = self.group.group_id,
      state_rows = report.state_rows,
      county_rows = report.county_rows,
      duplicates = report.duplicates,
      unresolved = report.unresolved,
      "normalization pass finished"
    );
    Ok(report)
  }
}

// ─── Read side ───────────────────────────────────────────────────────────────

/// Canonical observations at both levels, as returned to reporting
/// consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observations {
  pub states:   Vec<StateObservation>,
  pub counties: Vec<CountyObservation>,
}

/// Read canonical observations by jurisdiction filter and time range.
/// Available to both roles.
pub async fn query_observations<S>(
  gate: &Gate<S>,
  principal: &Principal,
  query: &ObservationQuery,
) -> Result<Observations>
where
  S: ScrapeStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let states = gate.state_observations(principal, query).await?;
  let counties = gate.county_observations(principal, query).await?;
  Ok(Observations { states, counties })
}
