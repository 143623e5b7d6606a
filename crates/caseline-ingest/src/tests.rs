//! Pipeline tests against an in-memory SQLite store.

use std::{sync::Arc, time::Duration};

use caseline_core::{
  metrics::Metrics,
  observation::JurisdictionTag,
  registry::{
    Country, County, FipsLookupEntry, RegistrySeed, SourceUrl, State,
  },
  resolve::Resolution,
  role::{AccessPolicy, Principal, Role},
  store::{ObservationQuery, ScrapeStore},
};
use caseline_store_sqlite::SqliteStore;
use chrono::Utc;

use crate::{Capture, Gate, IngestRun, run::query_observations};

const TIMEOUT: Duration = Duration::from_secs(5);

fn seed() -> RegistrySeed {
  RegistrySeed {
    countries: vec![Country { code: "US".into(), name: "United States".into() }],
    states:    vec![State {
      abbrev:       "FL".into(),
      name:         "Florida".into(),
      country_code: "US".into(),
      fips_prefix:  Some("12".into()),
    }],
    counties:  vec![County {
      fips:              "12109".into(),
      name:              "St. Johns".into(),
      state_abbrev:      "FL".into(),
      alternate_name:    Some("St. John's".into()),
      non_standard_name: None,
    }],
    fips_lut:  vec![FipsLookupEntry {
      state_abbrev:   "FL".into(),
      county_name:    "St. Johns".into(),
      fips:           "12109".into(),
      alternate_name: None,
    }],
    urls:      vec![SourceUrl {
      country_code: "US".into(),
      state_abbrev: "FL".into(),
      url:          "https://floridahealth.gov/cases".into(),
    }],
    timezones: vec![],
  }
}

async fn gate() -> Gate<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  store.seed_registry(seed()).await.unwrap();
  let policy = AccessPolicy::new()
    .with("scraper-1", Role::Ingestion)
    .with("analyst", Role::Reporting);
  Gate::new(Arc::new(store), policy)
}

fn scraper() -> Principal { Principal::new("scraper-1", Role::Ingestion) }
fn analyst() -> Principal { Principal::new("analyst", Role::Reporting) }

fn capture(county: &str) -> Capture {
  Capture {
    tag:         JurisdictionTag::county_level("US", "FL", county),
    url:         "https://floridahealth.gov/cases".into(),
    raw_text:    format!("<html>{county}: 120 cases</html>"),
    captured_at: Utc::now(),
    metrics:     Metrics { cases: Some(120), ..Default::default() },
  }
}

// ─── Authorization ───────────────────────────────────────────────────────────

#[tokio::test]
async fn reporting_principal_cannot_write() {
  let gate = gate().await;

  let err = IngestRun::open(gate.clone(), analyst(), TIMEOUT)
    .await
    .err()
    .unwrap();
  assert!(err.is_unauthorized());

  // Nothing was written: a run opened by an ingestion principal still
  // starts with an empty group.
  let run = IngestRun::open(gate.clone(), scraper(), TIMEOUT).await.unwrap();

  // A direct record attempt is refused before any reference is checked.
  let err = gate
    .record_raw(&analyst(), caseline_core::observation::NewRawObservation {
      tag:         JurisdictionTag::state_level("US", "FL"),
      url:         "https://floridahealth.gov/cases".into(),
      page_id:     uuid::Uuid::new_v4(),
      group_id:    run.group().group_id,
      captured_at: Utc::now(),
      metrics:     Metrics::default(),
    })
    .await
    .err()
    .unwrap();
  assert!(err.is_unauthorized());

  let raws = gate
    .raw_observations(&scraper(), run.group().group_id)
    .await
    .unwrap();
  assert!(raws.is_empty());
}

#[tokio::test]
async fn unknown_principal_has_no_capabilities() {
  let gate = gate().await;
  let intruder = Principal::new("nobody", Role::Ingestion);

  let err = gate
    .raw_observations(&intruder, 1)
    .await
    .err()
    .unwrap();
  assert!(err.is_unauthorized());
}

#[tokio::test]
async fn claimed_role_does_not_override_policy() {
  let gate = gate().await;

  // "analyst" is configured as reporting; a forged ingestion role on the
  // principal value must not grant write access.
  let forged = Principal::new("analyst", Role::Ingestion);
  let err = IngestRun::open(gate, forged, TIMEOUT).await.err().unwrap();
  assert!(err.is_unauthorized());
}

#[tokio::test]
async fn registry_writes_are_refused_for_both_roles() {
  let gate = gate().await;
  assert!(gate.seed_registry(&scraper()).await.err().unwrap().is_unauthorized());
  assert!(gate.seed_registry(&analyst()).await.err().unwrap().is_unauthorized());
}

#[tokio::test]
async fn both_roles_read_registry_and_observations() {
  let gate = gate().await;

  for principal in [scraper(), analyst()] {
    let urls = gate.source_urls(&principal).await.unwrap();
    assert_eq!(urls.len(), 1);
    query_observations(&gate, &principal, &ObservationQuery::default())
      .await
      .unwrap();
  }
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_then_normalize_writes_county_row() {
  let gate = gate().await;
  let run = IngestRun::open(gate.clone(), scraper(), TIMEOUT).await.unwrap();

  // Scraper spells the county with the apostrophe; tier 2 resolves it.
  let raw = run.submit_capture(capture("St. John's")).await.unwrap();
  let snapshot = gate.registry_snapshot(&scraper()).await.unwrap();
  let outcome = run.normalize_capture(&snapshot, &raw).await.unwrap();

  assert_eq!(
    outcome.resolution,
    Resolution::County {
      country_code: "US".into(),
      state_abbrev: "FL".into(),
      county_fips:  "12109".into(),
      county_name:  "St. Johns".into(),
    }
  );
  assert!(!outcome.duplicate);

  let obs = query_observations(&gate, &analyst(), &ObservationQuery {
    group_id: Some(run.group().group_id),
    ..Default::default()
  })
  .await
  .unwrap();
  assert_eq!(obs.counties.len(), 1);
  assert_eq!(obs.counties[0].metrics.cases, Some(120));
  assert_eq!(obs.counties[0].metrics.deaths, None);
  assert!(obs.states.is_empty());
}

#[tokio::test]
async fn state_level_capture_writes_state_row() {
  let gate = gate().await;
  let run = IngestRun::open(gate.clone(), scraper(), TIMEOUT).await.unwrap();

  let raw = run
    .submit_capture(Capture {
      tag:         JurisdictionTag::state_level("US", "Florida"),
      url:         "https://floridahealth.gov/cases".into(),
      raw_text:    "<html>state totals</html>".into(),
      captured_at: Utc::now(),
      metrics:     Metrics { cases: Some(4000), deaths: Some(12), ..Default::default() },
    })
    .await
    .unwrap();

  let report = run.normalize_group().await.unwrap();
  assert_eq!(report.state_rows, 1);
  assert_eq!(report.unresolved, 0);

  let obs = query_observations(&gate, &analyst(), &ObservationQuery {
    state: Some("FL".into()),
    ..Default::default()
  })
  .await
  .unwrap();
  assert_eq!(obs.states.len(), 1);
  assert_eq!(obs.states[0].raw_id, raw.observation_id);
}

#[tokio::test]
async fn tier_miss_stays_queued_and_writes_nothing() {
  let gate = gate().await;
  let run = IngestRun::open(gate.clone(), scraper(), TIMEOUT).await.unwrap();

  run.submit_capture(capture("Atlantis")).await.unwrap();
  let report = run.normalize_group().await.unwrap();
  assert_eq!(report.unresolved, 1);
  assert_eq!(report.county_rows, 0);

  let queued = gate
    .unresolved(&scraper(), run.group().group_id)
    .await
    .unwrap();
  assert_eq!(queued.len(), 1);

  let obs = query_observations(&gate, &analyst(), &ObservationQuery {
    group_id: Some(run.group().group_id),
    ..Default::default()
  })
  .await
  .unwrap();
  assert!(obs.counties.is_empty());
  assert!(obs.states.is_empty());
}

#[tokio::test]
async fn duplicate_jurisdiction_rows_drain_from_the_queue() {
  let gate = gate().await;
  let run = IngestRun::open(gate.clone(), scraper(), TIMEOUT).await.unwrap();

  // Two scrapes of the same county in one group. The later one carries
  // different text and numbers, so it is a distinct raw row.
  let first = run.submit_capture(capture("St. Johns")).await.unwrap();
  let mut later = capture("St. Johns");
  later.raw_text = "<html>St. Johns: 140 cases (evening)</html>".into();
  later.metrics.cases = Some(140);
  later.captured_at = first.captured_at + chrono::Duration::hours(1);
  run.submit_capture(later).await.unwrap();

  let report = run.normalize_group().await.unwrap();
  assert_eq!(report.county_rows, 1);
  assert_eq!(report.duplicates, 1);
  assert_eq!(report.unresolved, 0);

  // Both rows left the queue; only the first occupies the slot.
  let queued = gate
    .unresolved(&scraper(), run.group().group_id)
    .await
    .unwrap();
  assert!(queued.is_empty());

  let obs = query_observations(&gate, &analyst(), &ObservationQuery {
    group_id: Some(run.group().group_id),
    ..Default::default()
  })
  .await
  .unwrap();
  assert_eq!(obs.counties.len(), 1);
  assert_eq!(obs.counties[0].raw_id, first.observation_id);
  assert_eq!(obs.counties[0].metrics.cases, Some(120));

  // Nothing left for a later pass to re-report.
  let second = run.normalize_group().await.unwrap();
  assert_eq!(second.county_rows, 0);
  assert_eq!(second.duplicates, 0);
  assert_eq!(second.unresolved, 0);
}

#[tokio::test]
async fn normalize_group_is_idempotent() {
  let gate = gate().await;
  let run = IngestRun::open(gate.clone(), scraper(), TIMEOUT).await.unwrap();

  run.submit_capture(capture("St. Johns")).await.unwrap();
  let first = run.normalize_group().await.unwrap();
  assert_eq!(first.county_rows, 1);

  // Second pass has nothing left to do.
  let second = run.normalize_group().await.unwrap();
  assert_eq!(second.county_rows, 0);
  assert_eq!(second.unresolved, 0);
}

#[tokio::test]
async fn attach_to_missing_group_returns_none() {
  let gate = gate().await;
  let run = IngestRun::attach(gate, scraper(), 404, TIMEOUT).await.unwrap();
  assert!(run.is_none());
}
