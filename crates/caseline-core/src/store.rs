//! The `ScrapeStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `caseline-store-sqlite`). Higher layers (`caseline-ingest`,
//! `caseline-server`) depend on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  group::ScrapeGroup,
  observation::{
    CountyObservation, NewCountyObservation, NewRawObservation,
    NewStateObservation, RawObservation, StateObservation,
  },
  page::{NewPage, Page},
  registry::{RegistrySeed, RegistrySnapshot, SourceUrl},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for the canonical observation reads.
#[derive(Debug, Clone, Default)]
pub struct ObservationQuery {
  pub country:     Option<String>,
  /// Postal abbreviation of the canonical state.
  pub state:       Option<String>,
  /// County FIPS code; only meaningful for county reads.
  pub county_fips: Option<String>,
  /// Restrict to a single scrape group.
  pub group_id:    Option<i64>,
  /// Inclusive bounds on `captured_at`.
  pub since:       Option<DateTime<Utc>>,
  pub until:       Option<DateTime<Utc>>,
  pub limit:       Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a caseline storage backend.
///
/// Pages, scrape groups, and raw observations are append-only. Canonical
/// observation writes are idempotent per `(jurisdiction, scrape group)`;
/// a repeat write bumps `updated_at` and never overwrites committed
/// metric values.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ScrapeStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Page archive ──────────────────────────────────────────────────────

  /// Archive a captured page, deduplicating on content hash. Identical
  /// content returns the already-stored [`Page`]; concurrent callers with
  /// the same content resolve to exactly one row.
  fn archive_page(
    &self,
    input: NewPage,
  ) -> impl Future<Output = Result<Page, Self::Error>> + Send + '_;

  fn get_page(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Page>, Self::Error>> + Send + '_;

  // ── Scrape group sequencer ────────────────────────────────────────────

  /// Atomically allocate the next group id. Ids issued later are always
  /// numerically greater and are never reused across restarts.
  fn new_group(
    &self,
  ) -> impl Future<Output = Result<ScrapeGroup, Self::Error>> + Send + '_;

  fn get_group(
    &self,
    group_id: i64,
  ) -> impl Future<Output = Result<Option<ScrapeGroup>, Self::Error>> + Send + '_;

  // ── Raw observations — append-only ────────────────────────────────────

  /// Record one scraped measurement set. Fails with a dangling-reference
  /// error if the page or group does not exist.
  fn record_raw(
    &self,
    input: NewRawObservation,
  ) -> impl Future<Output = Result<RawObservation, Self::Error>> + Send + '_;

  /// All raw observations captured under `group_id`.
  fn raw_observations(
    &self,
    group_id: i64,
  ) -> impl Future<Output = Result<Vec<RawObservation>, Self::Error>> + Send + '_;

  /// Raw observations in `group_id` not yet attached to a canonical
  /// slot — the deferred-work queue of the normalization mapper. A raw
  /// row leaves the queue when it owns a canonical row or when it is
  /// recorded as a duplicate of an already-occupied slot.
  fn unresolved(
    &self,
    group_id: i64,
  ) -> impl Future<Output = Result<Vec<RawObservation>, Self::Error>> + Send + '_;

  // ── Canonical observations ────────────────────────────────────────────

  fn put_state_observation(
    &self,
    input: NewStateObservation,
  ) -> impl Future<Output = Result<StateObservation, Self::Error>> + Send + '_;

  fn put_county_observation(
    &self,
    input: NewCountyObservation,
  ) -> impl Future<Output = Result<CountyObservation, Self::Error>> + Send + '_;

  fn state_observations(
    &self,
    query: &ObservationQuery,
  ) -> impl Future<Output = Result<Vec<StateObservation>, Self::Error>> + Send;

  fn county_observations(
    &self,
    query: &ObservationQuery,
  ) -> impl Future<Output = Result<Vec<CountyObservation>, Self::Error>> + Send;

  // ── Reference registry ────────────────────────────────────────────────

  /// One-shot bootstrap load of the static tables. Exposed on the raw
  /// store only; the access gate refuses it for both runtime roles.
  fn seed_registry(
    &self,
    seed: RegistrySeed,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Immutable snapshot of the registry for the resolver.
  fn registry_snapshot(
    &self,
  ) -> impl Future<Output = Result<RegistrySnapshot, Self::Error>> + Send + '_;

  /// Registry of where each jurisdiction's data is fetched from.
  fn source_urls(
    &self,
  ) -> impl Future<Output = Result<Vec<SourceUrl>, Self::Error>> + Send + '_;
}
