//! The access-control boundary in front of a [`ScrapeStore`].
//!
//! The persisted schema has two grant families: ingestion principals
//! write the scraping tables and read the registry; reporting principals
//! read everything and write nothing. SQLite cannot express that, so the
//! gate checks the caller's configured role before every delegated call.
//! Registry writes are refused for both roles; seeding happens against
//! the raw store at bootstrap, below this boundary.
//!
//! Checks are schema-level only. There is no row-level restriction: a
//! principal that may read the scraping tables may read every row in
//! them.

use std::sync::Arc;

use caseline_core::{
  group::ScrapeGroup,
  observation::{
    CountyObservation, NewCountyObservation, NewRawObservation,
    NewStateObservation, RawObservation, StateObservation,
  },
  page::{NewPage, Page},
  registry::{RegistrySnapshot, SourceUrl},
  role::{AccessPolicy, Principal, Role},
  store::{ObservationQuery, ScrapeStore},
};
use uuid::Uuid;

use crate::{Error, Result};

/// Role-checking wrapper around any storage backend.
#[derive(Clone)]
pub struct Gate<S> {
  store:  Arc<S>,
  policy: AccessPolicy,
}

impl<S> Gate<S>
where
  S: ScrapeStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(store: Arc<S>, policy: AccessPolicy) -> Self {
    Self { store, policy }
  }

  /// Resolve a caller name against the configured policy. Unknown names
  /// have no capabilities.
  pub fn principal(&self, name: &str) -> Option<Principal> {
    self.policy.principal(name)
  }

  /// The policy is authoritative: the caller's role is whatever the
  /// configuration says it is today, not what the `Principal` value
  /// claims.
  fn role_of(
    &self,
    principal: &Principal,
    operation: &'static str,
  ) -> Result<Role> {
    self
      .policy
      .principal(&principal.name)
      .map(|p| p.role)
      .ok_or_else(|| {
        Error::Core(caseline_core::Error::Unauthorized {
          principal: principal.name.clone(),
          operation,
        })
      })
  }

  fn authorize_write(
    &self,
    principal: &Principal,
    operation: &'static str,
  ) -> Result<()> {
    let role = self.role_of(principal, operation)?;
    if role.can_write_scraping() {
      Ok(())
    } else {
      Err(Error::Core(caseline_core::Error::Unauthorized {
        principal: principal.name.clone(),
        operation,
      }))
    }
  }

  fn authorize_read(
    &self,
    principal: &Principal,
    operation: &'static str,
  ) -> Result<()> {
    // Both roles read everything; the caller just has to be known.
    self.role_of(principal, operation).map(|_| ())
  }

  // ── Writes (ingestion role) ───────────────────────────────────────────

  pub async fn archive_page(
    &self,
    principal: &Principal,
    input: NewPage,
  ) -> Result<Page> {
    self.authorize_write(principal, "archive a page")?;
    self.store.archive_page(input).await.map_err(Error::store)
  }

  pub async fn new_group(&self, principal: &Principal) -> Result<ScrapeGroup> {
    self.authorize_write(principal, "open a scrape group")?;
    self.store.new_group().await.map_err(Error::store)
  }

  pub async fn record_raw(
    &self,
    principal: &Principal,
    input: NewRawObservation,
  ) -> Result<RawObservation> {
    self.authorize_write(principal, "record a raw observation")?;
    self.store.record_raw(input).await.map_err(Error::store)
  }

  pub async fn put_state_observation(
    &self,
    principal: &Principal,
    input: NewStateObservation,
  ) -> Result<StateObservation> {
    self.authorize_write(principal, "write a state observation")?;
    self
      .store
      .put_state_observation(input)
      .await
      .map_err(Error::store)
  }

  pub async fn put_county_observation(
    &self,
    principal: &Principal,
    input: NewCountyObservation,
  ) -> Result<CountyObservation> {
    self.authorize_write(principal, "write a county observation")?;
    self
      .store
      .put_county_observation(input)
      .await
      .map_err(Error::store)
  }

  /// Always refused. The registry is read-only to every runtime role;
  /// bootstrap seeding goes straight to the store before a gate exists.
  pub async fn seed_registry(&self, principal: &Principal) -> Result<()> {
    Err(Error::Core(caseline_core::Error::Unauthorized {
      principal: principal.name.clone(),
      operation: "write the reference registry",
    }))
  }

  // ── Reads (both roles) ────────────────────────────────────────────────

  pub async fn get_page(
    &self,
    principal: &Principal,
    id: Uuid,
  ) -> Result<Option<Page>> {
    self.authorize_read(principal, "read a page")?;
    self.store.get_page(id).await.map_err(Error::store)
  }

  pub async fn get_group(
    &self,
    principal: &Principal,
    group_id: i64,
  ) -> Result<Option<ScrapeGroup>> {
    self.authorize_read(principal, "read a scrape group")?;
    self.store.get_group(group_id).await.map_err(Error::store)
  }

  pub async fn raw_observations(
    &self,
    principal: &Principal,
    group_id: i64,
  ) -> Result<Vec<RawObservation>> {
    self.authorize_read(principal, "read raw observations")?;
    self
      .store
      .raw_observations(group_id)
      .await
      .map_err(Error::store)
  }

  pub async fn unresolved(
    &self,
    principal: &Principal,
    group_id: i64,
  ) -> Result<Vec<RawObservation>> {
    self.authorize_read(principal, "read the unresolved queue")?;
    self.store.unresolved(group_id).await.map_err(Error::store)
  }

  pub async fn state_observations(
    &self,
    principal: &Principal,
    query: &ObservationQuery,
  ) -> Result<Vec<StateObservation>> {
    self.authorize_read(principal, "read state observations")?;
    self
      .store
      .state_observations(query)
      .await
      .map_err(Error::store)
  }

  pub async fn county_observations(
    &self,
    principal: &Principal,
    query: &ObservationQuery,
  ) -> Result<Vec<CountyObservation>> {
    self.authorize_read(principal, "read county observations")?;
    self
      .store
      .county_observations(query)
      .await
      .map_err(Error::store)
  }

  pub async fn registry_snapshot(
    &self,
    principal: &Principal,
  ) -> Result<RegistrySnapshot> {
    self.authorize_read(principal, "read the reference registry")?;
    self.store.registry_snapshot().await.map_err(Error::store)
  }

  pub async fn source_urls(
    &self,
    principal: &Principal,
  ) -> Result<Vec<SourceUrl>> {
    self.authorize_read(principal, "read source urls")?;
    self.store.source_urls().await.map_err(Error::store)
  }
}
