//! Handler for `GET /observations`.
//!
//! Optional query params: `country`, `state`, `county_fips`, `group_id`,
//! `since`, `until` (RFC 3339), `limit`. Returns canonical rows at both
//! levels; available to both roles.

use axum::{
  Json,
  extract::{Query, State},
};
use caseline_core::store::{ObservationQuery, ScrapeStore};
use caseline_ingest::{Observations, run::query_observations};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{AppState, auth::Authed, error::Error};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub country:     Option<String>,
  /// Postal abbreviation of the canonical state.
  pub state:       Option<String>,
  pub county_fips: Option<String>,
  pub group_id:    Option<i64>,
  pub since:       Option<DateTime<Utc>>,
  pub until:       Option<DateTime<Utc>>,
  pub limit:       Option<usize>,
}

impl From<ListParams> for ObservationQuery {
  fn from(p: ListParams) -> Self {
    ObservationQuery {
      country:     p.country,
      state:       p.state,
      county_fips: p.county_fips,
      group_id:    p.group_id,
      since:       p.since,
      until:       p.until,
      limit:       p.limit,
    }
  }
}

/// `GET /observations?state=FL&since=...`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Authed(principal): Authed,
  Query(params): Query<ListParams>,
) -> Result<Json<Observations>, Error>
where
  S: ScrapeStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let query = ObservationQuery::from(params);
  Ok(Json(query_observations(&state.gate, &principal, &query).await?))
}
