//! Handlers for `/groups` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/groups` | Open a scrape group; ingestion role only |
//! | `POST` | `/groups/:id/captures` | Body: [`Capture`]; `?normalize=true` runs the mapper inline |
//! | `POST` | `/groups/:id/normalize` | Deferred normalization pass over the group |
//! | `GET`  | `/groups/:id/unresolved` | Raw rows still queued for resolution |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use caseline_core::{
  group::ScrapeGroup,
  observation::RawObservation,
  resolve::Resolution,
  store::ScrapeStore,
};
use caseline_ingest::{Capture, IngestRun, NormalizeReport};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::Error};

/// `POST /groups` — returns 201 + the allocated group.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  crate::auth::Authed(principal): crate::auth::Authed,
) -> Result<impl IntoResponse, Error>
where
  S: ScrapeStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let run =
    IngestRun::open(state.gate.clone(), principal, state.timeout).await?;
  let group: ScrapeGroup = run.group().clone();
  Ok((StatusCode::CREATED, Json(group)))
}

#[derive(Debug, Deserialize)]
pub struct SubmitParams {
  /// If `true`, run the jurisdiction mapper inline after recording.
  #[serde(default)]
  pub normalize: bool,
}

/// What `POST /groups/:id/captures` returns.
#[derive(Debug, Serialize)]
pub struct CaptureOutcome {
  pub observation: RawObservation,
  /// Present only when `?normalize=true` was requested.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub resolution:  Option<Resolution>,
  /// `true` when the slot was already owned by an earlier raw row.
  pub duplicate:   bool,
}

/// `POST /groups/:id/captures?normalize=true`
pub async fn submit<S>(
  State(state): State<AppState<S>>,
  crate::auth::Authed(principal): crate::auth::Authed,
  Path(group_id): Path<i64>,
  Query(params): Query<SubmitParams>,
  Json(capture): Json<Capture>,
) -> Result<impl IntoResponse, Error>
where
  S: ScrapeStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let run = attach(&state, principal.clone(), group_id).await?;
  let observation = run.submit_capture(capture).await?;

  let (resolution, duplicate) = if params.normalize {
    let snapshot = state.gate.registry_snapshot(&principal).await?;
    let outcome = run.normalize_capture(&snapshot, &observation).await?;
    (Some(outcome.resolution), outcome.duplicate)
  } else {
    (None, false)
  };

  Ok((
    StatusCode::CREATED,
    Json(CaptureOutcome { observation, resolution, duplicate }),
  ))
}

/// `POST /groups/:id/normalize` — deferred pass; returns outcome counts.
pub async fn normalize<S>(
  State(state): State<AppState<S>>,
  crate::auth::Authed(principal): crate::auth::Authed,
  Path(group_id): Path<i64>,
) -> Result<Json<NormalizeReport>, Error>
where
  S: ScrapeStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let run = attach(&state, principal, group_id).await?;
  Ok(Json(run.normalize_group().await?))
}

/// `GET /groups/:id/unresolved`
pub async fn unresolved<S>(
  State(state): State<AppState<S>>,
  crate::auth::Authed(principal): crate::auth::Authed,
  Path(group_id): Path<i64>,
) -> Result<Json<Vec<RawObservation>>, Error>
where
  S: ScrapeStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if state.gate.get_group(&principal, group_id).await?.is_none() {
    return Err(Error::NotFound(format!("scrape group {group_id} not found")));
  }
  Ok(Json(state.gate.unresolved(&principal, group_id).await?))
}

async fn attach<S>(
  state: &AppState<S>,
  principal: caseline_core::role::Principal,
  group_id: i64,
) -> Result<IngestRun<S>, Error>
where
  S: ScrapeStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  IngestRun::attach(state.gate.clone(), principal, group_id, state.timeout)
    .await?
    .ok_or_else(|| Error::NotFound(format!("scrape group {group_id} not found")))
}
