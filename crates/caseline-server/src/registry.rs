//! Handlers for read-only registry endpoints.

use axum::{Json, extract::State};
use caseline_core::{registry::SourceUrl, store::ScrapeStore};

use crate::{AppState, auth::Authed, error::Error};

/// `GET /registry/urls` — where each jurisdiction's data is fetched from.
pub async fn urls<S>(
  State(state): State<AppState<S>>,
  Authed(principal): Authed,
) -> Result<Json<Vec<SourceUrl>>, Error>
where
  S: ScrapeStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Ok(Json(state.gate.source_urls(&principal).await?))
}
