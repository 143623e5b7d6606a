//! JSON REST server for caseline.
//!
//! Exposes an axum [`Router`] backed by any
//! [`caseline_core::store::ScrapeStore`], with every route behind HTTP
//! Basic auth. Verified credentials resolve to a named principal whose
//! configured role the ingestion gate enforces: scraper accounts write,
//! reporting accounts read.

pub mod auth;
pub mod error;
pub mod groups;
pub mod observations;
pub mod registry;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{get, post},
};
use caseline_core::{
  role::{AccessPolicy, Role},
  store::ScrapeStore,
};
use caseline_ingest::Gate;
use serde::Deserialize;

use auth::{Account, AuthConfig};

// ─── Configuration ───────────────────────────────────────────────────────────

/// One account in the server's principal table.
#[derive(Deserialize, Clone)]
pub struct PrincipalEntry {
  pub name:          String,
  pub role:          Role,
  /// argon2 PHC string; generate with `--hash-password`.
  pub password_hash: String,
}

/// Runtime server configuration, deserialised from `config.toml` layered
/// with `CASELINE_`-prefixed environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// JSON registry seed applied at startup, before the gate exists.
  #[serde(default)]
  pub seed_path:  Option<PathBuf>,
  /// Upper bound on any single storage call made by a request.
  #[serde(default = "default_timeout_secs")]
  pub request_timeout_secs: u64,
  pub principals: Vec<PrincipalEntry>,
}

fn default_timeout_secs() -> u64 { 10 }

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub gate:    Gate<S>,
  pub auth:    Arc<AuthConfig>,
  pub timeout: Duration,
}

impl<S> AppState<S>
where
  S: ScrapeStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  /// Derive the gate policy and the auth table from the configured
  /// principal list.
  pub fn new(store: Arc<S>, config: &ServerConfig) -> Self {
    let mut policy = AccessPolicy::new();
    let mut auth = AuthConfig::new();
    for entry in &config.principals {
      policy.grant(&entry.name, entry.role);
      auth.add(&entry.name, Account {
        password_hash: entry.password_hash.clone(),
        role:          entry.role,
      });
    }
    Self {
      gate:    Gate::new(store, policy),
      auth:    Arc::new(auth),
      timeout: Duration::from_secs(config.request_timeout_secs),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the caseline [`Router`]. Every route requires Basic auth.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ScrapeStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .route("/groups", post(groups::create::<S>))
    .route("/groups/{id}/captures", post(groups::submit::<S>))
    .route("/groups/{id}/normalize", post(groups::normalize::<S>))
    .route("/groups/{id}/unresolved", get(groups::unresolved::<S>))
    .route("/observations", get(observations::list::<S>))
    .route("/registry/urls", get(registry::urls::<S>))
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use caseline_core::registry::{
    Country, County, RegistrySeed, SourceUrl, State,
  };
  use caseline_core::store::ScrapeStore as _;
  use caseline_store_sqlite::SqliteStore;
  use rand_core::OsRng;
  use tower::ServiceExt as _;

  fn hash(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string()
  }

  fn seed() -> RegistrySeed {
    RegistrySeed {
      countries: vec![Country {
        code: "US".into(),
        name: "United States".into(),
      }],
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
      fips_lut:  vec![],
      urls:      vec![SourceUrl {
        country_code: "US".into(),
        state_abbrev: "FL".into(),
        url:          "https://floridahealth.gov/cases".into(),
      }],
      timezones: vec![],
    }
  }

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store.seed_registry(seed()).await.unwrap();

    let config = ServerConfig {
      host:                 "127.0.0.1".into(),
      port:                 8080,
      store_path:           PathBuf::from(":memory:"),
      seed_path:            None,
      request_timeout_secs: 5,
      principals:           vec![
        PrincipalEntry {
          name:          "scraper-1".into(),
          role:          Role::Ingestion,
          password_hash: hash("scrape-pass"),
        },
        PrincipalEntry {
          name:          "analyst".into(),
          role:          Role::Reporting,
          password_hash: hash("report-pass"),
        },
      ],
    };
    AppState::new(Arc::new(store), &config)
  }

  fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  async fn oneshot(
    state: AppState<SqliteStore>,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: &str,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
      builder = builder.header(header::AUTHORIZATION, auth);
    }
    if !body.is_empty() {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    router(state).oneshot(req).await.unwrap()
  }

  async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn capture_body(county: &str, cases: i64) -> String {
    serde_json::json!({
      "tag": { "country": "US", "state": "FL", "county": county },
      "url": "https://floridahealth.gov/cases",
      "raw_text": format!("<html>{county}: {cases}</html>"),
      "captured_at": "2020-03-14T12:00:00Z",
      "metrics": { "cases": cases }
    })
    .to_string()
  }

  // ── Auth ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn unauthenticated_requests_return_401() {
    let state = make_state().await;
    let resp = oneshot(state, "GET", "/observations", None, "").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn reporting_account_cannot_open_groups() {
    let state = make_state().await;
    let auth = basic("analyst", "report-pass");
    let resp = oneshot(state, "POST", "/groups", Some(&auth), "").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  // ── Full flow ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn capture_normalize_and_query_round_trip() {
    let state = make_state().await;
    let scraper = basic("scraper-1", "scrape-pass");
    let analyst = basic("analyst", "report-pass");

    let resp =
      oneshot(state.clone(), "POST", "/groups", Some(&scraper), "").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let group_id = json_body(resp).await["group_id"].as_i64().unwrap();

    // Inline normalization resolves the apostrophe spelling.
    let resp = oneshot(
      state.clone(),
      "POST",
      &format!("/groups/{group_id}/captures?normalize=true"),
      Some(&scraper),
      &capture_body("St. John's", 120),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let outcome = json_body(resp).await;
    assert_eq!(outcome["resolution"]["level"], "county");
    assert_eq!(outcome["resolution"]["county_fips"], "12109");

    let resp = oneshot(
      state.clone(),
      "GET",
      &format!("/groups/{group_id}/unresolved"),
      Some(&scraper),
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 0);

    // The reporting account reads the canonical rows.
    let resp = oneshot(
      state,
      "GET",
      &format!("/observations?group_id={group_id}"),
      Some(&analyst),
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let obs = json_body(resp).await;
    assert_eq!(obs["counties"].as_array().unwrap().len(), 1);
    assert_eq!(obs["counties"][0]["metrics"]["cases"], 120);
    assert!(obs["counties"][0]["metrics"]["deaths"].is_null());
  }

  #[tokio::test]
  async fn deferred_normalization_pass_reports_counts() {
    let state = make_state().await;
    let scraper = basic("scraper-1", "scrape-pass");

    let resp =
      oneshot(state.clone(), "POST", "/groups", Some(&scraper), "").await;
    let group_id = json_body(resp).await["group_id"].as_i64().unwrap();

    for county in ["St. Johns", "Atlantis"] {
      let resp = oneshot(
        state.clone(),
        "POST",
        &format!("/groups/{group_id}/captures"),
        Some(&scraper),
        &capture_body(county, 10),
      )
      .await;
      assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = oneshot(
      state.clone(),
      "POST",
      &format!("/groups/{group_id}/normalize"),
      Some(&scraper),
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let report = json_body(resp).await;
    assert_eq!(report["county_rows"], 1);
    assert_eq!(report["duplicates"], 0);
    assert_eq!(report["unresolved"], 1);

    // The miss stays queued.
    let resp = oneshot(
      state,
      "GET",
      &format!("/groups/{group_id}/unresolved"),
      Some(&scraper),
      "",
    )
    .await;
    let queued = json_body(resp).await;
    assert_eq!(queued.as_array().unwrap().len(), 1);
    assert_eq!(queued[0]["tag"]["county"], "Atlantis");
  }

  // ── Edge cases ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn capture_against_missing_group_returns_404() {
    let state = make_state().await;
    let scraper = basic("scraper-1", "scrape-pass");
    let resp = oneshot(
      state,
      "POST",
      "/groups/404/captures",
      Some(&scraper),
      &capture_body("St. Johns", 1),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn empty_page_text_returns_400() {
    let state = make_state().await;
    let scraper = basic("scraper-1", "scrape-pass");

    let resp =
      oneshot(state.clone(), "POST", "/groups", Some(&scraper), "").await;
    let group_id = json_body(resp).await["group_id"].as_i64().unwrap();

    let body = serde_json::json!({
      "tag": { "country": "US", "state": "FL", "county": "St. Johns" },
      "url": "https://floridahealth.gov/cases",
      "raw_text": "   ",
      "captured_at": "2020-03-14T12:00:00Z",
      "metrics": {}
    })
    .to_string();
    let resp = oneshot(
      state,
      "POST",
      &format!("/groups/{group_id}/captures"),
      Some(&scraper),
      &body,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn registry_urls_are_readable_by_both_roles() {
    let state = make_state().await;
    for auth in
      [basic("scraper-1", "scrape-pass"), basic("analyst", "report-pass")]
    {
      let resp = oneshot(
        state.clone(),
        "GET",
        "/registry/urls",
        Some(&auth),
        "",
      )
      .await;
      assert_eq!(resp.status(), StatusCode::OK);
      let urls = json_body(resp).await;
      assert_eq!(urls.as_array().unwrap().len(), 1);
      assert_eq!(urls[0]["state_abbrev"], "FL");
    }
  }
}
