//! HTTP Basic-auth extractor mapping credentials to a named principal.

use std::collections::HashMap;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use caseline_core::{
  role::{Principal, Role},
  store::ScrapeStore,
};

use crate::{AppState, error::Error};

/// One configured account.
#[derive(Clone)]
pub struct Account {
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub role:          Role,
}

/// Credentials accepted as valid for this server instance.
#[derive(Clone, Default)]
pub struct AuthConfig {
  accounts: HashMap<String, Account>,
}

impl AuthConfig {
  pub fn new() -> Self { Self::default() }

  pub fn add(&mut self, name: impl Into<String>, account: Account) {
    self.accounts.insert(name.into(), account);
  }

  pub fn with(mut self, name: impl Into<String>, account: Account) -> Self {
    self.add(name, account);
    self
  }
}

/// Verify credentials directly from headers and resolve the principal.
pub fn verify_auth(
  headers: &HeaderMap,
  config: &AuthConfig,
) -> Result<Principal, Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  let account = config.accounts.get(username).ok_or(Error::Unauthorized)?;

  let parsed_hash =
    PasswordHash::new(&account.password_hash).map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(Principal::new(username, account.role))
}

/// Extractor: present in a handler means the request carried valid
/// credentials for the wrapped principal.
pub struct Authed(pub Principal);

impl<S> FromRequestParts<AppState<S>> for Authed
where
  S: ScrapeStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let principal = verify_auth(&parts.headers, &state.auth)?;
    Ok(Authed(principal))
  }
}
