//! Principals and the two role families.
//!
//! SQLite has no native roles, so the grant surface of the persisted
//! schema becomes an explicit `{principal -> role}` mapping checked at the
//! storage boundary. Ingestion principals write the scraping tables and
//! read the registry; reporting principals read everything and write
//! nothing. Neither role writes the registry — seeding is a bootstrap
//! operation below the access boundary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Ingestion,
  Reporting,
}

impl Role {
  /// Whether this role may write the scraping schema (pages, groups, raw
  /// and canonical observation tables).
  pub fn can_write_scraping(self) -> bool {
    matches!(self, Role::Ingestion)
  }
}

/// A named caller with exactly one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub name: String,
  pub role: Role,
}

impl Principal {
  pub fn new(name: impl Into<String>, role: Role) -> Self {
    Self { name: name.into(), role }
  }
}

/// The statically-configured principal table.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
  principals: HashMap<String, Role>,
}

impl AccessPolicy {
  pub fn new() -> Self { Self::default() }

  pub fn grant(&mut self, name: impl Into<String>, role: Role) {
    self.principals.insert(name.into(), role);
  }

  pub fn with(mut self, name: impl Into<String>, role: Role) -> Self {
    self.grant(name, role);
    self
  }

  /// Look a named principal up; unknown names have no capabilities.
  pub fn principal(&self, name: &str) -> Option<Principal> {
    self
      .principals
      .get(name)
      .map(|role| Principal::new(name, *role))
  }
}
