//! Resolution outcome of the normalization mapper.
//!
//! The four-tier matching itself lives on
//! [`RegistrySnapshot::resolve`](crate::registry::RegistrySnapshot::resolve);
//! this module holds the outcome type and the resolver's unit tests.

use serde::{Deserialize, Serialize};

/// What a free-text jurisdiction tag resolved to.
///
/// `Unresolved` is an outcome, not an error: the raw observation stays
/// queued for a deferred pass once the registry learns the spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum Resolution {
  State {
    country_code: String,
    state_abbrev: String,
  },
  County {
    country_code: String,
    state_abbrev: String,
    county_fips:  String,
    county_name:  String,
  },
  Unresolved,
}

impl Resolution {
  pub fn is_unresolved(&self) -> bool { matches!(self, Self::Unresolved) }
}
