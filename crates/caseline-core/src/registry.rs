//! The reference registry — static lookup tables for the canonical
//! geographic hierarchy (country → state → county), FIPS codes, alternate
//! spellings, per-jurisdiction source URLs, and timezones.
//!
//! Seeded once at bootstrap, read by everything above it. The resolver
//! works on an immutable [`RegistrySnapshot`] so jurisdiction matching is
//! a pure function, unit-testable without a live database.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::observation::JurisdictionTag;
use crate::resolve::Resolution;

// ─── Canonical rows ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
  /// ISO-style code, e.g. `"US"`.
  pub code: String,
  pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
  /// Postal abbreviation, e.g. `"VA"`.
  pub abbrev:       String,
  pub name:         String,
  pub country_code: String,
  /// Two-digit state FIPS prefix, where assigned.
  pub fips_prefix:  Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct County {
  /// Five-digit FIPS code; the canonical join key.
  pub fips:              String,
  pub name:              String,
  pub state_abbrev:      String,
  /// A second accepted spelling, e.g. `"St. John's"` for `"St. Johns"`.
  pub alternate_name:    Option<String>,
  /// A spelling some source uses that matches nothing standard.
  pub non_standard_name: Option<String>,
}

/// Auxiliary resolution table; may hold several spellings for one county.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FipsLookupEntry {
  pub state_abbrev:   String,
  pub county_name:    String,
  pub fips:           String,
  pub alternate_name: Option<String>,
}

/// Where a jurisdiction's data is fetched from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUrl {
  pub country_code: String,
  pub state_abbrev: String,
  pub url:          String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimezoneEntry {
  pub state_abbrev: String,
  /// IANA timezone name, e.g. `"America/New_York"`.
  pub timezone:     String,
}

/// Everything needed to seed the registry in one shot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySeed {
  pub countries: Vec<Country>,
  pub states:    Vec<State>,
  pub counties:  Vec<County>,
  pub fips_lut:  Vec<FipsLookupEntry>,
  pub urls:      Vec<SourceUrl>,
  pub timezones: Vec<TimezoneEntry>,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Immutable, case-folded view of the registry used for resolution.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
  countries:        HashMap<String, Country>,
  states_by_abbrev: HashMap<String, State>,
  /// lowercased display name → abbrev
  states_by_name:   HashMap<String, String>,
  counties_by_fips: HashMap<String, County>,
  /// (abbrev, folded county name) → fips, one index per resolution tier
  name_idx:         HashMap<(String, String), String>,
  alternate_idx:    HashMap<(String, String), String>,
  non_standard_idx: HashMap<(String, String), String>,
  fips_lut_idx:     HashMap<(String, String), String>,
}

/// Collapse whitespace and case so scraped spellings compare cleanly.
pub fn fold_name(name: &str) -> String {
  name
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

impl RegistrySnapshot {
  pub fn from_rows(
    countries: Vec<Country>,
    states: Vec<State>,
    counties: Vec<County>,
    fips_lut: Vec<FipsLookupEntry>,
  ) -> Self {
    let mut snap = Self::default();

    for c in countries {
      snap.countries.insert(c.code.to_uppercase(), c);
    }
    for s in states {
      snap
        .states_by_name
        .insert(fold_name(&s.name), s.abbrev.to_uppercase());
      snap.states_by_abbrev.insert(s.abbrev.to_uppercase(), s);
    }
    for c in counties {
      let abbrev = c.state_abbrev.to_uppercase();
      snap
        .name_idx
        .insert((abbrev.clone(), fold_name(&c.name)), c.fips.clone());
      if let Some(alt) = &c.alternate_name {
        snap
          .alternate_idx
          .insert((abbrev.clone(), fold_name(alt)), c.fips.clone());
      }
      if let Some(ns) = &c.non_standard_name {
        snap
          .non_standard_idx
          .insert((abbrev.clone(), fold_name(ns)), c.fips.clone());
      }
      snap.counties_by_fips.insert(c.fips.clone(), c);
    }
    for e in fips_lut {
      let abbrev = e.state_abbrev.to_uppercase();
      if let Some(alt) = &e.alternate_name {
        snap
          .fips_lut_idx
          .insert((abbrev.clone(), fold_name(alt)), e.fips.clone());
      }
      // The primary lut spelling also resolves, cross-referenced by state.
      snap
        .fips_lut_idx
        .insert((abbrev, fold_name(&e.county_name)), e.fips);
    }

    snap
  }

  pub fn country(&self, code: &str) -> Option<&Country> {
    self.countries.get(&code.to_uppercase())
  }

  /// Look a state up by postal abbreviation or display name.
  pub fn state(&self, name_or_abbrev: &str) -> Option<&State> {
    let upper = name_or_abbrev.trim().to_uppercase();
    if let Some(s) = self.states_by_abbrev.get(&upper) {
      return Some(s);
    }
    self
      .states_by_name
      .get(&fold_name(name_or_abbrev))
      .and_then(|ab| self.states_by_abbrev.get(ab))
  }

  pub fn county_by_fips(&self, fips: &str) -> Option<&County> {
    self.counties_by_fips.get(fips)
  }

  /// Resolve a free-text jurisdiction tag to canonical identifiers.
  ///
  /// Tier order within the tag's state: exact display name, county
  /// `alternate_name`, county `non_standard_name`, then the fips_lut
  /// spellings joined back by FIPS. A state-level tag resolves when the
  /// state itself matches. Anything else is [`Resolution::Unresolved`] —
  /// never dropped, never forced onto an arbitrary county.
  pub fn resolve(&self, tag: &JurisdictionTag) -> Resolution {
    let Some(state) = self.state(&tag.state) else {
      return Resolution::Unresolved;
    };
    if !tag.country.trim().is_empty()
      && !state.country_code.eq_ignore_ascii_case(tag.country.trim())
    {
      return Resolution::Unresolved;
    }

    let Some(raw_county) = &tag.county else {
      return Resolution::State {
        country_code: state.country_code.clone(),
        state_abbrev: state.abbrev.clone(),
      };
    };

    let key = (state.abbrev.to_uppercase(), fold_name(raw_county));
    let fips = self
      .name_idx
      .get(&key)
      .or_else(|| self.alternate_idx.get(&key))
      .or_else(|| self.non_standard_idx.get(&key))
      .or_else(|| self.fips_lut_idx.get(&key));

    match fips.and_then(|f| self.counties_by_fips.get(f)) {
      Some(county) => Resolution::County {
        country_code: state.country_code.clone(),
        state_abbrev: state.abbrev.clone(),
        county_fips:  county.fips.clone(),
        county_name:  county.name.clone(),
      },
      None => Resolution::Unresolved,
    }
  }
}
