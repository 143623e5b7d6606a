//! [`SqliteStore`] — the SQLite implementation of [`ScrapeStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use caseline_core::{
  group::ScrapeGroup,
  observation::{
    CountyObservation, NewCountyObservation, NewRawObservation,
    NewStateObservation, RawObservation, StateObservation,
  },
  page::{self, NewPage, Page},
  registry::{
    Country, County, FipsLookupEntry, RegistrySeed, RegistrySnapshot,
    SourceUrl, State,
  },
  store::{ObservationQuery, ScrapeStore},
};

use crate::{
  encode::{
    METRIC_COLUMNS, RawCountyObservation, RawPage, RawRawObservation,
    RawStateObservation, encode_dt, encode_uuid, metrics_from_row,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A caseline scrape store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Existence check for a raw write's references.
  /// Returns `(page_exists, group_exists)`.
  async fn check_references(
    &self,
    page_id: Uuid,
    group_id: i64,
  ) -> Result<(bool, bool)> {
    let page_str = encode_uuid(page_id);

    let pair = self
      .conn
      .call(move |conn| {
        let page: bool = conn
          .query_row(
            "SELECT 1 FROM scraping_pages WHERE page_id = ?1",
            rusqlite::params![page_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        let group: bool = conn
          .query_row(
            "SELECT 1 FROM scraping_scrape_group WHERE group_id = ?1",
            rusqlite::params![group_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        Ok((page, group))
      })
      .await?;

    Ok(pair)
  }
}

// ─── ScrapeStore impl ────────────────────────────────────────────────────────

impl ScrapeStore for SqliteStore {
  type Error = Error;

  // ── Page archive ──────────────────────────────────────────────────────────

  async fn archive_page(&self, input: NewPage) -> Result<Page> {
    input.validate().map_err(Error::Core)?;

    let hash = page::content_hash(&input.raw_text);
    let id_str = encode_uuid(Uuid::new_v4());
    let at_str = encode_dt(input.captured_at);
    let url = input.url;
    let raw_text = input.raw_text;

    let raw: RawPage = self
      .conn
      .call(move |conn| {
        // Conditional insert keyed by hash: the losing concurrent writer
        // hits the UNIQUE constraint as a no-op and falls back to the read.
        conn.execute(
          "INSERT INTO scraping_pages
             (page_id, url, raw_text, content_hash, captured_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(content_hash) DO NOTHING",
          rusqlite::params![id_str, url, raw_text, hash, at_str],
        )?;

        let row = conn.query_row(
          "SELECT page_id, url, raw_text, content_hash, captured_at
           FROM scraping_pages WHERE content_hash = ?1",
          rusqlite::params![hash],
          |row| {
            Ok(RawPage {
              page_id:      row.get(0)?,
              url:          row.get(1)?,
              raw_text:     row.get(2)?,
              content_hash: row.get(3)?,
              captured_at:  row.get(4)?,
            })
          },
        )?;
        Ok(row)
      })
      .await?;

    raw.into_page()
  }

  async fn get_page(&self, id: Uuid) -> Result<Option<Page>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPage> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT page_id, url, raw_text, content_hash, captured_at
               FROM scraping_pages WHERE page_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawPage {
                  page_id:      row.get(0)?,
                  url:          row.get(1)?,
                  raw_text:     row.get(2)?,
                  content_hash: row.get(3)?,
                  captured_at:  row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPage::into_page).transpose()
  }

  // ── Scrape group sequencer ────────────────────────────────────────────────

  async fn new_group(&self) -> Result<ScrapeGroup> {
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);

    // Allocation failure is fatal to the caller's ingestion run; the
    // single INSERT leaves no partial group behind.
    let group_id: i64 = self
      .conn
      .call(move |conn| {
        let id = conn.query_row(
          "INSERT INTO scraping_scrape_group (created_at)
           VALUES (?1) RETURNING group_id",
          rusqlite::params![at_str],
          |row| row.get(0),
        )?;
        Ok(id)
      })
      .await
      .map_err(|e| {
        Error::Core(caseline_core::Error::SequencerUnavailable(e.to_string()))
      })?;

    Ok(ScrapeGroup { group_id, created_at })
  }

  async fn get_group(&self, group_id: i64) -> Result<Option<ScrapeGroup>> {
    let at_str: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT created_at FROM scraping_scrape_group WHERE group_id = ?1",
              rusqlite::params![group_id],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    at_str
      .map(|s| {
        Ok(ScrapeGroup {
          group_id,
          created_at: crate::encode::decode_dt(&s)?,
        })
      })
      .transpose()
  }

  // ── Raw observations — append-only ────────────────────────────────────────

  async fn record_raw(&self, input: NewRawObservation) -> Result<RawObservation> {
    let (page_ok, group_ok) =
      self.check_references(input.page_id, input.group_id).await?;
    if !page_ok {
      return Err(Error::Core(caseline_core::Error::DanglingReference(
        format!("page {} does not exist", input.page_id),
      )));
    }
    if !group_ok {
      return Err(Error::Core(caseline_core::Error::DanglingReference(
        format!("scrape group {} does not exist", input.group_id),
      )));
    }

    let observation = RawObservation {
      observation_id: Uuid::new_v4(),
      tag:            input.tag,
      url:            input.url,
      page_id:        input.page_id,
      group_id:       input.group_id,
      captured_at:    input.captured_at,
      metrics:        input.metrics,
    };

    let id_str = encode_uuid(observation.observation_id);
    let country = observation.tag.country.clone();
    let state = observation.tag.state.clone();
    let county = observation.tag.county.clone();
    let url = observation.url.clone();
    let page_str = encode_uuid(observation.page_id);
    let group_id = observation.group_id;
    let at_str = encode_dt(observation.captured_at);
    let m = observation.metrics.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO scraping_raw_data (
               observation_id, country, state, county, url,
               page_id, group_id, captured_at, {METRIC_COLUMNS}
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                       ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                       ?17, ?18, ?19, ?20, ?21, ?22, ?23)"
          ),
          rusqlite::params![
            id_str, country, state, county, url, page_str, group_id, at_str,
            m.cases, m.deaths, m.presumptive, m.recovered, m.tested,
            m.hospitalized, m.negative, m.monitored, m.no_longer_monitored,
            m.pending, m.active, m.inconclusive, m.severe, m.lat, m.lon,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(observation)
  }

  async fn raw_observations(&self, group_id: i64) -> Result<Vec<RawObservation>> {
    let raws: Vec<RawRawObservation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT observation_id, country, state, county, url,
                  page_id, group_id, captured_at, {METRIC_COLUMNS}
           FROM scraping_raw_data
           WHERE group_id = ?1
           ORDER BY captured_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![group_id], raw_observation_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawRawObservation::into_observation)
      .collect()
  }

  async fn unresolved(&self, group_id: i64) -> Result<Vec<RawObservation>> {
    let raws: Vec<RawRawObservation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT observation_id, country, state, county, url,
                  page_id, group_id, captured_at, {METRIC_COLUMNS}
           FROM scraping_raw_data r
           WHERE r.group_id = ?1
             AND NOT EXISTS (SELECT 1 FROM scraping_raw_links l
                             WHERE l.raw_id = r.observation_id)
           ORDER BY captured_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![group_id], raw_observation_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawRawObservation::into_observation)
      .collect()
  }

  // ── Canonical observations ────────────────────────────────────────────────

  async fn put_state_observation(
    &self,
    input: NewStateObservation,
  ) -> Result<StateObservation> {
    let now_str = encode_dt(Utc::now());
    let country = input.country_code.clone();
    let abbrev = input.state_abbrev.clone();
    let at_str = encode_dt(input.captured_at);
    let page_str = encode_uuid(input.page_id);
    let raw_str = encode_uuid(input.raw_id);
    let group_id = input.group_id;
    let m = input.metrics.clone();

    let raw: RawStateObservation = self
      .conn
      .call(move |conn| {
        // Idempotent per (state, group): re-attaching the same raw row
        // bumps updated_at only. A different raw row for an occupied slot
        // is a no-op on the committed row; the link below still records
        // it so the deferred queue drains.
        conn.execute(
          &format!(
            "INSERT INTO scraping_state_data (
               country_code, state_abbrev, captured_at, updated_at,
               {METRIC_COLUMNS}, group_id, page_id, raw_id
             ) VALUES (?1, ?2, ?3, ?4,
                       ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                       ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)
             ON CONFLICT(state_abbrev, group_id)
             DO UPDATE SET updated_at = excluded.updated_at
             WHERE scraping_state_data.raw_id = excluded.raw_id"
          ),
          rusqlite::params![
            country, abbrev, at_str, now_str,
            m.cases, m.deaths, m.presumptive, m.recovered, m.tested,
            m.hospitalized, m.negative, m.monitored, m.no_longer_monitored,
            m.pending, m.active, m.inconclusive, m.severe, m.lat, m.lon,
            group_id, page_str, raw_str,
          ],
        )?;

        conn.execute(
          "INSERT OR IGNORE INTO scraping_raw_links
             (raw_id, group_id, level, state_abbrev, county_fips)
           VALUES (?1, ?2, 'state', ?3, NULL)",
          rusqlite::params![raw_str, group_id, abbrev],
        )?;

        let row = conn.query_row(
          &format!(
            "SELECT country_code, state_abbrev, captured_at, updated_at,
                    {METRIC_COLUMNS}, group_id, page_id, raw_id
             FROM scraping_state_data
             WHERE state_abbrev = ?1 AND group_id = ?2"
          ),
          rusqlite::params![abbrev, group_id],
          state_observation_from_row,
        )?;
        Ok(row)
      })
      .await?;

    raw.into_observation()
  }

  async fn put_county_observation(
    &self,
    input: NewCountyObservation,
  ) -> Result<CountyObservation> {
    let now_str = encode_dt(Utc::now());
    let country = input.country_code.clone();
    let abbrev = input.state_abbrev.clone();
    let fips = input.county_fips.clone();
    let name = input.county_name.clone();
    let at_str = encode_dt(input.captured_at);
    let page_str = encode_uuid(input.page_id);
    let raw_str = encode_uuid(input.raw_id);
    let group_id = input.group_id;
    let m = input.metrics.clone();

    let raw: RawCountyObservation = self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO scraping_county_data (
               country_code, state_abbrev, county_fips, county_name,
               captured_at, updated_at, {METRIC_COLUMNS},
               group_id, page_id, raw_id
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6,
                       ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                       ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)
             ON CONFLICT(county_fips, group_id)
             DO UPDATE SET updated_at = excluded.updated_at
             WHERE scraping_county_data.raw_id = excluded.raw_id"
          ),
          rusqlite::params![
            country, abbrev, fips, name, at_str, now_str,
            m.cases, m.deaths, m.presumptive, m.recovered, m.tested,
            m.hospitalized, m.negative, m.monitored, m.no_longer_monitored,
            m.pending, m.active, m.inconclusive, m.severe, m.lat, m.lon,
            group_id, page_str, raw_str,
          ],
        )?;

        conn.execute(
          "INSERT OR IGNORE INTO scraping_raw_links
             (raw_id, group_id, level, state_abbrev, county_fips)
           VALUES (?1, ?2, 'county', ?3, ?4)",
          rusqlite::params![raw_str, group_id, abbrev, fips],
        )?;

        let row = conn.query_row(
          &format!(
            "SELECT country_code, state_abbrev, county_fips, county_name,
                    captured_at, updated_at, {METRIC_COLUMNS},
                    group_id, page_id, raw_id
             FROM scraping_county_data
             WHERE county_fips = ?1 AND group_id = ?2"
          ),
          rusqlite::params![fips, group_id],
          county_observation_from_row,
        )?;
        Ok(row)
      })
      .await?;

    raw.into_observation()
  }

  async fn state_observations(
    &self,
    query: &ObservationQuery,
  ) -> Result<Vec<StateObservation>> {
    let country = query.country.clone();
    let state = query.state.clone();
    let group_id = query.group_id;
    let since = query.since.map(encode_dt);
    let until = query.until.map(encode_dt);
    // -1 means no limit; clamp so an oversized usize cannot wrap negative.
    let limit = query
      .limit
      .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
      .unwrap_or(-1);

    let raws: Vec<RawStateObservation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT country_code, state_abbrev, captured_at, updated_at,
                  {METRIC_COLUMNS}, group_id, page_id, raw_id
           FROM scraping_state_data
           WHERE (?1 IS NULL OR country_code = ?1)
             AND (?2 IS NULL OR state_abbrev = ?2)
             AND (?3 IS NULL OR group_id = ?3)
             AND (?4 IS NULL OR captured_at >= ?4)
             AND (?5 IS NULL OR captured_at <= ?5)
           ORDER BY captured_at
           LIMIT ?6"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![country, state, group_id, since, until, limit],
            state_observation_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawStateObservation::into_observation)
      .collect()
  }

  async fn county_observations(
    &self,
    query: &ObservationQuery,
  ) -> Result<Vec<CountyObservation>> {
    let country = query.country.clone();
    let state = query.state.clone();
    let fips = query.county_fips.clone();
    let group_id = query.group_id;
    let since = query.since.map(encode_dt);
    let until = query.until.map(encode_dt);
    // -1 means no limit; clamp so an oversized usize cannot wrap negative.
    let limit = query
      .limit
      .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
      .unwrap_or(-1);

    let raws: Vec<RawCountyObservation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT country_code, state_abbrev, county_fips, county_name,
                  captured_at, updated_at, {METRIC_COLUMNS},
                  group_id, page_id, raw_id
           FROM scraping_county_data
           WHERE (?1 IS NULL OR country_code = ?1)
             AND (?2 IS NULL OR state_abbrev = ?2)
             AND (?3 IS NULL OR county_fips = ?3)
             AND (?4 IS NULL OR group_id = ?4)
             AND (?5 IS NULL OR captured_at >= ?5)
             AND (?6 IS NULL OR captured_at <= ?6)
           ORDER BY captured_at
           LIMIT ?7"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![country, state, fips, group_id, since, until, limit],
            county_observation_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawCountyObservation::into_observation)
      .collect()
  }

  // ── Reference registry ────────────────────────────────────────────────────

  async fn seed_registry(&self, seed: RegistrySeed) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        for c in &seed.countries {
          tx.execute(
            "INSERT OR IGNORE INTO static_country (code, name) VALUES (?1, ?2)",
            rusqlite::params![c.code, c.name],
          )?;
        }
        for s in &seed.states {
          tx.execute(
            "INSERT OR IGNORE INTO static_states
               (abbrev, name, country_code, fips_prefix)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![s.abbrev, s.name, s.country_code, s.fips_prefix],
          )?;
        }
        for c in &seed.counties {
          tx.execute(
            "INSERT OR IGNORE INTO static_county
               (fips, name, state_abbrev, alternate_name, non_standard_name)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
              c.fips, c.name, c.state_abbrev, c.alternate_name,
              c.non_standard_name,
            ],
          )?;
        }
        for e in &seed.fips_lut {
          tx.execute(
            "INSERT OR IGNORE INTO static_fips_lut
               (state_abbrev, county_name, fips, alternate_name)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![e.state_abbrev, e.county_name, e.fips, e.alternate_name],
          )?;
        }
        for u in &seed.urls {
          tx.execute(
            "INSERT OR IGNORE INTO static_urls (country_code, state_abbrev, url)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![u.country_code, u.state_abbrev, u.url],
          )?;
        }
        for t in &seed.timezones {
          tx.execute(
            "INSERT OR IGNORE INTO static_timezones (state_abbrev, timezone)
             VALUES (?1, ?2)",
            rusqlite::params![t.state_abbrev, t.timezone],
          )?;
        }

        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn registry_snapshot(&self) -> Result<RegistrySnapshot> {
    let snapshot = self
      .conn
      .call(|conn| {
        let countries = conn
          .prepare("SELECT code, name FROM static_country")?
          .query_map([], |row| {
            Ok(Country { code: row.get(0)?, name: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let states = conn
          .prepare("SELECT abbrev, name, country_code, fips_prefix FROM static_states")?
          .query_map([], |row| {
            Ok(State {
              abbrev:       row.get(0)?,
              name:         row.get(1)?,
              country_code: row.get(2)?,
              fips_prefix:  row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let counties = conn
          .prepare(
            "SELECT fips, name, state_abbrev, alternate_name, non_standard_name
             FROM static_county",
          )?
          .query_map([], |row| {
            Ok(County {
              fips:              row.get(0)?,
              name:              row.get(1)?,
              state_abbrev:      row.get(2)?,
              alternate_name:    row.get(3)?,
              non_standard_name: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let fips_lut = conn
          .prepare(
            "SELECT state_abbrev, county_name, fips, alternate_name
             FROM static_fips_lut",
          )?
          .query_map([], |row| {
            Ok(FipsLookupEntry {
              state_abbrev:   row.get(0)?,
              county_name:    row.get(1)?,
              fips:           row.get(2)?,
              alternate_name: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(RegistrySnapshot::from_rows(countries, states, counties, fips_lut))
      })
      .await?;

    Ok(snapshot)
  }

  async fn source_urls(&self) -> Result<Vec<SourceUrl>> {
    let urls = self
      .conn
      .call(|conn| {
        let rows = conn
          .prepare(
            "SELECT country_code, state_abbrev, url FROM static_urls
             ORDER BY url_id",
          )?
          .query_map([], |row| {
            Ok(SourceUrl {
              country_code: row.get(0)?,
              state_abbrev: row.get(1)?,
              url:          row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(urls)
  }
}

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn raw_observation_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawRawObservation> {
  Ok(RawRawObservation {
    observation_id: row.get(0)?,
    country:        row.get(1)?,
    state:          row.get(2)?,
    county:         row.get(3)?,
    url:            row.get(4)?,
    page_id:        row.get(5)?,
    group_id:       row.get(6)?,
    captured_at:    row.get(7)?,
    metrics:        metrics_from_row(row, 8)?,
  })
}

fn state_observation_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawStateObservation> {
  Ok(RawStateObservation {
    country_code: row.get(0)?,
    state_abbrev: row.get(1)?,
    captured_at:  row.get(2)?,
    updated_at:   row.get(3)?,
    metrics:      metrics_from_row(row, 4)?,
    group_id:     row.get(19)?,
    page_id:      row.get(20)?,
    raw_id:       row.get(21)?,
  })
}

fn county_observation_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawCountyObservation> {
  Ok(RawCountyObservation {
    country_code: row.get(0)?,
    state_abbrev: row.get(1)?,
    county_fips:  row.get(2)?,
    county_name:  row.get(3)?,
    captured_at:  row.get(4)?,
    updated_at:   row.get(5)?,
    metrics:      metrics_from_row(row, 6)?,
    group_id:     row.get(21)?,
    page_id:      row.get(22)?,
    raw_id:       row.get(23)?,
  })
}
