//! SQL schema for the caseline SQLite store.
//!
//! Executed once at connection startup. Two logical namespaces share one
//! database file: `static_*` is the reference registry, `scraping_*` holds
//! captures and observations. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── static_*: the reference registry ─────────────────────────────────────

CREATE TABLE IF NOT EXISTS static_country (
    code TEXT PRIMARY KEY,        -- e.g. 'US'
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS static_states (
    abbrev       TEXT PRIMARY KEY, -- postal abbreviation
    name         TEXT NOT NULL,
    country_code TEXT NOT NULL REFERENCES static_country(code),
    fips_prefix  TEXT              -- two-digit state FIPS, where assigned
);

CREATE TABLE IF NOT EXISTS static_county (
    fips              TEXT PRIMARY KEY, -- five-digit FIPS; the join key
    name              TEXT NOT NULL,
    state_abbrev      TEXT NOT NULL REFERENCES static_states(abbrev),
    alternate_name    TEXT,
    non_standard_name TEXT
);

-- Auxiliary resolution table; may hold several spellings per county.
CREATE TABLE IF NOT EXISTS static_fips_lut (
    state_abbrev   TEXT NOT NULL REFERENCES static_states(abbrev),
    county_name    TEXT NOT NULL,
    fips           TEXT NOT NULL,
    alternate_name TEXT,
    PRIMARY KEY (state_abbrev, county_name)
);

CREATE TABLE IF NOT EXISTS static_urls (
    url_id       INTEGER PRIMARY KEY,
    country_code TEXT NOT NULL REFERENCES static_country(code),
    state_abbrev TEXT NOT NULL REFERENCES static_states(abbrev),
    url          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS static_timezones (
    state_abbrev TEXT PRIMARY KEY REFERENCES static_states(abbrev),
    timezone     TEXT NOT NULL
);

-- ── scraping_*: captures and observations ────────────────────────────────

-- Pages are immutable and content-addressed.
-- The UNIQUE constraint on content_hash is the dedup guarantee: a losing
-- concurrent writer falls back to a read of the existing row.
CREATE TABLE IF NOT EXISTS scraping_pages (
    page_id      TEXT PRIMARY KEY,
    url          TEXT NOT NULL,
    raw_text     TEXT NOT NULL,
    content_hash TEXT NOT NULL UNIQUE,
    captured_at  TEXT NOT NULL          -- ISO 8601 UTC
);

-- AUTOINCREMENT keeps group ids strictly increasing and never reused,
-- even across restarts and deletes (sqlite_sequence persists the max).
CREATE TABLE IF NOT EXISTS scraping_scrape_group (
    group_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL
);

-- Raw observations are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS scraping_raw_data (
    observation_id      TEXT PRIMARY KEY,
    country             TEXT NOT NULL,   -- free-text, as scraped
    state               TEXT NOT NULL,
    county              TEXT,
    url                 TEXT NOT NULL,
    page_id             TEXT NOT NULL REFERENCES scraping_pages(page_id),
    group_id            INTEGER NOT NULL REFERENCES scraping_scrape_group(group_id),
    captured_at         TEXT NOT NULL,
    cases               INTEGER,        -- all metrics NULL = not reported
    deaths              INTEGER,
    presumptive         INTEGER,
    recovered           INTEGER,
    tested              INTEGER,
    hospitalized        INTEGER,
    negative            INTEGER,
    monitored           INTEGER,
    no_longer_monitored INTEGER,
    pending             INTEGER,
    active              INTEGER,
    inconclusive        INTEGER,
    severe              INTEGER,
    lat                 REAL,
    lon                 REAL
);

-- Canonical state-level observations. One row per (state, scrape group);
-- a repeat normalization bumps updated_at and never rewrites metrics.
CREATE TABLE IF NOT EXISTS scraping_state_data (
    country_code        TEXT NOT NULL REFERENCES static_country(code),
    state_abbrev        TEXT NOT NULL REFERENCES static_states(abbrev),
    captured_at         TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    cases               INTEGER,
    deaths              INTEGER,
    presumptive         INTEGER,
    recovered           INTEGER,
    tested              INTEGER,
    hospitalized        INTEGER,
    negative            INTEGER,
    monitored           INTEGER,
    no_longer_monitored INTEGER,
    pending             INTEGER,
    active              INTEGER,
    inconclusive        INTEGER,
    severe              INTEGER,
    lat                 REAL,
    lon                 REAL,
    group_id            INTEGER NOT NULL REFERENCES scraping_scrape_group(group_id),
    page_id             TEXT NOT NULL REFERENCES scraping_pages(page_id),
    raw_id              TEXT NOT NULL REFERENCES scraping_raw_data(observation_id),
    UNIQUE (state_abbrev, group_id)
);

-- Canonical county-level observations, keyed by FIPS.
CREATE TABLE IF NOT EXISTS scraping_county_data (
    country_code        TEXT NOT NULL REFERENCES static_country(code),
    state_abbrev        TEXT NOT NULL REFERENCES static_states(abbrev),
    county_fips         TEXT NOT NULL REFERENCES static_county(fips),
    county_name         TEXT NOT NULL,
    captured_at         TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    cases               INTEGER,
    deaths              INTEGER,
    presumptive         INTEGER,
    recovered           INTEGER,
    tested              INTEGER,
    hospitalized        INTEGER,
    negative            INTEGER,
    monitored           INTEGER,
    no_longer_monitored INTEGER,
    pending             INTEGER,
    active              INTEGER,
    inconclusive        INTEGER,
    severe              INTEGER,
    lat                 REAL,
    lon                 REAL,
    group_id            INTEGER NOT NULL REFERENCES scraping_scrape_group(group_id),
    page_id             TEXT NOT NULL REFERENCES scraping_pages(page_id),
    raw_id              TEXT NOT NULL REFERENCES scraping_raw_data(observation_id),
    UNIQUE (county_fips, group_id)
);

-- Which raw rows are attached to a canonical slot. The first attachment
-- for a (jurisdiction, group) owns the canonical row; later raw rows for
-- the same slot are recorded here as duplicates so the deferred queue
-- drains instead of re-listing them forever.
CREATE TABLE IF NOT EXISTS scraping_raw_links (
    raw_id       TEXT PRIMARY KEY REFERENCES scraping_raw_data(observation_id),
    group_id     INTEGER NOT NULL REFERENCES scraping_scrape_group(group_id),
    level        TEXT NOT NULL,            -- 'state' | 'county'
    state_abbrev TEXT NOT NULL,
    county_fips  TEXT
);

CREATE INDEX IF NOT EXISTS raw_data_group_idx    ON scraping_raw_data(group_id);
CREATE INDEX IF NOT EXISTS raw_data_page_idx     ON scraping_raw_data(page_id);
CREATE INDEX IF NOT EXISTS state_data_group_idx  ON scraping_state_data(group_id);
CREATE INDEX IF NOT EXISTS state_data_time_idx   ON scraping_state_data(captured_at);
CREATE INDEX IF NOT EXISTS county_data_group_idx ON scraping_county_data(group_id);
CREATE INDEX IF NOT EXISTS county_data_time_idx  ON scraping_county_data(captured_at);

PRAGMA user_version = 1;
";
