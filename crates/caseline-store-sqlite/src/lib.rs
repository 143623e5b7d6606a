//! SQLite backend for the caseline scrape store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. SQLite has no schemas, so
//! the two logical namespaces become `scraping_*` and `static_*` table
//! prefixes.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
