//! Ingestion pipeline for caseline.
//!
//! Everything a scraper collaborator needs: a role-checking [`Gate`]
//! around any [`caseline_core::store::ScrapeStore`], and an
//! [`IngestRun`] that drives validate → archive → record → normalize
//! for one scrape group.

pub mod error;
pub mod gate;
pub mod run;

pub use error::{Error, Result};
pub use gate::Gate;
pub use run::{
  Capture, IngestRun, NormalizeOutcome, NormalizeReport, Observations,
};

#[cfg(test)]
mod tests;
