//! CSV output store for scraped matches.
//!
//! Each player job owns one file; rows are appended page by page.

pub mod repository;
pub mod schema;

pub use repository::{MatchRepository, MatchSink};
