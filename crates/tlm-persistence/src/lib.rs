//! Result persistence for the trade latency monitor.
//!
//! Latency reports are kept in a single JSON array file. Every write
//! replaces the whole file through a temporary sibling and a rename, so an
//! interrupted write never loses earlier history.

pub mod error;
pub mod store;

pub use error::{PersistenceError, PersistenceResult};
pub use store::{write_json_atomic, ReportStore};
