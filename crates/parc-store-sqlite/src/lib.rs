//! SQLite backend for the Parc asset store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. Replacement plans are applied in
//! a single immediate transaction with an in-transaction state re-check.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
