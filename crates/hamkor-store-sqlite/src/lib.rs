//! SQLite backend for the Hamkor marketplace store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every trait method is a single
//! `call` on that thread; read-then-write operations additionally run inside
//! an `IMMEDIATE` transaction.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
