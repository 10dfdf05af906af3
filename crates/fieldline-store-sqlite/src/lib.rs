//! SQLite backend for Fieldline.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every write is also published on an
//! in-process change feed, so a single-node deployment can drive the realtime
//! engine without a replication server.

mod encode;
mod feed;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{NewClient, NewEquipment, NewWorkOrder, SqliteStore};
