//! Core types and collaborator traits for the Fieldline realtime engine.
//!
//! This crate holds the data model shared by the alert, presence and search
//! components together with the traits those components consume. It carries
//! no database or HTTP code; backends implement the traits elsewhere.

// Native `async fn` and `impl Future` in traits; the returned futures are
// declared `Send` explicitly where it matters.
#![allow(async_fn_in_trait)]

pub mod alert;
pub mod error;
pub mod feed;
pub mod location;
pub mod platform;
pub mod records;
pub mod search;
pub mod session;
pub mod store;
pub mod text;

pub use error::{Error, Result};
