//! The `fieldline` agent: a single operator session driven from the terminal.
//!
//! Opens the SQLite backend, starts the alert engine, the location reporter
//! and the search aggregator for the configured user, then applies line
//! commands read from stdin. Notifications and search results are printed to
//! the console.

pub mod agent;
pub mod command;
pub mod config;
pub mod platform;

pub use agent::{Agent, Flow};
pub use config::AgentConfig;

#[cfg(test)]
mod testing;
