//! Realtime alert, presence and search components for Fieldline.
//!
//! - [`engine::AlertEngine`] keeps change-feed subscriptions open for a
//!   session, classifies each event and hands accepted alerts to the
//!   [`dispatcher::NotificationDispatcher`].
//! - [`location::LiveLocationReporter`] periodically samples the device
//!   position and writes it to the user's profile.
//! - [`search::SearchAggregator`] debounces query input and fans out to the
//!   record collections, publishing only results for the latest query.
//!
//! All components are generic over the collaborator traits in
//! [`fieldline_core`] and are torn down deterministically by `stop()` or drop.

pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod location;
pub mod search;
pub mod subscription;

#[cfg(test)]
mod testing;

pub use config::RealtimeConfig;
pub use dispatcher::NotificationDispatcher;
pub use engine::{AlertEngine, EngineState};
pub use location::LiveLocationReporter;
pub use search::{ResultsListener, SearchAggregator};
pub use subscription::{Subscription, SubscriptionState};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a std mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
