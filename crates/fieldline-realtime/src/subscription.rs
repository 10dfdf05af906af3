//! [`Subscription`]: one logical subscription to a collection's change feed.
//!
//! `open` never blocks: the connect step runs on a spawned task and delivery
//! starts once the channel is `Active`. The callback runs while the handle's
//! state lock is held, so once [`Subscription::close`] returns no callback is
//! running and none will start. The callback must therefore be quick and must
//! not touch the handle itself.
//!
//! There is no retry here. If the transport refuses the subscription or ends
//! the channel, the handle moves to `Closed` and the failure is logged.

use std::sync::{Arc, Mutex};

use fieldline_core::{
  Error,
  feed::{ChangeEvent, ChangeFeedTransport, EntityKind, EventFilter},
};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::lock;

/// Lifecycle of a subscription handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
  Connecting,
  Active,
  Closed,
}

/// Owns exactly one feed channel. Dropping the handle closes it.
pub struct Subscription {
  collection: EntityKind,
  filter:     EventFilter,
  state:      Arc<Mutex<SubscriptionState>>,
  task:       Option<JoinHandle<()>>,
}

impl Subscription {
  /// Subscribe to `collection` and invoke `on_event` for every matching
  /// event, in arrival order.
  ///
  /// Must be called from within a tokio runtime.
  pub fn open<T, F>(
    transport: Arc<T>,
    collection: EntityKind,
    filter: EventFilter,
    on_event: F,
  ) -> Self
  where
    T: ChangeFeedTransport,
    F: FnMut(ChangeEvent) + Send + 'static,
  {
    let state = Arc::new(Mutex::new(SubscriptionState::Connecting));
    let task = tokio::spawn(deliver(
      transport,
      collection,
      filter,
      on_event,
      state.clone(),
    ));
    Self {
      collection,
      filter,
      state,
      task: Some(task),
    }
  }

  pub fn collection(&self) -> EntityKind { self.collection }

  pub fn filter(&self) -> EventFilter { self.filter }

  pub fn state(&self) -> SubscriptionState { *lock(&self.state) }

  /// Close the channel. Idempotent; no callback fires after this returns.
  pub fn close(&mut self) {
    *lock(&self.state) = SubscriptionState::Closed;
    if let Some(task) = self.task.take() {
      task.abort();
      debug!(collection = %self.collection, "subscription closed");
    }
  }
}

impl Drop for Subscription {
  fn drop(&mut self) { self.close(); }
}

async fn deliver<T, F>(
  transport: Arc<T>,
  collection: EntityKind,
  filter: EventFilter,
  mut on_event: F,
  state: Arc<Mutex<SubscriptionState>>,
) where
  T: ChangeFeedTransport,
  F: FnMut(ChangeEvent) + Send + 'static,
{
  let mut channel = match transport.subscribe(collection, filter).await {
    Ok(channel) => channel,
    Err(e) => {
      let error = Error::Transport(e.to_string());
      warn!(%collection, %error, "change feed subscription failed");
      *lock(&state) = SubscriptionState::Closed;
      return;
    }
  };

  {
    let mut current = lock(&state);
    if *current == SubscriptionState::Closed {
      return;
    }
    *current = SubscriptionState::Active;
  }
  debug!(%collection, ?filter, "subscription active");

  while let Some(event) = channel.recv().await {
    if event.collection != collection || !filter.matches(event.kind) {
      trace!(%collection, kind = %event.kind, "skipping unmatched event");
      continue;
    }
    let delivered = {
      let current = lock(&state);
      if *current == SubscriptionState::Active {
        on_event(event);
        true
      } else {
        false
      }
    };
    if !delivered {
      return;
    }
  }

  let error = Error::Transport("channel ended by transport".into());
  warn!(%collection, %error, "change feed closed; no further events");
  *lock(&state) = SubscriptionState::Closed;
}
