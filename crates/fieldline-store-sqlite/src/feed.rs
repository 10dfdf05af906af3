//! In-process change feed.
//!
//! Each subscriber is an unbounded channel tagged with the collection and
//! filter it asked for. Publishing prunes subscribers whose receiver has been
//! dropped, which is how a caller unsubscribes.

use std::sync::{Mutex, PoisonError};

use fieldline_core::feed::{ChangeEvent, EntityKind, EventFilter, FeedChannel};
use tokio::sync::mpsc;
use tracing::trace;

struct Subscriber {
  collection: EntityKind,
  filter:     EventFilter,
  tx:         mpsc::UnboundedSender<ChangeEvent>,
}

#[derive(Default)]
pub struct ChangeHub {
  subscribers: Mutex<Vec<Subscriber>>,
}

impl ChangeHub {
  pub fn subscribe(&self, collection: EntityKind, filter: EventFilter) -> FeedChannel {
    let (tx, rx) = mpsc::unbounded_channel();
    self.subscribers().push(Subscriber {
      collection,
      filter,
      tx,
    });
    rx
  }

  /// Deliver `event` to every live subscriber that matches it.
  pub fn publish(&self, event: ChangeEvent) {
    let mut subscribers = self.subscribers();
    subscribers.retain(|s| !s.tx.is_closed());

    let mut delivered = 0usize;
    for s in subscribers.iter() {
      if s.collection == event.collection
        && s.filter.matches(event.kind)
        && s.tx.send(event.clone()).is_ok()
      {
        delivered += 1;
      }
    }
    trace!(collection = %event.collection, kind = %event.kind, delivered, "change published");
  }

  pub fn subscriber_count(&self) -> usize {
    let mut subscribers = self.subscribers();
    subscribers.retain(|s| !s.tx.is_closed());
    subscribers.len()
  }

  fn subscribers(&self) -> std::sync::MutexGuard<'_, Vec<Subscriber>> {
    self
      .subscribers
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }
}
