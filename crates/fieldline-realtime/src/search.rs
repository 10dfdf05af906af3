//! [`SearchAggregator`]: debounced cross-collection search.
//!
//! Every [`set_query`](SearchAggregator::set_query) bumps a generation
//! counter and replaces the single pending task. A task publishes its result
//! set only if its generation is still current when it finishes, so a slow
//! response for an old query never overwrites a newer one.

use std::{
  fmt::Display,
  sync::{Arc, Mutex},
};

use fieldline_core::{
  records::{Client, Equipment, WorkOrder},
  search::SearchResultSet,
  store::RecordQuery,
  text::{any_contains, fold},
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, trace, warn};

use crate::{config::SearchConfig, lock};

struct Slot {
  generation: u64,
  pending:    Option<JoinHandle<()>>,
}

struct Inner<Q> {
  records: Arc<Q>,
  config:  SearchConfig,
  slot:    Mutex<Slot>,
  results: watch::Sender<SearchResultSet>,
}

/// Latest-wins search over orders, clients and equipment.
pub struct SearchAggregator<Q> {
  inner: Arc<Inner<Q>>,
}

impl<Q: RecordQuery> SearchAggregator<Q> {
  pub fn new(records: Arc<Q>, config: SearchConfig) -> Self {
    let (results, _) = watch::channel(SearchResultSet::default());
    Self {
      inner: Arc::new(Inner {
        records,
        config,
        slot: Mutex::new(Slot {
          generation: 0,
          pending:    None,
        }),
        results,
      }),
    }
  }

  /// Replace the current query. Returns immediately.
  ///
  /// Short queries publish an empty set at once; anything else is executed
  /// after the debounce window unless superseded first. Must be called from
  /// within a tokio runtime.
  pub fn set_query(&self, text: &str) {
    let query = fold(text);
    let mut slot = lock(&self.inner.slot);
    slot.generation += 1;
    let generation = slot.generation;
    if let Some(pending) = slot.pending.take() {
      pending.abort();
    }

    if query.chars().count() < self.inner.config.min_query_chars {
      trace!(%query, "query too short; clearing results");
      self.inner.results.send_replace(SearchResultSet::empty(query));
      return;
    }

    let inner = self.inner.clone();
    slot.pending = Some(tokio::spawn(async move {
      tokio::time::sleep(inner.config.debounce()).await;
      let results = inner.execute(query).await;
      inner.publish(generation, results);
    }));
  }

  /// A receiver that observes every published result set.
  pub fn subscribe(&self) -> watch::Receiver<SearchResultSet> {
    self.inner.results.subscribe()
  }

  /// The most recently published result set.
  pub fn latest(&self) -> SearchResultSet { self.inner.results.borrow().clone() }

  /// Invoke `callback` with each newly published result set until the
  /// returned listener is dropped.
  pub fn on_results_changed<F>(&self, mut callback: F) -> ResultsListener
  where
    F: FnMut(&SearchResultSet) + Send + 'static,
  {
    let mut results = self.subscribe();
    let task = tokio::spawn(async move {
      while results.changed().await.is_ok() {
        let current = results.borrow_and_update().clone();
        callback(&current);
      }
    });
    ResultsListener { task }
  }
}

impl<Q> SearchAggregator<Q> {
  /// Drop the pending query, if any. A result already in flight is never
  /// published.
  pub fn cancel(&self) {
    let mut slot = lock(&self.inner.slot);
    slot.generation += 1;
    if let Some(pending) = slot.pending.take() {
      pending.abort();
      debug!("pending search cancelled");
    }
  }
}

impl<Q> Drop for SearchAggregator<Q> {
  fn drop(&mut self) { self.cancel(); }
}

impl<Q: RecordQuery> Inner<Q> {
  async fn execute(&self, query: String) -> SearchResultSet {
    let cap = self.config.max_results_per_kind;
    let (orders, clients, equipments) = tokio::join!(
      self.records.list_orders(),
      self.records.list_clients(),
      self.records.list_equipments(),
    );

    let orders = take_matches("orders", orders, cap, |o: &WorkOrder| {
      any_contains(
        [
          Some(o.code.as_str()),
          Some(o.status.as_str()),
          o.client_name.as_deref(),
          o.description.as_deref(),
        ],
        &query,
      )
    });
    let clients = take_matches("clients", clients, cap, |c: &Client| {
      any_contains(
        [
          Some(c.name.as_str()),
          c.document.as_deref(),
          c.email.as_deref(),
          c.phone.as_deref(),
        ],
        &query,
      )
    });
    let equipments = take_matches("equipments", equipments, cap, |e: &Equipment| {
      any_contains(
        [
          Some(e.name.as_str()),
          e.serial_number.as_deref(),
          e.model.as_deref(),
          e.client_name.as_deref(),
        ],
        &query,
      )
    });

    SearchResultSet {
      query,
      orders,
      clients,
      equipments,
    }
  }
}

impl<Q> Inner<Q> {
  fn publish(&self, generation: u64, results: SearchResultSet) {
    let mut slot = lock(&self.slot);
    if slot.generation != generation {
      debug!(query = %results.query, "discarding stale search results");
      return;
    }
    slot.pending = None;
    debug!(query = %results.query, matches = results.len(), "search results published");
    self.results.send_replace(results);
  }
}

/// Matching items in backend order, at most `cap` of them. A failed read
/// contributes nothing.
fn take_matches<T, E: Display>(
  kind: &str,
  read: Result<Vec<T>, E>,
  cap: usize,
  matches: impl Fn(&T) -> bool,
) -> Vec<T> {
  match read {
    Ok(items) => items.into_iter().filter(|item| matches(item)).take(cap).collect(),
    Err(e) => {
      warn!(kind, error = %e, "search read failed");
      Vec::new()
    }
  }
}

/// Handle returned by [`SearchAggregator::on_results_changed`]. Dropping it
/// stops the callback.
pub struct ResultsListener {
  task: JoinHandle<()>,
}

impl Drop for ResultsListener {
  fn drop(&mut self) { self.task.abort(); }
}
