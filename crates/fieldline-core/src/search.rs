//! Search result sets.

use serde::{Deserialize, Serialize};

use crate::records::{Client, Equipment, WorkOrder};

/// Matches for one query across the three searchable collections.
///
/// Each list is bounded by the aggregator's per-kind cap. `query` is the
/// folded query that produced the set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultSet {
  pub query:      String,
  pub orders:     Vec<WorkOrder>,
  pub clients:    Vec<Client>,
  pub equipments: Vec<Equipment>,
}

impl SearchResultSet {
  /// An empty set tagged with `query`.
  pub fn empty(query: impl Into<String>) -> Self {
    Self {
      query: query.into(),
      ..Self::default()
    }
  }

  pub fn is_empty(&self) -> bool {
    self.orders.is_empty() && self.clients.is_empty() && self.equipments.is_empty()
  }

  pub fn len(&self) -> usize {
    self.orders.len() + self.clients.len() + self.equipments.len()
  }
}
