//! Read-side business records.
//!
//! These are the shapes the record-query service returns and the change feed
//! replicates. Only the fields the realtime engine reads are modelled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A work order ("OS").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
  pub id:          Uuid,
  /// Human-facing code, e.g. `OS-042`.
  pub code:        String,
  /// Internal status identifier, e.g. `in_progress`.
  pub status:      String,
  pub client_name: Option<String>,
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
  pub id:       Uuid,
  pub name:     String,
  /// Tax or registration document number.
  pub document: Option<String>,
  pub email:    Option<String>,
  pub phone:    Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
  pub id:            Uuid,
  pub name:          String,
  pub serial_number: Option<String>,
  pub model:         Option<String>,
  pub client_name:   Option<String>,
}

/// An entry in the shared activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
  pub id:          Uuid,
  /// The work order this activity relates to, if any.
  pub order_id:    Option<Uuid>,
  pub author_id:   Uuid,
  pub author_name: String,
  pub description: String,
  pub created_at:  DateTime<Utc>,
}
