//! Change-feed types and the [`ChangeFeedTransport`] trait.
//!
//! A change feed pushes one [`ChangeEvent`] per insert, update or delete on a
//! backend collection. The transport owns reconnection; consumers only see an
//! ordered channel of events per collection.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};
use tokio::sync::mpsc;
use uuid::Uuid;

// ─── Collections ─────────────────────────────────────────────────────────────

/// The backend collections that can appear on a change feed.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
  Order,
  Client,
  Equipment,
  Quote,
  Activity,
}

/// What happened to the row.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
  Insert,
  Update,
  Delete,
}

/// Which event kinds a subscription wants; `All` is the transport's `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFilter {
  #[default]
  All,
  Only(EventKind),
}

impl EventFilter {
  pub fn matches(self, kind: EventKind) -> bool {
    match self {
      Self::All => true,
      Self::Only(k) => k == kind,
    }
  }
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

/// A replicated row image, as the backend sends it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSnapshot(pub Map<String, Value>);

impl RecordSnapshot {
  /// Build a snapshot from any serialisable record. Non-object values yield
  /// an empty snapshot.
  pub fn from_record<T: Serialize>(record: &T) -> crate::Result<Self> {
    match serde_json::to_value(record)? {
      Value::Object(map) => Ok(Self(map)),
      _ => Ok(Self::default()),
    }
  }

  /// The row's primary key (`id` column), rendered as a string.
  pub fn primary_key(&self) -> Option<String> {
    match self.0.get("id")? {
      Value::String(s) => Some(s.clone()),
      Value::Number(n) => Some(n.to_string()),
      _ => None,
    }
  }

  /// A string column; `None` when absent, null or not a string.
  pub fn str_field(&self, name: &str) -> Option<&str> {
    self.0.get(name).and_then(Value::as_str)
  }

  /// A UUID column.
  pub fn uuid_field(&self, name: &str) -> Option<Uuid> {
    self.str_field(name).and_then(|s| Uuid::parse_str(s).ok())
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// One change on a backend collection.
///
/// `before` is absent when the backend does not replicate full rows for
/// updates; consumers must treat that as "unknown".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
  pub collection: EntityKind,
  pub kind:       EventKind,
  pub before:     Option<RecordSnapshot>,
  pub after:      Option<RecordSnapshot>,
}

impl ChangeEvent {
  /// The snapshot that identifies the row: `after`, falling back to `before`
  /// for deletes.
  pub fn current(&self) -> Option<&RecordSnapshot> {
    self.after.as_ref().or(self.before.as_ref())
  }
}

// ─── Transport ───────────────────────────────────────────────────────────────

/// The receiving end of one open feed channel. Dropping it unsubscribes.
pub type FeedChannel = mpsc::UnboundedReceiver<ChangeEvent>;

/// A backend change stream.
///
/// The transport delivers events for one collection in arrival order and is
/// responsible for its own reconnection. A channel that ends (the sender side
/// is dropped) means the subscription can receive nothing further.
pub trait ChangeFeedTransport: Send + Sync + 'static {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Open a channel for `collection`, delivering only events that match
  /// `filter`.
  fn subscribe(
    &self,
    collection: EntityKind,
    filter: EventFilter,
  ) -> impl Future<Output = Result<FeedChannel, Self::Error>> + Send + '_;
}
