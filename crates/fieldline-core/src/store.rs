//! Record-query and profile-store traits.
//!
//! Implemented by backends (e.g. `fieldline-store-sqlite`). The realtime
//! components depend on these abstractions only.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  location::LocationSample,
  records::{Client, Equipment, WorkOrder},
};

// ─── Record queries ──────────────────────────────────────────────────────────

/// Read access to the searchable collections.
///
/// Each method returns the full current collection in backend order;
/// filtering is done by the caller.
pub trait RecordQuery: Send + Sync + 'static {
  type Error: std::error::Error + Send + Sync + 'static;

  fn list_orders(
    &self,
  ) -> impl Future<Output = Result<Vec<WorkOrder>, Self::Error>> + Send + '_;

  fn list_clients(
    &self,
  ) -> impl Future<Output = Result<Vec<Client>, Self::Error>> + Send + '_;

  fn list_equipments(
    &self,
  ) -> impl Future<Output = Result<Vec<Equipment>, Self::Error>> + Send + '_;
}

// ─── Profiles ────────────────────────────────────────────────────────────────

/// A partial profile update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfilePatch {
  /// Replaces the stored location; the profile keeps only the latest sample.
  pub location: Option<LocationSample>,
}

impl ProfilePatch {
  pub fn location(sample: LocationSample) -> Self {
    Self {
      location: Some(sample),
    }
  }
}

/// Write access to user profiles.
pub trait ProfileStore: Send + Sync + 'static {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Apply `patch` to the profile of `user_id`. Last write wins.
  fn update_profile(
    &self,
    user_id: Uuid,
    patch: ProfilePatch,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
