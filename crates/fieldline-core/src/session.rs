//! Session identity and roles.
//!
//! Components receive the session explicitly in their `start` calls; nothing
//! reads a "current session" ambiently.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Who is signed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
  pub user_id:      Uuid,
  pub display_name: String,
}

/// The user's role in the company.
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
  Technician,
  Supervisor,
  /// Back-office staff.
  Office,
  Admin,
}

/// An authenticated session: identity plus role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub identity: SessionIdentity,
  pub role:     Role,
}
