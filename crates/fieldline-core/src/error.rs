//! Error taxonomy for the realtime engine.
//!
//! Every variant is recovered locally by the components that produce it; the
//! only error meant to reach an end user is [`Error::PermissionDenied`], whose
//! hint is an actionable message.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The change-feed channel failed or ended. Not retried here.
  #[error("transport error: {0}")]
  Transport(String),

  #[error("permission denied: {hint}")]
  PermissionDenied { hint: String },

  #[error("position read timed out after {0:?}")]
  SensorTimeout(Duration),

  #[error("position sensor unavailable: {0}")]
  SensorUnavailable(String),

  /// Both notification tiers failed.
  #[error("notification delivery failed: {0}")]
  DeliveryFailure(String),

  #[error("already started; stop the current session first")]
  AlreadyStarted,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
