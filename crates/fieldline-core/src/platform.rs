//! Device and platform surfaces: notifications and position.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  alert::NotificationPayload,
  location::{Position, PositionOptions},
};

// ─── Notifications ───────────────────────────────────────────────────────────

/// The platform's notification permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
  Granted,
  Denied,
  /// Not yet decided; asking will show the platform's own prompt.
  Prompt,
}

/// The notification surface of the host platform.
///
/// Two delivery tiers exist: a long-lived background agent (the only one that
/// works while the application is not in foreground) and a native alert
/// rendered by the foreground application.
pub trait NotificationPlatform: Send + Sync + 'static {
  type Error: std::error::Error + Send + Sync + 'static;

  fn notification_permission(&self) -> PermissionState;

  /// Show the platform's permission prompt and return the user's answer.
  /// May suspend until the user responds.
  fn request_notification_permission(
    &self,
  ) -> impl Future<Output = PermissionState> + Send + '_;

  /// Whether a background delivery agent is registered and ready.
  fn background_agent_ready(&self) -> impl Future<Output = bool> + Send + '_;

  fn deliver_background<'a>(
    &'a self,
    payload: &'a NotificationPayload,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Whether the platform can render native alerts from the foreground.
  fn supports_native(&self) -> bool;

  fn render_native(&self, payload: &NotificationPayload) -> Result<(), Self::Error>;
}

// ─── Position ────────────────────────────────────────────────────────────────

/// A device position sensor.
///
/// Implementations should honour `options.timeout` and return
/// [`Error::SensorTimeout`](crate::Error::SensorTimeout) when it elapses;
/// callers also bound the read themselves.
pub trait PositionSensor: Send + Sync + 'static {
  fn current_position(
    &self,
    options: PositionOptions,
  ) -> impl Future<Output = crate::Result<Position>> + Send + '_;
}
