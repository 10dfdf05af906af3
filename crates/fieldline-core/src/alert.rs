//! Alert descriptors, delivery outcomes and the platform notification payload.

use serde::{Deserialize, Serialize};

/// A user-facing alert produced from a change event.
///
/// Immutable once built. `dedupe_key` identifies the originating entity and
/// event so a replayed change maps to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertDescriptor {
  title:      String,
  body:       String,
  deep_link:  String,
  dedupe_key: String,
}

impl AlertDescriptor {
  pub fn new(
    title: impl Into<String>,
    body: impl Into<String>,
    deep_link: impl Into<String>,
    dedupe_key: impl Into<String>,
  ) -> Self {
    Self {
      title:      title.into(),
      body:       body.into(),
      deep_link:  deep_link.into(),
      dedupe_key: dedupe_key.into(),
    }
  }

  pub fn title(&self) -> &str { &self.title }

  pub fn body(&self) -> &str { &self.body }

  /// Application route, e.g. `/os/<id>`.
  pub fn deep_link(&self) -> &str { &self.deep_link }

  pub fn dedupe_key(&self) -> &str { &self.dedupe_key }
}

/// Which delivery tier accepted a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryTier {
  /// The long-lived background agent; works while the app is not in
  /// foreground.
  Background,
  /// A native alert rendered directly by the foreground application.
  Foreground,
}

/// Result of one dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "tier", rename_all = "snake_case")]
pub enum DeliveryOutcome {
  Delivered(DeliveryTier),
  /// The dedupe key was already delivered in this session.
  Duplicate,
  PermissionDenied,
  /// Both tiers failed. Logged, never surfaced.
  Failed,
}

impl DeliveryOutcome {
  pub fn is_delivered(&self) -> bool { matches!(self, Self::Delivered(_)) }
}

/// The payload handed to a platform notification surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
  pub title:             String,
  pub body:              String,
  pub icon:              String,
  pub badge:             String,
  /// Alternating vibrate/pause durations in milliseconds.
  pub vibration_pattern: Vec<u32>,
  pub deep_link_url:     String,
  /// Platforms that coalesce notifications by tag use the dedupe key.
  pub tag:               String,
}
