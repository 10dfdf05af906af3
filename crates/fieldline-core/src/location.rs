//! Location samples and sensor read options.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Precision mode of a position read.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AccuracyTier {
  /// GPS-grade.
  High,
  /// Network-derived.
  Low,
}

/// Options for one sensor read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
  pub high_accuracy: bool,
  pub timeout:       Duration,
  /// Maximum age of a cached fix the sensor may return. Zero disables the
  /// cache.
  pub maximum_age:   Duration,
}

impl PositionOptions {
  pub fn tier(&self) -> AccuracyTier {
    if self.high_accuracy {
      AccuracyTier::High
    } else {
      AccuracyTier::Low
    }
  }
}

/// A raw fix returned by a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
  pub lat: f64,
  pub lng: f64,
}

/// The latest known position of a user, as written to their profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
  pub lat:           f64,
  pub lng:           f64,
  pub captured_at:   DateTime<Utc>,
  pub accuracy_tier: AccuracyTier,
}

impl LocationSample {
  pub fn from_position(
    position: Position,
    tier: AccuracyTier,
    captured_at: DateTime<Utc>,
  ) -> Self {
    Self {
      lat: position.lat,
      lng: position.lng,
      captured_at,
      accuracy_tier: tier,
    }
  }
}
