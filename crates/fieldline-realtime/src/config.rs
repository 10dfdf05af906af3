//! Tunables for the realtime components.
//!
//! Every struct deserialises with defaults for missing keys so a partial
//! `[realtime]` table in the agent's config file is enough.

use std::time::Duration;

use fieldline_core::session::Role;
use serde::Deserialize;

/// Top-level configuration, one table per component.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
  pub alerts:   AlertConfig,
  pub location: LocationConfig,
  pub search:   SearchConfig,
}

// ─── Alerts ──────────────────────────────────────────────────────────────────

/// Presentation of platform notifications.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
  pub icon:              String,
  pub badge:             String,
  pub vibration_pattern: Vec<u32>,
  /// Prefix joined to an alert's deep link to build `deep_link_url`. Empty
  /// keeps links relative.
  pub base_url:          String,
}

impl Default for AlertConfig {
  fn default() -> Self {
    Self {
      icon:              "/icons/icon-192.png".into(),
      badge:             "/icons/badge-72.png".into(),
      vibration_pattern: vec![200, 100, 200],
      base_url:          String::new(),
    }
  }
}

impl AlertConfig {
  pub fn deep_link_url(&self, path: &str) -> String {
    format!("{}{}", self.base_url.trim_end_matches('/'), path)
  }
}

// ─── Location ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
  /// Time between ticks.
  pub period_secs:              u64,
  pub high_accuracy_timeout_ms: u64,
  pub low_accuracy_timeout_ms:  u64,
  /// Roles for which the reporter never starts.
  pub exempt_roles:             Vec<Role>,
}

impl Default for LocationConfig {
  fn default() -> Self {
    Self {
      period_secs:              180,
      high_accuracy_timeout_ms: 10_000,
      low_accuracy_timeout_ms:  5_000,
      exempt_roles:             vec![Role::Office, Role::Admin],
    }
  }
}

impl LocationConfig {
  pub fn period(&self) -> Duration { Duration::from_secs(self.period_secs) }

  pub fn high_accuracy_timeout(&self) -> Duration {
    Duration::from_millis(self.high_accuracy_timeout_ms)
  }

  pub fn low_accuracy_timeout(&self) -> Duration {
    Duration::from_millis(self.low_accuracy_timeout_ms)
  }

  pub fn is_exempt(&self, role: Role) -> bool { self.exempt_roles.contains(&role) }
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
  pub debounce_ms:          u64,
  /// Folded queries shorter than this never reach the backend.
  pub min_query_chars:      usize,
  pub max_results_per_kind: usize,
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self {
      debounce_ms:          300,
      min_query_chars:      2,
      max_results_per_kind: 5,
    }
  }
}

impl SearchConfig {
  pub fn debounce(&self) -> Duration { Duration::from_millis(self.debounce_ms) }
}
