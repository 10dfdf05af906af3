//! Agent configuration, deserialised from `fieldline.toml` and `FIELDLINE_*`
//! environment variables.

use std::path::{Path, PathBuf};

use fieldline_core::{
  platform::PermissionState,
  session::{Role, Session, SessionIdentity},
};
use fieldline_realtime::RealtimeConfig;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
  pub store_path: PathBuf,
  pub session:    SessionConfig,
  pub realtime:   RealtimeConfig,
  pub platform:   PlatformConfig,
  pub sensor:     SensorConfig,
}

impl Default for AgentConfig {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("fieldline.db"),
      session:    SessionConfig::default(),
      realtime:   RealtimeConfig::default(),
      platform:   PlatformConfig::default(),
      sensor:     SensorConfig::default(),
    }
  }
}

impl AgentConfig {
  /// Layer `path` (optional) under `FIELDLINE_*` variables. Nested keys use
  /// a double underscore: `FIELDLINE_SESSION__ROLE=office`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("FIELDLINE")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
  /// Fixed user id. A fresh one is generated per run when unset.
  pub user_id:      Option<Uuid>,
  pub display_name: String,
  pub role:         Role,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      user_id:      None,
      display_name: "Field Technician".into(),
      role:         Role::Technician,
    }
  }
}

impl SessionConfig {
  pub fn session(&self) -> Session {
    Session {
      identity: SessionIdentity {
        user_id:      self.user_id.unwrap_or_else(Uuid::new_v4),
        display_name: self.display_name.clone(),
      },
      role:     self.role,
    }
  }
}

// ─── Platform ────────────────────────────────────────────────────────────────

/// Behaviour of the console notification platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
  pub permission:       PermissionState,
  /// The answer given when the permission prompt is shown.
  pub prompt_answer:    PermissionState,
  pub background_agent: bool,
  pub native:           bool,
}

impl Default for PlatformConfig {
  fn default() -> Self {
    Self {
      permission:       PermissionState::Prompt,
      prompt_answer:    PermissionState::Granted,
      background_agent: true,
      native:           true,
    }
  }
}

// ─── Sensor ──────────────────────────────────────────────────────────────────

/// A stationary position, for desk deployments and demos.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
  pub lat:           f64,
  pub lng:           f64,
  /// Whether high-accuracy reads succeed. When `false` every tick falls
  /// back to the low-accuracy read.
  pub gps_available: bool,
}

impl Default for SensorConfig {
  fn default() -> Self {
    Self {
      lat:           -23.5505,
      lng:           -46.6333,
      gps_available: true,
    }
  }
}
