//! Console implementations of the device surfaces: notifications are printed
//! as lines, and the position comes from configuration.

use std::{
  fmt,
  io::{self, Write},
  sync::{Arc, Mutex, PoisonError},
};

use fieldline_core::{
  Error,
  alert::NotificationPayload,
  location::{Position, PositionOptions},
  platform::{NotificationPlatform, PermissionState, PositionSensor},
};
use tracing::debug;

use crate::config::{PlatformConfig, SensorConfig};

// ─── Console ─────────────────────────────────────────────────────────────────

/// A shared line-oriented output. Clones write to the same sink.
#[derive(Clone)]
pub struct Console {
  out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Console {
  pub fn new(out: impl Write + Send + 'static) -> Self {
    Self {
      out: Arc::new(Mutex::new(Box::new(out))),
    }
  }

  pub fn stdout() -> Self { Self::new(io::stdout()) }

  pub fn line(&self, args: fmt::Arguments<'_>) -> io::Result<()> {
    let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
    out.write_fmt(args)?;
    out.write_all(b"\n")?;
    out.flush()
  }
}

// ─── Notifications ───────────────────────────────────────────────────────────

/// Prints notifications to a [`Console`]. Both tiers are simulated; which
/// ones are available comes from [`PlatformConfig`].
pub struct ConsolePlatform {
  config:     PlatformConfig,
  permission: Mutex<PermissionState>,
  console:    Console,
}

impl ConsolePlatform {
  pub fn new(config: PlatformConfig, console: Console) -> Self {
    Self {
      permission: Mutex::new(config.permission),
      config,
      console,
    }
  }

  fn print(&self, tier: &str, payload: &NotificationPayload) -> io::Result<()> {
    self.console.line(format_args!(
      "[{tier}] {}: {} <{}>",
      payload.title, payload.body, payload.deep_link_url
    ))
  }
}

impl NotificationPlatform for ConsolePlatform {
  type Error = io::Error;

  fn notification_permission(&self) -> PermissionState {
    *self.permission.lock().unwrap_or_else(PoisonError::into_inner)
  }

  async fn request_notification_permission(&self) -> PermissionState {
    let answer = self.config.prompt_answer;
    *self.permission.lock().unwrap_or_else(PoisonError::into_inner) = answer;
    debug!(?answer, "permission prompt answered from configuration");
    answer
  }

  async fn background_agent_ready(&self) -> bool { self.config.background_agent }

  async fn deliver_background(&self, payload: &NotificationPayload) -> io::Result<()> {
    self.print("background", payload)
  }

  fn supports_native(&self) -> bool { self.config.native }

  fn render_native(&self, payload: &NotificationPayload) -> io::Result<()> {
    self.print("native", payload)
  }
}

// ─── Position ────────────────────────────────────────────────────────────────

/// Always reports the configured position.
pub struct FixedSensor {
  position:      Position,
  gps_available: bool,
}

impl FixedSensor {
  pub fn new(config: &SensorConfig) -> Self {
    Self {
      position:      Position {
        lat: config.lat,
        lng: config.lng,
      },
      gps_available: config.gps_available,
    }
  }
}

impl PositionSensor for FixedSensor {
  async fn current_position(
    &self,
    options: PositionOptions,
  ) -> fieldline_core::Result<Position> {
    if options.high_accuracy && !self.gps_available {
      return Err(Error::SensorUnavailable("no GPS fix".into()));
    }
    Ok(self.position)
  }
}
