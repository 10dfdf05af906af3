//! [`LiveLocationReporter`]: periodic best-effort position reporting.
//!
//! Each tick reads the position at high accuracy, falls back once to a low
//! accuracy read, and writes the result to the user's profile. Every failure
//! on that path is logged and swallowed; the loop simply waits for the next
//! tick. The first tick fires immediately.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use fieldline_core::{
  Error, Result,
  location::{AccuracyTier, LocationSample, Position, PositionOptions},
  platform::PositionSensor,
  session::{Role, SessionIdentity},
  store::{ProfilePatch, ProfileStore},
};
use tokio::{
  task::JoinHandle,
  time::{MissedTickBehavior, interval, timeout},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::LocationConfig;

/// What a single tick achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
  Reported(AccuracyTier),
  /// A position was read but the profile write failed.
  WriteFailed(AccuracyTier),
  /// Both reads failed.
  Skipped,
}

struct Running {
  shutdown: CancellationToken,
  task:     JoinHandle<()>,
}

pub struct LiveLocationReporter<S, P> {
  sensor:   Arc<S>,
  profiles: Arc<P>,
  config:   LocationConfig,
  running:  Option<Running>,
}

impl<S, P> LiveLocationReporter<S, P>
where
  S: PositionSensor,
  P: ProfileStore,
{
  pub fn new(sensor: Arc<S>, profiles: Arc<P>, config: LocationConfig) -> Self {
    Self {
      sensor,
      profiles,
      config,
      running: None,
    }
  }

  pub fn is_running(&self) -> bool { self.running.is_some() }

  /// Start reporting for `session`. Returns `false` without starting when
  /// `role` is exempt or the configured period is zero. Starting twice keeps
  /// the existing loop.
  ///
  /// Must be called from within a tokio runtime.
  pub fn start(&mut self, session: &SessionIdentity, role: Role) -> bool {
    if self.config.is_exempt(role) {
      info!(%role, "location reporting disabled for role");
      return false;
    }
    if self.config.period().is_zero() {
      warn!("location period is zero; location reporting disabled");
      return false;
    }
    if self.running.is_some() {
      debug!("location reporter already running");
      return true;
    }

    let shutdown = CancellationToken::new();
    let task = tokio::spawn(report_periodically(
      self.sensor.clone(),
      self.profiles.clone(),
      self.config.clone(),
      session.user_id,
      shutdown.clone(),
    ));
    info!(user_id = %session.user_id, period = ?self.config.period(), "location reporting started");
    self.running = Some(Running { shutdown, task });
    true
  }

  /// Cancel the loop and wait for it. An in-flight read is discarded; a
  /// profile write that already started is awaited, so nothing is written
  /// after this returns.
  pub async fn stop(&mut self) {
    let Some(running) = self.running.take() else {
      return;
    };
    running.shutdown.cancel();
    if let Err(e) = running.task.await
      && e.is_panic()
    {
      warn!(error = %e, "location reporter panicked");
    }
    info!("location reporting stopped");
  }
}

impl<S, P> Drop for LiveLocationReporter<S, P> {
  fn drop(&mut self) {
    if let Some(running) = self.running.take() {
      running.shutdown.cancel();
      running.task.abort();
    }
  }
}

async fn report_periodically<S, P>(
  sensor: Arc<S>,
  profiles: Arc<P>,
  config: LocationConfig,
  user_id: Uuid,
  shutdown: CancellationToken,
) where
  S: PositionSensor,
  P: ProfileStore,
{
  let mut ticker = interval(config.period());
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

  loop {
    tokio::select! {
      biased;
      _ = shutdown.cancelled() => break,
      _ = ticker.tick() => {}
    }
    let fix = tokio::select! {
      biased;
      _ = shutdown.cancelled() => break,
      fix = locate(&*sensor, &config) => fix,
    };
    let Some((position, tier)) = fix else {
      debug!("no position this tick");
      continue;
    };
    if shutdown.is_cancelled() {
      break;
    }
    let outcome = write(&*profiles, user_id, position, tier).await;
    debug!(?outcome, "location tick finished");
  }
}

/// Run one tick: read with fallback, then write.
pub async fn report_once<S, P>(
  sensor: &S,
  profiles: &P,
  config: &LocationConfig,
  user_id: Uuid,
) -> TickOutcome
where
  S: PositionSensor,
  P: ProfileStore,
{
  match locate(sensor, config).await {
    Some((position, tier)) => write(profiles, user_id, position, tier).await,
    None => TickOutcome::Skipped,
  }
}

/// High-accuracy read, falling back once to low accuracy.
async fn locate<S: PositionSensor>(
  sensor: &S,
  config: &LocationConfig,
) -> Option<(Position, AccuracyTier)> {
  let high = PositionOptions {
    high_accuracy: true,
    timeout:       config.high_accuracy_timeout(),
    maximum_age:   Duration::ZERO,
  };
  let low = PositionOptions {
    high_accuracy: false,
    timeout:       config.low_accuracy_timeout(),
    maximum_age:   Duration::ZERO,
  };

  match read(sensor, high).await {
    Ok(fix) => Some(fix),
    Err(e) => {
      debug!(error = %e, "high-accuracy read failed; retrying at low accuracy");
      read(sensor, low)
        .await
        .inspect_err(|e| debug!(error = %e, "low-accuracy read failed; skipping tick"))
        .ok()
    }
  }
}

async fn write<P: ProfileStore>(
  profiles: &P,
  user_id: Uuid,
  position: Position,
  tier: AccuracyTier,
) -> TickOutcome {
  let sample = LocationSample::from_position(position, tier, Utc::now());
  match profiles
    .update_profile(user_id, ProfilePatch::location(sample))
    .await
  {
    Ok(()) => TickOutcome::Reported(tier),
    Err(e) => {
      warn!(%user_id, error = %e, "failed to write location to profile");
      TickOutcome::WriteFailed(tier)
    }
  }
}

/// A sensor read bounded by `options.timeout`, whatever the sensor does.
async fn read<S: PositionSensor>(
  sensor: &S,
  options: PositionOptions,
) -> Result<(Position, AccuracyTier)> {
  match timeout(options.timeout, sensor.current_position(options)).await {
    Ok(result) => result.map(|position| (position, options.tier())),
    Err(_) => Err(Error::SensorTimeout(options.timeout)),
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::Ordering;

  use super::*;
  use crate::testing::{FakeProfiles, FakeSensor, Fix, identity, settle};

  const HERE: Position = Position {
    lat: -23.55,
    lng: -46.63,
  };

  fn reporter(
    sensor: FakeSensor,
  ) -> (
    LiveLocationReporter<FakeSensor, FakeProfiles>,
    Arc<FakeSensor>,
    Arc<FakeProfiles>,
  ) {
    let sensor = Arc::new(sensor);
    let profiles = Arc::new(FakeProfiles::default());
    let reporter =
      LiveLocationReporter::new(sensor.clone(), profiles.clone(), LocationConfig::default());
    (reporter, sensor, profiles)
  }

  #[tokio::test(start_paused = true)]
  async fn first_tick_fires_immediately_at_high_accuracy() {
    let (mut reporter, sensor, profiles) = reporter(FakeSensor::new(Fix::At(HERE), Fix::Fail));
    let me = identity();
    assert!(reporter.start(&me, Role::Technician));
    settle().await;

    let writes = profiles.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, me.user_id);
    let sample = writes[0].1.location.unwrap();
    assert_eq!((sample.lat, sample.lng), (HERE.lat, HERE.lng));
    assert_eq!(sample.accuracy_tier, AccuracyTier::High);

    let reads = sensor.reads();
    assert_eq!(reads.len(), 1);
    assert!(reads[0].high_accuracy);
    assert_eq!(reads[0].timeout, Duration::from_secs(10));
    assert_eq!(reads[0].maximum_age, Duration::ZERO);

    reporter.stop().await;
  }

  #[tokio::test(start_paused = true)]
  async fn high_accuracy_failure_retries_once_at_low_accuracy() {
    let (mut reporter, sensor, profiles) = reporter(FakeSensor::new(Fix::Fail, Fix::At(HERE)));
    reporter.start(&identity(), Role::Technician);
    settle().await;

    let reads = sensor.reads();
    assert_eq!(reads.len(), 2);
    assert!(!reads[1].high_accuracy);
    assert_eq!(reads[1].timeout, Duration::from_secs(5));
    assert_eq!(
      profiles.writes()[0].1.location.unwrap().accuracy_tier,
      AccuracyTier::Low
    );

    reporter.stop().await;
  }

  #[tokio::test(start_paused = true)]
  async fn both_reads_failing_skips_the_tick_and_keeps_looping() {
    let (mut reporter, sensor, profiles) = reporter(FakeSensor::new(Fix::Fail, Fix::Fail));
    reporter.start(&identity(), Role::Technician);
    settle().await;
    assert_eq!(sensor.reads().len(), 2);
    assert!(profiles.writes().is_empty());
    assert!(reporter.is_running());

    tokio::time::sleep(Duration::from_secs(180)).await;
    assert_eq!(sensor.reads().len(), 4);
    assert!(profiles.writes().is_empty());

    reporter.stop().await;
  }

  #[tokio::test(start_paused = true)]
  async fn hung_sensor_times_out_then_falls_back() {
    let sensor = FakeSensor::new(Fix::Hang, Fix::At(HERE));
    let profiles = FakeProfiles::default();

    let outcome = report_once(&sensor, &profiles, &LocationConfig::default(), Uuid::new_v4()).await;
    assert_eq!(outcome, TickOutcome::Reported(AccuracyTier::Low));
    assert_eq!(sensor.reads().len(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn hung_sensor_on_both_tiers_is_skipped() {
    let sensor = FakeSensor::new(Fix::Hang, Fix::Hang);
    let profiles = FakeProfiles::default();

    let started = tokio::time::Instant::now();
    let outcome = report_once(&sensor, &profiles, &LocationConfig::default(), Uuid::new_v4()).await;
    assert_eq!(outcome, TickOutcome::Skipped);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(15) && elapsed < Duration::from_secs(16));
  }

  #[tokio::test(start_paused = true)]
  async fn write_failures_are_swallowed() {
    let (mut reporter, _sensor, profiles) = reporter(FakeSensor::new(Fix::At(HERE), Fix::Fail));
    profiles.fail.store(true, Ordering::SeqCst);
    reporter.start(&identity(), Role::Supervisor);
    settle().await;

    tokio::time::sleep(Duration::from_secs(180)).await;
    assert_eq!(profiles.writes().len(), 2);
    assert!(reporter.is_running());

    reporter.stop().await;
  }

  #[tokio::test(start_paused = true)]
  async fn reports_once_per_period() {
    let (mut reporter, _sensor, profiles) = reporter(FakeSensor::new(Fix::At(HERE), Fix::Fail));
    reporter.start(&identity(), Role::Technician);
    settle().await;

    tokio::time::sleep(Duration::from_secs(2 * 180)).await;
    assert_eq!(profiles.writes().len(), 3);

    reporter.stop().await;
  }

  #[tokio::test(start_paused = true)]
  async fn exempt_role_never_writes() {
    let (mut reporter, sensor, profiles) = reporter(FakeSensor::new(Fix::At(HERE), Fix::At(HERE)));
    assert!(!reporter.start(&identity(), Role::Office));
    assert!(!reporter.is_running());

    tokio::time::sleep(Duration::from_secs(181)).await;
    assert!(profiles.writes().is_empty());
    assert!(sensor.reads().is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn stop_cancels_the_loop_and_in_flight_reads() {
    let (mut reporter, sensor, profiles) = reporter(FakeSensor::new(Fix::Hang, Fix::At(HERE)));
    reporter.start(&identity(), Role::Technician);
    settle().await;
    assert_eq!(sensor.reads().len(), 1);

    reporter.stop().await;
    assert!(!reporter.is_running());

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(sensor.reads().len(), 1);
    assert!(profiles.writes().is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn zero_period_refuses_to_start() {
    let sensor = Arc::new(FakeSensor::new(Fix::At(HERE), Fix::At(HERE)));
    let profiles = Arc::new(FakeProfiles::default());
    let config = LocationConfig {
      period_secs: 0,
      ..LocationConfig::default()
    };
    let mut reporter = LiveLocationReporter::new(sensor.clone(), profiles.clone(), config);

    assert!(!reporter.start(&identity(), Role::Technician));
    assert!(!reporter.is_running());
    settle().await;
    assert!(sensor.reads().is_empty());
    assert!(profiles.writes().is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn stop_waits_for_a_write_in_progress() {
    let sensor = Arc::new(FakeSensor::new(Fix::At(HERE), Fix::Fail));
    let profiles = Arc::new(FakeProfiles {
      write_delay: Duration::from_secs(1),
      ..FakeProfiles::default()
    });
    let mut reporter =
      LiveLocationReporter::new(sensor.clone(), profiles.clone(), LocationConfig::default());
    reporter.start(&identity(), Role::Technician);
    settle().await;
    assert!(profiles.writes().is_empty());

    reporter.stop().await;
    assert_eq!(profiles.writes().len(), 1);

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(profiles.writes().len(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn dropping_the_reporter_stops_the_timer() {
    let (mut reporter, sensor, _profiles) = reporter(FakeSensor::new(Fix::At(HERE), Fix::Fail));
    reporter.start(&identity(), Role::Technician);
    settle().await;
    drop(reporter);

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(sensor.reads().len(), 1);
  }
}
