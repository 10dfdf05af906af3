//! [`AlertEngine`]: owns the session's change-feed subscriptions and feeds
//! classified alerts to the dispatcher.
//!
//! ```text
//! Idle ──start──▶ Subscribing ──▶ Active ──stop──▶ TearingDown ──▶ Idle
//! ```
//!
//! Events are classified inside the subscription callback and queued to a
//! single dispatch worker. `stop()` closes the subscriptions first, then
//! cancels the worker (dropping any dispatch still in flight) and waits for
//! it, so no dispatch call happens once `stop()` has returned.

use std::sync::Arc;

use fieldline_core::{
  Error, Result,
  alert::{AlertDescriptor, DeliveryOutcome},
  feed::{ChangeFeedTransport, EntityKind, EventFilter, EventKind},
  platform::NotificationPlatform,
  session::SessionIdentity,
};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
  classifier::classify,
  config::AlertConfig,
  dispatcher::NotificationDispatcher,
  subscription::Subscription,
};

/// The feeds every session listens to.
const FEEDS: [(EntityKind, EventFilter); 2] = [
  (EntityKind::Order, EventFilter::All),
  (EntityKind::Activity, EventFilter::Only(EventKind::Insert)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
  Idle,
  Subscribing,
  Active,
  TearingDown,
}

struct ActiveSession {
  identity:      SessionIdentity,
  subscriptions: Vec<Subscription>,
  shutdown:      CancellationToken,
  worker:        JoinHandle<()>,
}

/// Session-scoped alert orchestration.
pub struct AlertEngine<T, P> {
  transport:  Arc<T>,
  dispatcher: Arc<NotificationDispatcher<P>>,
  state:      EngineState,
  session:    Option<ActiveSession>,
}

impl<T, P> AlertEngine<T, P>
where
  T: ChangeFeedTransport,
  P: NotificationPlatform,
{
  pub fn new(transport: Arc<T>, platform: Arc<P>, config: AlertConfig) -> Self {
    Self {
      transport,
      dispatcher: Arc::new(NotificationDispatcher::new(platform, config)),
      state: EngineState::Idle,
      session: None,
    }
  }

  pub fn state(&self) -> EngineState { self.state }

  /// The identity of the running session, if any.
  pub fn session(&self) -> Option<&SessionIdentity> {
    self.session.as_ref().map(|s| &s.identity)
  }

  /// Ask the platform for notification permission. See
  /// [`NotificationDispatcher::request_permission`].
  pub async fn request_permission(&self) -> Result<()> {
    self.dispatcher.request_permission().await
  }

  /// Open the session's subscriptions and start dispatching.
  ///
  /// Fails with [`Error::AlreadyStarted`] unless the engine is idle. Must be
  /// called from within a tokio runtime.
  pub fn start(&mut self, identity: SessionIdentity) -> Result<()> {
    if self.state != EngineState::Idle {
      return Err(Error::AlreadyStarted);
    }
    self.state = EngineState::Subscribing;
    info!(user_id = %identity.user_id, "starting alert engine");

    self.dispatcher.begin_session();
    let (alerts_tx, alerts_rx) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();

    let subscriptions = FEEDS
      .into_iter()
      .map(|(collection, filter)| {
        let alerts = alerts_tx.clone();
        let identity = identity.clone();
        Subscription::open(self.transport.clone(), collection, filter, move |event| {
          match classify(&event, &identity) {
            Some(alert) => {
              let _ = alerts.send(alert);
            }
            None => trace!(%collection, kind = %event.kind, "event suppressed"),
          }
        })
      })
      .collect();

    let worker = tokio::spawn(dispatch_alerts(
      self.dispatcher.clone(),
      alerts_rx,
      shutdown.clone(),
    ));

    self.session = Some(ActiveSession {
      identity,
      subscriptions,
      shutdown,
      worker,
    });
    self.state = EngineState::Active;
    Ok(())
  }

  /// Close every subscription and stop dispatching. Idempotent.
  pub async fn stop(&mut self) {
    let Some(mut session) = self.session.take() else {
      return;
    };
    self.state = EngineState::TearingDown;

    for subscription in &mut session.subscriptions {
      subscription.close();
    }
    session.shutdown.cancel();
    if let Err(e) = session.worker.await
      && e.is_panic()
    {
      warn!(error = %e, "alert dispatch worker panicked");
    }

    info!(user_id = %session.identity.user_id, "alert engine stopped");
    self.state = EngineState::Idle;
  }
}

impl<T, P> Drop for AlertEngine<T, P> {
  fn drop(&mut self) {
    if let Some(session) = self.session.take() {
      session.shutdown.cancel();
      session.worker.abort();
    }
  }
}

async fn dispatch_alerts<P: NotificationPlatform>(
  dispatcher: Arc<NotificationDispatcher<P>>,
  mut alerts: mpsc::UnboundedReceiver<AlertDescriptor>,
  shutdown: CancellationToken,
) {
  loop {
    let alert = tokio::select! {
      biased;
      _ = shutdown.cancelled() => break,
      next = alerts.recv() => match next {
        Some(alert) => alert,
        None => break,
      },
    };

    tokio::select! {
      biased;
      _ = shutdown.cancelled() => {
        debug!(key = alert.dedupe_key(), "dropping in-flight alert on shutdown");
        break;
      }
      outcome = dispatcher.dispatch(&alert) => log_outcome(&alert, outcome),
    }
  }
}

fn log_outcome(alert: &AlertDescriptor, outcome: DeliveryOutcome) {
  match outcome {
    DeliveryOutcome::Delivered(tier) => {
      info!(key = alert.dedupe_key(), ?tier, title = alert.title(), "alert delivered")
    }
    DeliveryOutcome::Duplicate => trace!(key = alert.dedupe_key(), "duplicate alert"),
    DeliveryOutcome::PermissionDenied => {
      debug!(key = alert.dedupe_key(), "alert skipped; no notification permission")
    }
    // Already logged by the dispatcher.
    DeliveryOutcome::Failed => {}
  }
}
