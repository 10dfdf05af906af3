//! [`NotificationDispatcher`]: tiered, permission-checked, deduplicated
//! delivery of alerts.
//!
//! Delivery is best-effort. Tiers are tried in order and the first success
//! wins:
//!
//! 1. the background agent, when registered and ready;
//! 2. a native alert rendered by the foreground application;
//! 3. otherwise [`DeliveryOutcome::Failed`], logged and swallowed.
//!
//! Permission is checked before either tier; without it nothing is attempted.

use std::{
  collections::HashSet,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
  },
};

use fieldline_core::{
  Error, Result,
  alert::{AlertDescriptor, DeliveryOutcome, DeliveryTier, NotificationPayload},
  platform::{NotificationPlatform, PermissionState},
};
use tracing::{debug, info, warn};

use crate::{config::AlertConfig, lock};

const ENABLE_IN_SETTINGS: &str =
  "notifications are blocked; enable them for this app in the system settings";

/// Delivers alerts to a [`NotificationPlatform`].
///
/// The set of delivered dedupe keys lives as long as the session; call
/// [`begin_session`](Self::begin_session) when a new one starts.
pub struct NotificationDispatcher<P> {
  platform:  Arc<P>,
  config:    AlertConfig,
  delivered: Mutex<HashSet<String>>,
  prompted:  AtomicBool,
}

impl<P: NotificationPlatform> NotificationDispatcher<P> {
  pub fn new(platform: Arc<P>, config: AlertConfig) -> Self {
    Self {
      platform,
      config,
      delivered: Mutex::new(HashSet::new()),
      prompted: AtomicBool::new(false),
    }
  }

  /// Forget the dedupe keys of the previous session.
  pub fn begin_session(&self) { lock(&self.delivered).clear(); }

  /// Deliver `alert` through the first tier that accepts it.
  pub async fn dispatch(&self, alert: &AlertDescriptor) -> DeliveryOutcome {
    let permission = self.platform.notification_permission();
    if permission != PermissionState::Granted {
      debug!(?permission, key = alert.dedupe_key(), "notification permission not granted");
      return DeliveryOutcome::PermissionDenied;
    }

    if !self.claim(alert.dedupe_key()) {
      debug!(key = alert.dedupe_key(), "alert already delivered this session");
      return DeliveryOutcome::Duplicate;
    }

    let payload = self.payload(alert);

    if self.platform.background_agent_ready().await {
      match self.platform.deliver_background(&payload).await {
        Ok(()) => return DeliveryOutcome::Delivered(DeliveryTier::Background),
        Err(e) => debug!(error = %e, "background delivery failed; trying native"),
      }
    }

    if self.platform.supports_native() {
      match self.platform.render_native(&payload) {
        Ok(()) => return DeliveryOutcome::Delivered(DeliveryTier::Foreground),
        Err(e) => debug!(error = %e, "native notification failed"),
      }
    }

    // Let a replay of the same change try again.
    self.release(alert.dedupe_key());
    let error = Error::DeliveryFailure("no notification tier accepted the alert".into());
    warn!(key = alert.dedupe_key(), %error, "alert dropped");
    DeliveryOutcome::Failed
  }

  /// Ask for notification permission.
  ///
  /// A denied permission is never re-prompted; the returned error carries a
  /// hint telling the user to change the platform setting. An undecided
  /// permission shows the platform prompt at most once per dispatcher.
  pub async fn request_permission(&self) -> Result<()> {
    match self.platform.notification_permission() {
      PermissionState::Granted => Ok(()),
      PermissionState::Denied => Err(permission_denied()),
      PermissionState::Prompt => {
        if self.prompted.swap(true, Ordering::SeqCst) {
          return Err(permission_denied());
        }
        let answer = self.platform.request_notification_permission().await;
        info!(?answer, "notification permission prompt answered");
        match answer {
          PermissionState::Granted => Ok(()),
          _ => Err(permission_denied()),
        }
      }
    }
  }

  fn payload(&self, alert: &AlertDescriptor) -> NotificationPayload {
    NotificationPayload {
      title:             alert.title().to_owned(),
      body:              alert.body().to_owned(),
      icon:              self.config.icon.clone(),
      badge:             self.config.badge.clone(),
      vibration_pattern: self.config.vibration_pattern.clone(),
      deep_link_url:     self.config.deep_link_url(alert.deep_link()),
      tag:               alert.dedupe_key().to_owned(),
    }
  }

  fn claim(&self, key: &str) -> bool { lock(&self.delivered).insert(key.to_owned()) }

  fn release(&self, key: &str) { lock(&self.delivered).remove(key); }
}

fn permission_denied() -> Error {
  Error::PermissionDenied {
    hint: ENABLE_IN_SETTINGS.into(),
  }
}
