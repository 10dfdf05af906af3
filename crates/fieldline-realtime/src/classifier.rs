//! Turns raw change events into user-facing alerts.
//!
//! [`classify`] is pure: the same event and session always give the same
//! answer, and replaying an identical change yields the same dedupe key.
//!
//! | Collection | Kind | Alert when |
//! |------------|------|------------|
//! | order | insert | always |
//! | order | update | `status` changed, or `before` unknown |
//! | activity | insert | author is not the session user |
//!
//! Everything else is suppressed.

use fieldline_core::{
  alert::AlertDescriptor,
  feed::{ChangeEvent, EntityKind, EventKind, RecordSnapshot},
  session::SessionIdentity,
  text::status_label,
};
use sha2::{Digest, Sha256};

pub const NEW_ORDER_TITLE: &str = "New work order";
pub const ORDER_UPDATED_TITLE: &str = "Work order updated";
pub const NEW_ACTIVITY_TITLE: &str = "New activity";

/// Decide whether `event` deserves an alert for `session`.
pub fn classify(
  event: &ChangeEvent,
  session: &SessionIdentity,
) -> Option<AlertDescriptor> {
  match (event.collection, event.kind) {
    (EntityKind::Order, EventKind::Insert) => order_created(event),
    (EntityKind::Order, EventKind::Update) => order_status_changed(event),
    (EntityKind::Activity, EventKind::Insert) => activity_logged(event, session),
    _ => None,
  }
}

fn order_created(event: &ChangeEvent) -> Option<AlertDescriptor> {
  let after = event.after.as_ref()?;
  let id = after.primary_key()?;
  let code = order_code(after, &id);
  let status = after.str_field("status").unwrap_or_default();

  Some(AlertDescriptor::new(
    NEW_ORDER_TITLE,
    format!("Work order {code} was opened"),
    order_link(&id),
    dedupe_key(event, status)?,
  ))
}

fn order_status_changed(event: &ChangeEvent) -> Option<AlertDescriptor> {
  let after = event.after.as_ref()?;
  let id = after.primary_key()?;
  let status = after.str_field("status")?;

  // A missing `before` (or a `before` without a status) means the backend
  // does not replicate full rows. Treat it as a change.
  let previous = event.before.as_ref().and_then(|b| b.str_field("status"));
  if previous == Some(status) {
    return None;
  }

  let code = order_code(after, &id);
  Some(AlertDescriptor::new(
    ORDER_UPDATED_TITLE,
    format!("{code}: status changed to {}", status_label(status)),
    order_link(&id),
    dedupe_key(event, status)?,
  ))
}

fn activity_logged(
  event: &ChangeEvent,
  session: &SessionIdentity,
) -> Option<AlertDescriptor> {
  let after = event.after.as_ref()?;
  let id = after.primary_key()?;

  let author_id = after.uuid_field("author_id");
  if author_id == Some(session.user_id) {
    return None;
  }

  let author = after
    .str_field("author_name")
    .or_else(|| after.str_field("author_id"))
    .unwrap_or("Someone");
  let description = after.str_field("description").unwrap_or_default();
  let link = match after.str_field("order_id") {
    Some(order_id) => order_link(order_id),
    None => "/os".to_owned(),
  };

  Some(AlertDescriptor::new(
    NEW_ACTIVITY_TITLE,
    format!("{author}: {description}"),
    link,
    dedupe_key(event, description)?,
  ))
}

fn order_code<'a>(after: &'a RecordSnapshot, id: &'a str) -> &'a str {
  after.str_field("code").unwrap_or(id)
}

fn order_link(id: &str) -> String { format!("/os/{id}") }

/// `{collection}:{kind}:{pk}:{hash}` where `pk` identifies the current row and
/// `hash` is the first 16 hex digits of SHA-256 over `discriminator` (status
/// or description).
fn dedupe_key(event: &ChangeEvent, discriminator: &str) -> Option<String> {
  let pk = event.current()?.primary_key()?;
  let digest = Sha256::digest(discriminator.as_bytes());
  let hash = hex::encode(digest);
  Some(format!("{}:{}:{pk}:{}", event.collection, event.kind, &hash[..16]))
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;
  use crate::testing::{
    activity, activity_inserted, identity, order, order_inserted, order_updated,
    raw_event,
  };

  #[test]
  fn order_insert_always_alerts() {
    let o = order("OS-042", "open");
    let alert = classify(&order_inserted(&o), &identity()).unwrap();

    assert_eq!(alert.title(), NEW_ORDER_TITLE);
    assert!(alert.body().contains("OS-042"));
    assert_eq!(alert.deep_link(), format!("/os/{}", o.id));
    assert!(alert.dedupe_key().starts_with(&format!("order:insert:{}:", o.id)));
  }

  #[test]
  fn update_with_same_status_is_suppressed() {
    let before = order("OS-1", "in_progress");
    let mut after = before.clone();
    after.description = Some("added a note".into());

    assert!(classify(&order_updated(Some(&before), &after), &identity()).is_none());
  }

  #[test]
  fn update_with_new_status_alerts_with_human_label() {
    let before = order("OS-1", "open");
    let mut after = before.clone();
    after.status = "waiting_parts".into();

    let alert = classify(&order_updated(Some(&before), &after), &identity()).unwrap();
    assert_eq!(alert.title(), ORDER_UPDATED_TITLE);
    assert!(alert.body().contains("WAITING PARTS"));
    assert!(alert.body().contains("OS-1"));
  }

  #[test]
  fn update_without_before_fails_open() {
    let after = order("OS-7", "done");
    let alert = classify(&order_updated(None, &after), &identity());
    assert!(alert.is_some());
  }

  #[test]
  fn before_without_status_counts_as_changed() {
    let after = order("OS-7", "done");
    let mut event = order_updated(Some(&after), &after);
    if let Some(before) = event.before.as_mut() {
      before.0.remove("status");
    }
    assert!(classify(&event, &identity()).is_some());
  }

  #[test]
  fn own_activity_is_suppressed() {
    let me = identity();
    let entry = activity(me.user_id, &me.display_name, "closed the ticket");
    assert!(classify(&activity_inserted(&entry), &me).is_none());
  }

  #[test]
  fn others_activity_alerts_once_with_author_and_text() {
    let me = identity();
    let mut entry = activity(Uuid::new_v4(), "Rui", "replaced the fan belt");
    let order_id = Uuid::new_v4();
    entry.order_id = Some(order_id);

    let alert = classify(&activity_inserted(&entry), &me).unwrap();
    assert_eq!(alert.title(), NEW_ACTIVITY_TITLE);
    assert_eq!(alert.body(), "Rui: replaced the fan belt");
    assert_eq!(alert.deep_link(), format!("/os/{order_id}"));
  }

  #[test]
  fn other_shapes_are_suppressed() {
    let me = identity();
    for (collection, kind) in [
      (EntityKind::Order, EventKind::Delete),
      (EntityKind::Activity, EventKind::Update),
      (EntityKind::Client, EventKind::Insert),
      (EntityKind::Equipment, EventKind::Update),
      (EntityKind::Quote, EventKind::Insert),
    ] {
      assert!(classify(&raw_event(collection, kind), &me).is_none());
    }
  }

  #[test]
  fn dedupe_key_is_stable_across_replays() {
    let me = identity();
    let before = order("OS-5", "open");
    let mut after = before.clone();
    after.status = "done".into();
    let event = order_updated(Some(&before), &after);

    let first = classify(&event, &me).unwrap();
    let replay = classify(&event.clone(), &me).unwrap();
    assert_eq!(first.dedupe_key(), replay.dedupe_key());

    let mut reopened = after.clone();
    reopened.status = "open".into();
    let next = classify(&order_updated(Some(&after), &reopened), &me).unwrap();
    assert_ne!(first.dedupe_key(), next.dedupe_key());
  }
}
