//! In-memory fakes of the collaborator traits, shared by the unit tests.

use std::{
  collections::VecDeque,
  io,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
  time::Duration,
};

use chrono::Utc;
use fieldline_core::{
  alert::{DeliveryTier, NotificationPayload},
  feed::{
    ChangeEvent, ChangeFeedTransport, EntityKind, EventFilter, EventKind,
    FeedChannel, RecordSnapshot,
  },
  location::{Position, PositionOptions},
  platform::{NotificationPlatform, PermissionState, PositionSensor},
  records::{ActivityEntry, Client, Equipment, WorkOrder},
  session::SessionIdentity,
  store::{ProfilePatch, ProfileStore, RecordQuery},
};
use serde_json::json;
use tokio::sync::{Notify, mpsc};
use uuid::Uuid;

use crate::lock;

/// Let spawned tasks run and virtual time move a little.
pub async fn settle() { tokio::time::sleep(Duration::from_millis(1)).await; }

pub fn identity() -> SessionIdentity {
  SessionIdentity {
    user_id:      Uuid::new_v4(),
    display_name: "Dana Tech".into(),
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

pub fn order(code: &str, status: &str) -> WorkOrder {
  WorkOrder {
    id:          Uuid::new_v4(),
    code:        code.into(),
    status:      status.into(),
    client_name: None,
    description: None,
  }
}

pub fn snapshot<T: serde::Serialize>(record: &T) -> RecordSnapshot {
  RecordSnapshot::from_record(record).unwrap()
}

pub fn order_inserted(order: &WorkOrder) -> ChangeEvent {
  ChangeEvent {
    collection: EntityKind::Order,
    kind:       EventKind::Insert,
    before:     None,
    after:      Some(snapshot(order)),
  }
}

pub fn order_updated(
  before: Option<&WorkOrder>,
  after: &WorkOrder,
) -> ChangeEvent {
  ChangeEvent {
    collection: EntityKind::Order,
    kind:       EventKind::Update,
    before:     before.map(snapshot),
    after:      Some(snapshot(after)),
  }
}

pub fn activity(author_id: Uuid, author_name: &str, text: &str) -> ActivityEntry {
  ActivityEntry {
    id: Uuid::new_v4(),
    order_id: None,
    author_id,
    author_name: author_name.into(),
    description: text.into(),
    created_at: Utc::now(),
  }
}

pub fn activity_inserted(entry: &ActivityEntry) -> ChangeEvent {
  ChangeEvent {
    collection: EntityKind::Activity,
    kind:       EventKind::Insert,
    before:     None,
    after:      Some(snapshot(entry)),
  }
}

pub fn raw_event(collection: EntityKind, kind: EventKind) -> ChangeEvent {
  ChangeEvent {
    collection,
    kind,
    before: None,
    after: Some(RecordSnapshot(
      json!({ "id": Uuid::new_v4().to_string() })
        .as_object()
        .cloned()
        .unwrap_or_default(),
    )),
  }
}

// ─── Transport ───────────────────────────────────────────────────────────────

type Channel = (EntityKind, EventFilter, mpsc::UnboundedSender<ChangeEvent>);

#[derive(Default)]
pub struct FakeTransport {
  channels:   Mutex<Vec<Channel>>,
  pub fail:   AtomicBool,
  pub opened: AtomicUsize,
}

impl FakeTransport {
  /// Deliver `event` to every open channel that wants it, the way the
  /// server would.
  pub fn push(&self, event: ChangeEvent) {
    for (collection, filter, tx) in lock(&self.channels).iter() {
      if *collection == event.collection && filter.matches(event.kind) {
        let _ = tx.send(event.clone());
      }
    }
  }

  /// Deliver regardless of collection or filter, to exercise local checks.
  pub fn push_unfiltered(&self, event: ChangeEvent) {
    for (_, _, tx) in lock(&self.channels).iter() {
      let _ = tx.send(event.clone());
    }
  }

  /// Channels whose receiving side is still alive.
  pub fn open_channels(&self) -> usize {
    lock(&self.channels)
      .iter()
      .filter(|(_, _, tx)| !tx.is_closed())
      .count()
  }

  /// End every channel from the server side.
  pub fn disconnect_all(&self) { lock(&self.channels).clear(); }
}

impl ChangeFeedTransport for FakeTransport {
  type Error = io::Error;

  async fn subscribe(
    &self,
    collection: EntityKind,
    filter: EventFilter,
  ) -> Result<FeedChannel, io::Error> {
    if self.fail.load(Ordering::SeqCst) {
      return Err(io::Error::other("connection refused"));
    }
    let (tx, rx) = mpsc::unbounded_channel();
    lock(&self.channels).push((collection, filter, tx));
    self.opened.fetch_add(1, Ordering::SeqCst);
    Ok(rx)
  }
}

// ─── Notification platform ───────────────────────────────────────────────────

pub struct FakePlatform {
  pub permission:       Mutex<PermissionState>,
  /// What the user answers when prompted.
  pub prompt_answer:    PermissionState,
  pub prompts:          AtomicUsize,
  pub background_ready: AtomicBool,
  pub background_fails: AtomicBool,
  pub native_supported: AtomicBool,
  pub native_fails:     AtomicBool,
  /// When set, background delivery waits for `release` before completing.
  pub hold_background:  AtomicBool,
  pub release:          Notify,
  /// Delivery attempts on either tier.
  pub attempts:         AtomicUsize,
  pub delivered:        Mutex<Vec<(DeliveryTier, NotificationPayload)>>,
}

impl FakePlatform {
  pub fn granted() -> Self {
    Self {
      permission:       Mutex::new(PermissionState::Granted),
      prompt_answer:    PermissionState::Granted,
      prompts:          AtomicUsize::new(0),
      background_ready: AtomicBool::new(true),
      background_fails: AtomicBool::new(false),
      native_supported: AtomicBool::new(true),
      native_fails:     AtomicBool::new(false),
      hold_background:  AtomicBool::new(false),
      release:          Notify::new(),
      attempts:         AtomicUsize::new(0),
      delivered:        Mutex::new(Vec::new()),
    }
  }

  pub fn with_permission(permission: PermissionState) -> Self {
    let platform = Self::granted();
    *lock(&platform.permission) = permission;
    platform
  }

  pub fn delivered(&self) -> Vec<(DeliveryTier, NotificationPayload)> {
    lock(&self.delivered).clone()
  }
}

impl NotificationPlatform for FakePlatform {
  type Error = io::Error;

  fn notification_permission(&self) -> PermissionState { *lock(&self.permission) }

  async fn request_notification_permission(&self) -> PermissionState {
    self.prompts.fetch_add(1, Ordering::SeqCst);
    *lock(&self.permission) = self.prompt_answer;
    self.prompt_answer
  }

  async fn background_agent_ready(&self) -> bool {
    self.background_ready.load(Ordering::SeqCst)
  }

  async fn deliver_background(
    &self,
    payload: &NotificationPayload,
  ) -> Result<(), io::Error> {
    self.attempts.fetch_add(1, Ordering::SeqCst);
    if self.hold_background.load(Ordering::SeqCst) {
      self.release.notified().await;
    }
    if self.background_fails.load(Ordering::SeqCst) {
      return Err(io::Error::other("background agent crashed"));
    }
    lock(&self.delivered).push((DeliveryTier::Background, payload.clone()));
    Ok(())
  }

  fn supports_native(&self) -> bool { self.native_supported.load(Ordering::SeqCst) }

  fn render_native(&self, payload: &NotificationPayload) -> Result<(), io::Error> {
    self.attempts.fetch_add(1, Ordering::SeqCst);
    if self.native_fails.load(Ordering::SeqCst) {
      return Err(io::Error::other("native surface unavailable"));
    }
    lock(&self.delivered).push((DeliveryTier::Foreground, payload.clone()));
    Ok(())
  }
}

// ─── Position sensor ─────────────────────────────────────────────────────────

/// How the fake sensor answers a read.
#[derive(Debug, Clone, Copy)]
pub enum Fix {
  At(Position),
  Fail,
  /// Never answers; the caller's timeout has to fire.
  Hang,
}

pub struct FakeSensor {
  pub high:  Mutex<Fix>,
  pub low:   Mutex<Fix>,
  pub reads: Mutex<Vec<PositionOptions>>,
}

impl FakeSensor {
  pub fn new(high: Fix, low: Fix) -> Self {
    Self {
      high:  Mutex::new(high),
      low:   Mutex::new(low),
      reads: Mutex::new(Vec::new()),
    }
  }

  pub fn reads(&self) -> Vec<PositionOptions> { lock(&self.reads).clone() }
}

impl PositionSensor for FakeSensor {
  async fn current_position(
    &self,
    options: PositionOptions,
  ) -> fieldline_core::Result<Position> {
    lock(&self.reads).push(options);
    let fix = if options.high_accuracy {
      *lock(&self.high)
    } else {
      *lock(&self.low)
    };
    match fix {
      Fix::At(position) => Ok(position),
      Fix::Fail => Err(fieldline_core::Error::SensorUnavailable(
        "no satellite fix".into(),
      )),
      Fix::Hang => std::future::pending().await,
    }
  }
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeProfiles {
  pub fail:        AtomicBool,
  /// Time each write spends before it lands.
  pub write_delay: Duration,
  pub writes:      Mutex<Vec<(Uuid, ProfilePatch)>>,
}

impl FakeProfiles {
  pub fn writes(&self) -> Vec<(Uuid, ProfilePatch)> { lock(&self.writes).clone() }
}

impl ProfileStore for FakeProfiles {
  type Error = io::Error;

  async fn update_profile(
    &self,
    user_id: Uuid,
    patch: ProfilePatch,
  ) -> Result<(), io::Error> {
    if !self.write_delay.is_zero() {
      tokio::time::sleep(self.write_delay).await;
    }
    lock(&self.writes).push((user_id, patch));
    if self.fail.load(Ordering::SeqCst) {
      return Err(io::Error::other("profile store offline"));
    }
    Ok(())
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeRecords {
  pub orders:       Vec<WorkOrder>,
  pub clients:      Vec<Client>,
  pub equipments:   Vec<Equipment>,
  pub read_delay:   Duration,
  pub fail_clients: bool,
  /// Incremented per `list_orders` call, so tests can count executed queries.
  pub order_reads:  AtomicUsize,
  pub reads:        AtomicUsize,
}

impl FakeRecords {
  async fn read<T: Clone>(&self, items: &[T]) -> Vec<T> {
    self.reads.fetch_add(1, Ordering::SeqCst);
    if !self.read_delay.is_zero() {
      tokio::time::sleep(self.read_delay).await;
    }
    items.to_vec()
  }
}

impl RecordQuery for FakeRecords {
  type Error = io::Error;

  async fn list_orders(&self) -> Result<Vec<WorkOrder>, io::Error> {
    self.order_reads.fetch_add(1, Ordering::SeqCst);
    Ok(self.read(&self.orders).await)
  }

  async fn list_clients(&self) -> Result<Vec<Client>, io::Error> {
    let clients = self.read(&self.clients).await;
    if self.fail_clients {
      return Err(io::Error::other("clients table locked"));
    }
    Ok(clients)
  }

  async fn list_equipments(&self) -> Result<Vec<Equipment>, io::Error> {
    Ok(self.read(&self.equipments).await)
  }
}

pub fn client(name: &str) -> Client {
  Client {
    id:       Uuid::new_v4(),
    name:     name.into(),
    document: None,
    email:    None,
    phone:    None,
  }
}

pub fn equipment(name: &str, serial: &str) -> Equipment {
  Equipment {
    id:            Uuid::new_v4(),
    name:          name.into(),
    serial_number: Some(serial.into()),
    model:         None,
    client_name:   None,
  }
}

/// Shared queue helper for collecting callback output in order.
pub fn collector<T: Send + 'static>() -> (Arc<Mutex<VecDeque<T>>>, impl Fn(T) + Send + 'static) {
  let seen = Arc::new(Mutex::new(VecDeque::new()));
  let sink = seen.clone();
  (seen, move |item| lock(&sink).push_back(item))
}
