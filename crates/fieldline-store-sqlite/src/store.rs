//! [`SqliteStore`]: the SQLite implementation of [`RecordQuery`],
//! [`ProfileStore`] and [`ChangeFeedTransport`].

use std::{path::Path, sync::Arc};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tracing::{debug, info};
use uuid::Uuid;

use fieldline_core::{
  feed::{
    ChangeEvent, ChangeFeedTransport, EntityKind, EventFilter, EventKind,
    FeedChannel, RecordSnapshot,
  },
  location::LocationSample,
  records::{ActivityEntry, Client, Equipment, WorkOrder},
  session::SessionIdentity,
  store::{ProfilePatch, ProfileStore, RecordQuery},
};

use crate::{
  Error, Result,
  encode::{
    ACTIVITY_COLUMNS, CLIENT_COLUMNS, EQUIPMENT_COLUMNS, ORDER_COLUMNS,
    RawActivity, RawClient, RawEquipment, RawLocation, RawOrder, encode_dt,
    encode_uuid,
  },
  feed::ChangeHub,
  schema::SCHEMA,
};

/// Status given to newly opened work orders.
pub const INITIAL_STATUS: &str = "open";

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Fields of a work order to open. The store assigns the id and status.
#[derive(Debug, Clone, Default)]
pub struct NewWorkOrder {
  pub code:        String,
  pub client_name: Option<String>,
  pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewClient {
  pub name:     String,
  pub document: Option<String>,
  pub email:    Option<String>,
  pub phone:    Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewEquipment {
  pub name:          String,
  pub serial_number: Option<String>,
  pub model:         Option<String>,
  pub client_name:   Option<String>,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Fieldline backend stored in a single SQLite file.
///
/// Cloning is cheap; clones share the connection and the change feed.
#[derive(Clone)]
pub struct SqliteStore {
  conn:             tokio_rusqlite::Connection,
  feed:             Arc<ChangeHub>,
  full_replication: bool,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open a throwaway in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self {
      conn,
      feed: Arc::new(ChangeHub::default()),
      full_replication: true,
    })
  }

  /// Whether update and delete events carry the previous row. Disabled, the
  /// feed behaves like a backend without full row replication and `before`
  /// is always absent.
  pub fn with_full_replication(mut self, enabled: bool) -> Self {
    self.full_replication = enabled;
    self
  }

  /// Live change-feed subscribers.
  pub fn subscriber_count(&self) -> usize { self.feed.subscriber_count() }

  fn publish(
    &self,
    collection: EntityKind,
    kind: EventKind,
    before: Option<RecordSnapshot>,
    after: Option<RecordSnapshot>,
  ) {
    let before = before.filter(|_| self.full_replication);
    self.feed.publish(ChangeEvent {
      collection,
      kind,
      before,
      after,
    });
  }

  async fn select_all<R, F>(&self, sql: String, map: F) -> Result<Vec<R>>
  where
    R: Send + 'static,
    F: Fn(&rusqlite::Row<'_>) -> rusqlite::Result<R> + Send + 'static,
  {
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| map(row))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  // ── Work orders ───────────────────────────────────────────────────────────

  pub async fn insert_order(&self, input: NewWorkOrder) -> Result<WorkOrder> {
    let order = WorkOrder {
      id:          Uuid::new_v4(),
      code:        input.code,
      status:      INITIAL_STATUS.to_owned(),
      client_name: input.client_name,
      description: input.description,
    };

    let id_str      = encode_uuid(order.id);
    let code        = order.code.clone();
    let status      = order.status.clone();
    let client_name = order.client_name.clone();
    let description = order.description.clone();
    let now         = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO work_orders (
             order_id, code, status, client_name, description, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
          rusqlite::params![id_str, code, status, client_name, description, now],
        )?;
        Ok(())
      })
      .await?;

    info!(order_id = %order.id, code = %order.code, "work order opened");
    self.publish(
      EntityKind::Order,
      EventKind::Insert,
      None,
      Some(RecordSnapshot::from_record(&order)?),
    );
    Ok(order)
  }

  pub async fn find_order_by_code(&self, code: &str) -> Result<Option<WorkOrder>> {
    let code = code.to_owned();
    let raw: Option<RawOrder> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ORDER_COLUMNS} FROM work_orders WHERE code = ?1"),
              rusqlite::params![code],
              RawOrder::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawOrder::into_order).transpose()
  }

  /// Change an order's status and publish the update.
  ///
  /// Setting the current status again still publishes an update, the way a
  /// row touch would.
  pub async fn set_order_status(
    &self,
    order_id: Uuid,
    status: impl Into<String>,
  ) -> Result<WorkOrder> {
    let id_str = encode_uuid(order_id);
    let status = status.into();
    let now    = encode_dt(Utc::now());

    let rows: Option<(RawOrder, RawOrder)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let select = format!("SELECT {ORDER_COLUMNS} FROM work_orders WHERE order_id = ?1");
        let Some(before) = tx
          .query_row(&select, rusqlite::params![id_str], RawOrder::from_row)
          .optional()?
        else {
          return Ok(None);
        };
        tx.execute(
          "UPDATE work_orders SET status = ?2, updated_at = ?3 WHERE order_id = ?1",
          rusqlite::params![id_str, status, now],
        )?;
        let after = tx.query_row(&select, rusqlite::params![id_str], RawOrder::from_row)?;
        tx.commit()?;
        Ok(Some((before, after)))
      })
      .await?;

    let Some((before, after)) = rows else {
      return Err(Error::OrderNotFound(order_id.to_string()));
    };
    let before = before.into_order()?;
    let after = after.into_order()?;

    debug!(%order_id, from = %before.status, to = %after.status, "work order status set");
    self.publish(
      EntityKind::Order,
      EventKind::Update,
      Some(RecordSnapshot::from_record(&before)?),
      Some(RecordSnapshot::from_record(&after)?),
    );
    Ok(after)
  }

  /// Delete an order. Returns `false` if it did not exist.
  pub async fn delete_order(&self, order_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(order_id);
    let raw: Option<RawOrder> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let before = tx
          .query_row(
            &format!("SELECT {ORDER_COLUMNS} FROM work_orders WHERE order_id = ?1"),
            rusqlite::params![id_str],
            RawOrder::from_row,
          )
          .optional()?;
        if before.is_some() {
          tx.execute(
            "DELETE FROM work_orders WHERE order_id = ?1",
            rusqlite::params![id_str],
          )?;
        }
        tx.commit()?;
        Ok(before)
      })
      .await?;

    let Some(raw) = raw else {
      return Ok(false);
    };
    let before = raw.into_order()?;
    info!(%order_id, code = %before.code, "work order deleted");
    self.publish(
      EntityKind::Order,
      EventKind::Delete,
      Some(RecordSnapshot::from_record(&before)?),
      None,
    );
    Ok(true)
  }

  // ── Clients and equipment ─────────────────────────────────────────────────

  pub async fn insert_client(&self, input: NewClient) -> Result<Client> {
    let client = Client {
      id:       Uuid::new_v4(),
      name:     input.name,
      document: input.document,
      email:    input.email,
      phone:    input.phone,
    };

    let id_str   = encode_uuid(client.id);
    let name     = client.name.clone();
    let document = client.document.clone();
    let email    = client.email.clone();
    let phone    = client.phone.clone();
    let now      = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO clients (client_id, name, document, email, phone, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, name, document, email, phone, now],
        )?;
        Ok(())
      })
      .await?;

    self.publish(
      EntityKind::Client,
      EventKind::Insert,
      None,
      Some(RecordSnapshot::from_record(&client)?),
    );
    Ok(client)
  }

  pub async fn insert_equipment(&self, input: NewEquipment) -> Result<Equipment> {
    let equipment = Equipment {
      id:            Uuid::new_v4(),
      name:          input.name,
      serial_number: input.serial_number,
      model:         input.model,
      client_name:   input.client_name,
    };

    let id_str      = encode_uuid(equipment.id);
    let name        = equipment.name.clone();
    let serial      = equipment.serial_number.clone();
    let model       = equipment.model.clone();
    let client_name = equipment.client_name.clone();
    let now         = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO equipments (
             equipment_id, name, serial_number, model, client_name, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, name, serial, model, client_name, now],
        )?;
        Ok(())
      })
      .await?;

    self.publish(
      EntityKind::Equipment,
      EventKind::Insert,
      None,
      Some(RecordSnapshot::from_record(&equipment)?),
    );
    Ok(equipment)
  }

  // ── Activity log ──────────────────────────────────────────────────────────

  /// Append an activity entry authored by `author`.
  pub async fn log_activity(
    &self,
    author: &SessionIdentity,
    order_id: Option<Uuid>,
    description: impl Into<String>,
  ) -> Result<ActivityEntry> {
    let entry = ActivityEntry {
      id: Uuid::new_v4(),
      order_id,
      author_id: author.user_id,
      author_name: author.display_name.clone(),
      description: description.into(),
      created_at: Utc::now(),
    };

    let id_str       = encode_uuid(entry.id);
    let order_id_str = entry.order_id.map(encode_uuid);
    let author_str   = encode_uuid(entry.author_id);
    let author_name  = entry.author_name.clone();
    let description  = entry.description.clone();
    let at_str       = encode_dt(entry.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO activity_log (
             activity_id, order_id, author_id, author_name, description, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            order_id_str,
            author_str,
            author_name,
            description,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    self.publish(
      EntityKind::Activity,
      EventKind::Insert,
      None,
      Some(RecordSnapshot::from_record(&entry)?),
    );
    Ok(entry)
  }

  /// Activity entries, newest first.
  pub async fn list_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
    let raws = self
      .select_all(
        format!(
          "SELECT {ACTIVITY_COLUMNS} FROM activity_log
           ORDER BY created_at DESC, rowid DESC LIMIT {limit}"
        ),
        RawActivity::from_row,
      )
      .await?;
    raws.into_iter().map(RawActivity::into_activity).collect()
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  /// The last location written for `user_id`, if any.
  pub async fn profile_location(&self, user_id: Uuid) -> Result<Option<LocationSample>> {
    let id_str = encode_uuid(user_id);
    let raw: Option<RawLocation> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT lat, lng, captured_at, accuracy_tier FROM profiles WHERE user_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawLocation {
                  lat:           row.get(0)?,
                  lng:           row.get(1)?,
                  captured_at:   row.get(2)?,
                  accuracy_tier: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    match raw {
      Some(raw) => raw.into_sample(),
      None => Ok(None),
    }
  }
}

// ─── RecordQuery impl ────────────────────────────────────────────────────────

// Newest first, matching how the field client lists its collections.

impl RecordQuery for SqliteStore {
  type Error = Error;

  async fn list_orders(&self) -> Result<Vec<WorkOrder>> {
    let raws = self
      .select_all(
        format!("SELECT {ORDER_COLUMNS} FROM work_orders ORDER BY created_at DESC, rowid DESC"),
        RawOrder::from_row,
      )
      .await?;
    raws.into_iter().map(RawOrder::into_order).collect()
  }

  async fn list_clients(&self) -> Result<Vec<Client>> {
    let raws = self
      .select_all(
        format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY created_at DESC, rowid DESC"),
        RawClient::from_row,
      )
      .await?;
    raws.into_iter().map(RawClient::into_client).collect()
  }

  async fn list_equipments(&self) -> Result<Vec<Equipment>> {
    let raws = self
      .select_all(
        format!(
          "SELECT {EQUIPMENT_COLUMNS} FROM equipments ORDER BY created_at DESC, rowid DESC"
        ),
        RawEquipment::from_row,
      )
      .await?;
    raws.into_iter().map(RawEquipment::into_equipment).collect()
  }
}

// ─── ProfileStore impl ───────────────────────────────────────────────────────

impl ProfileStore for SqliteStore {
  type Error = Error;

  async fn update_profile(&self, user_id: Uuid, patch: ProfilePatch) -> Result<()> {
    let Some(sample) = patch.location else {
      return Ok(());
    };

    let id_str  = encode_uuid(user_id);
    let tier    = sample.accuracy_tier.to_string();
    let at_str  = encode_dt(sample.captured_at);
    let now     = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO profiles (user_id, lat, lng, captured_at, accuracy_tier, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT(user_id) DO UPDATE SET
             lat           = excluded.lat,
             lng           = excluded.lng,
             captured_at   = excluded.captured_at,
             accuracy_tier = excluded.accuracy_tier,
             updated_at    = excluded.updated_at",
          rusqlite::params![id_str, sample.lat, sample.lng, at_str, tier, now],
        )?;
        Ok(())
      })
      .await?;

    debug!(%user_id, tier = %sample.accuracy_tier, "profile location updated");
    Ok(())
  }
}

// ─── ChangeFeedTransport impl ────────────────────────────────────────────────

impl ChangeFeedTransport for SqliteStore {
  type Error = Error;

  async fn subscribe(
    &self,
    collection: EntityKind,
    filter: EventFilter,
  ) -> Result<FeedChannel> {
    debug!(%collection, ?filter, "local change feed subscribed");
    Ok(self.feed.subscribe(collection, filter))
  }
}
