//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings and accuracy tiers by their lowercase name.

use chrono::{DateTime, Utc};
use fieldline_core::{
  location::{AccuracyTier, LocationSample},
  records::{ActivityEntry, Client, Equipment, WorkOrder},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── AccuracyTier ────────────────────────────────────────────────────────────

pub fn decode_accuracy(s: &str) -> Result<AccuracyTier> {
  match s {
    "high" => Ok(AccuracyTier::High),
    "low" => Ok(AccuracyTier::Low),
    other => Err(Error::Decode(format!("unknown accuracy tier: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const ORDER_COLUMNS: &str = "order_id, code, status, client_name, description";

/// Raw strings read directly from a `work_orders` row.
pub struct RawOrder {
  pub order_id:    String,
  pub code:        String,
  pub status:      String,
  pub client_name: Option<String>,
  pub description: Option<String>,
}

impl RawOrder {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      order_id:    row.get(0)?,
      code:        row.get(1)?,
      status:      row.get(2)?,
      client_name: row.get(3)?,
      description: row.get(4)?,
    })
  }

  pub fn into_order(self) -> Result<WorkOrder> {
    Ok(WorkOrder {
      id:          decode_uuid(&self.order_id)?,
      code:        self.code,
      status:      self.status,
      client_name: self.client_name,
      description: self.description,
    })
  }
}

pub const CLIENT_COLUMNS: &str = "client_id, name, document, email, phone";

pub struct RawClient {
  pub client_id: String,
  pub name:      String,
  pub document:  Option<String>,
  pub email:     Option<String>,
  pub phone:     Option<String>,
}

impl RawClient {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      client_id: row.get(0)?,
      name:      row.get(1)?,
      document:  row.get(2)?,
      email:     row.get(3)?,
      phone:     row.get(4)?,
    })
  }

  pub fn into_client(self) -> Result<Client> {
    Ok(Client {
      id:       decode_uuid(&self.client_id)?,
      name:     self.name,
      document: self.document,
      email:    self.email,
      phone:    self.phone,
    })
  }
}

pub const EQUIPMENT_COLUMNS: &str =
  "equipment_id, name, serial_number, model, client_name";

pub struct RawEquipment {
  pub equipment_id:  String,
  pub name:          String,
  pub serial_number: Option<String>,
  pub model:         Option<String>,
  pub client_name:   Option<String>,
}

impl RawEquipment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      equipment_id:  row.get(0)?,
      name:          row.get(1)?,
      serial_number: row.get(2)?,
      model:         row.get(3)?,
      client_name:   row.get(4)?,
    })
  }

  pub fn into_equipment(self) -> Result<Equipment> {
    Ok(Equipment {
      id:            decode_uuid(&self.equipment_id)?,
      name:          self.name,
      serial_number: self.serial_number,
      model:         self.model,
      client_name:   self.client_name,
    })
  }
}

pub const ACTIVITY_COLUMNS: &str =
  "activity_id, order_id, author_id, author_name, description, created_at";

pub struct RawActivity {
  pub activity_id: String,
  pub order_id:    Option<String>,
  pub author_id:   String,
  pub author_name: String,
  pub description: String,
  pub created_at:  String,
}

impl RawActivity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      activity_id: row.get(0)?,
      order_id:    row.get(1)?,
      author_id:   row.get(2)?,
      author_name: row.get(3)?,
      description: row.get(4)?,
      created_at:  row.get(5)?,
    })
  }

  pub fn into_activity(self) -> Result<ActivityEntry> {
    Ok(ActivityEntry {
      id:          decode_uuid(&self.activity_id)?,
      order_id:    self.order_id.as_deref().map(decode_uuid).transpose()?,
      author_id:   decode_uuid(&self.author_id)?,
      author_name: self.author_name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// The location columns of a `profiles` row. All four are set together.
pub struct RawLocation {
  pub lat:           Option<f64>,
  pub lng:           Option<f64>,
  pub captured_at:   Option<String>,
  pub accuracy_tier: Option<String>,
}

impl RawLocation {
  pub fn into_sample(self) -> Result<Option<LocationSample>> {
    let (Some(lat), Some(lng), Some(captured_at), Some(tier)) =
      (self.lat, self.lng, self.captured_at, self.accuracy_tier)
    else {
      return Ok(None);
    };
    Ok(Some(LocationSample {
      lat,
      lng,
      captured_at: decode_dt(&captured_at)?,
      accuracy_tier: decode_accuracy(&tier)?,
    }))
  }
}
