//! SQL schema for the Fieldline SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for later migrations.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS work_orders (
    order_id     TEXT PRIMARY KEY,
    code         TEXT NOT NULL UNIQUE,   -- human-facing, e.g. 'OS-042'
    status       TEXT NOT NULL,          -- 'open' | 'in_progress' | ...
    client_name  TEXT,
    description  TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS clients (
    client_id   TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    document    TEXT,
    email       TEXT,
    phone       TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS equipments (
    equipment_id   TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    serial_number  TEXT,
    model          TEXT,
    client_name    TEXT,
    created_at     TEXT NOT NULL
);

-- Append-only.
CREATE TABLE IF NOT EXISTS activity_log (
    activity_id  TEXT PRIMARY KEY,
    order_id     TEXT REFERENCES work_orders(order_id) ON DELETE SET NULL,
    author_id    TEXT NOT NULL,
    author_name  TEXT NOT NULL,
    description  TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

-- One row per user; the location columns hold only the latest sample.
CREATE TABLE IF NOT EXISTS profiles (
    user_id        TEXT PRIMARY KEY,
    lat            REAL,
    lng            REAL,
    captured_at    TEXT,
    accuracy_tier  TEXT,                 -- 'high' | 'low'
    updated_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS work_orders_created_idx ON work_orders(created_at);
CREATE INDEX IF NOT EXISTS activity_order_idx      ON activity_log(order_id);

PRAGMA user_version = 1;
";
