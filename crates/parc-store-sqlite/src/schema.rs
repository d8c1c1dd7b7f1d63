//! SQL schema for the Parc SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS installations (
    installation_id TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    organization    TEXT,
    client          TEXT NOT NULL,
    site            TEXT NOT NULL,
    invoice_number  TEXT NOT NULL,
    invoice_date    TEXT NOT NULL,   -- ISO 8601 calendar date
    kind            TEXT NOT NULL,   -- 'equipment' | 'license'
    position        TEXT,            -- placement pair: both set or both NULL
    user            TEXT,
    created_at      TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

-- Descriptive fields never change in place; the only UPDATE issued against
-- this table sets the status column, and only forward.
CREATE TABLE IF NOT EXISTS assets (
    asset_id        TEXT PRIMARY KEY,
    installation_id TEXT NOT NULL REFERENCES installations(installation_id),
    detail_type     TEXT NOT NULL,   -- discriminant of AssetDetail variant
    detail_json     TEXT NOT NULL,   -- JSON payload (inner data only)
    status          TEXT NOT NULL DEFAULT 'active',
    created_at      TEXT NOT NULL
);

-- The replacement ledger is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS replacement_events (
    seq                  INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id             TEXT NOT NULL UNIQUE,
    recorded_at          TEXT NOT NULL,
    installation_id      TEXT NOT NULL REFERENCES installations(installation_id),
    predecessor_asset_id TEXT REFERENCES assets(asset_id),
    successor_asset_id   TEXT REFERENCES assets(asset_id),
    predecessor_position TEXT,
    predecessor_user     TEXT,
    successor_position   TEXT,
    successor_user       TEXT,
    reason               TEXT
);

CREATE INDEX IF NOT EXISTS assets_installation_idx ON assets(installation_id);
CREATE INDEX IF NOT EXISTS events_installation_idx ON replacement_events(installation_id);
CREATE INDEX IF NOT EXISTS events_predecessor_idx  ON replacement_events(predecessor_asset_id);
CREATE INDEX IF NOT EXISTS events_successor_idx    ON replacement_events(successor_asset_id);
CREATE INDEX IF NOT EXISTS events_recorded_idx     ON replacement_events(recorded_at);

PRAGMA user_version = 1;
";
