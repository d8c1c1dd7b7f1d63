//! The replacement ledger — immutable records of replacement actions.
//!
//! Events are appended once and never updated or deleted. Equipment events
//! link predecessor and successor units by identifier; license events carry
//! before/after snapshots of the installation placement, because license
//! history predating stable identifiers can only be recovered by matching
//! those fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::installation::Placement;

/// One replacement action, as persisted in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplacementEvent {
  pub event_id:             Uuid,
  /// Ledger insertion order; breaks ordering ties between events with the
  /// same timestamp.
  pub seq:                  i64,
  /// Server-assigned; never null.
  pub recorded_at:          DateTime<Utc>,
  pub installation_id:      Uuid,
  /// Absent on legacy events recorded before assets had stable identifiers.
  pub predecessor_asset_id: Option<Uuid>,
  /// For license replacements this equals `predecessor_asset_id`: the seat
  /// is mutated in place, not superseded by a new row.
  pub successor_asset_id:   Option<Uuid>,
  pub predecessor_fields:   Option<Placement>,
  pub successor_fields:     Option<Placement>,
  pub reason:               Option<String>,
}

/// Input to [`crate::store::AssetStore::append_event`].
/// The identifier, sequence number and `recorded_at` are set by the store.
#[derive(Debug, Clone)]
pub struct NewReplacementEvent {
  pub installation_id:      Uuid,
  pub predecessor_asset_id: Option<Uuid>,
  pub successor_asset_id:   Option<Uuid>,
  pub predecessor_fields:   Option<Placement>,
  pub successor_fields:     Option<Placement>,
  pub reason:               Option<String>,
}

/// Filter for [`crate::store::AssetStore::query_events`]. Results are always
/// ordered `recorded_at` descending, ties broken by insertion order.
#[derive(Debug, Clone)]
pub enum LedgerFilter {
  /// Events whose stored foreign key references this installation.
  ByInstallation(Uuid),
  /// Events referencing this asset on either end.
  ByAsset(Uuid),
  /// Events whose predecessor or successor snapshot equals this pair.
  /// Exists to recover license history that has no stable foreign key.
  ByPlacement(Placement),
}
