//! Asset types — the unit of lifecycle tracking.
//!
//! An asset is either a physical equipment unit or a software license seat,
//! owned by exactly one installation. Descriptive data lives in the tagged
//! [`AssetDetail`] payload; lifecycle state lives in [`AssetStatus`] and only
//! ever moves forward.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The two asset families, with diverging replacement semantics: equipment is
/// superseded by a new row, a license seat is mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
  Equipment,
  License,
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle status. The variant order is the monotonic progression:
/// `Active < Replaced < Inactive`; a status never moves backwards.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
  Active,
  Replaced,
  /// Terminal; licenses only. No further replacement is permitted.
  Inactive,
}

impl AssetStatus {
  pub fn is_terminal(self) -> bool { matches!(self, Self::Inactive) }
}

// ─── Detail payloads ─────────────────────────────────────────────────────────

/// Descriptive fields of a physical equipment unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentSpec {
  pub brand:         String,
  pub model:         String,
  pub serial_number: String,
  /// Free-text category, e.g. "printer", "scanner".
  pub unit_type:     String,
  pub installed_on:  NaiveDate,
}

/// Descriptive fields of a software license seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseSpec {
  pub license_type: String,
  pub description:  Option<String>,
}

/// The typed payload of an asset. The variant name serves as the
/// `detail_type` discriminant stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AssetDetail {
  EquipmentUnit(EquipmentSpec),
  LicenseSeat(LicenseSpec),
}

impl AssetDetail {
  pub fn kind(&self) -> AssetKind {
    match self {
      Self::EquipmentUnit(_) => AssetKind::Equipment,
      Self::LicenseSeat(_) => AssetKind::License,
    }
  }

  /// The discriminant string stored in the `detail_type` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::EquipmentUnit(_) => "equipment_unit",
      Self::LicenseSeat(_) => "license_seat",
    }
  }

  /// Serialise the inner payload (without the type tag) for the
  /// `detail_json` database column.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    // The full serialised form is `{"type": "...", "data": <payload>}`.
    // We want only the payload.
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Deserialise from the discriminant string and JSON payload stored in the
  /// database.
  pub fn from_parts(
    discriminant: &str,
    data: serde_json::Value,
  ) -> Result<Self> {
    if !matches!(discriminant, "equipment_unit" | "license_seat") {
      return Err(crate::Error::UnknownAssetDetail(discriminant.to_owned()));
    }
    let wrapped = serde_json::json!({ "type": discriminant, "data": data });
    Ok(serde_json::from_value(wrapped)?)
  }
}

// ─── Asset ───────────────────────────────────────────────────────────────────

/// An equipment unit or license seat. Descriptive fields never change in
/// place; the only in-place mutation is the status column, and only forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
  pub asset_id:        Uuid,
  pub installation_id: Uuid,
  pub detail:          AssetDetail,
  pub status:          AssetStatus,
  /// Server-assigned; never changes after creation.
  pub created_at:      DateTime<Utc>,
}

impl Asset {
  pub fn kind(&self) -> AssetKind { self.detail.kind() }
}

/// Input to [`crate::store::AssetStore::add_asset`].
/// New assets always start [`AssetStatus::Active`]; the identifier and
/// `created_at` are set by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAsset {
  pub installation_id: Uuid,
  pub detail:          AssetDetail,
}
