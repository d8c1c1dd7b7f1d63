//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings, calendar dates as ISO 8601
//! (`%Y-%m-%d`). Asset detail payloads are stored as compact JSON next to
//! their discriminant. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use parc_core::{
  asset::{Asset, AssetDetail, AssetStatus},
  installation::{Installation, InstallationKind, Placement},
  ledger::ReplacementEvent,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── InstallationKind ────────────────────────────────────────────────────────

pub fn encode_installation_kind(k: InstallationKind) -> &'static str {
  match k {
    InstallationKind::Equipment => "equipment",
    InstallationKind::License => "license",
  }
}

pub fn decode_installation_kind(s: &str) -> Result<InstallationKind> {
  match s {
    "equipment" => Ok(InstallationKind::Equipment),
    "license" => Ok(InstallationKind::License),
    other => Err(Error::UnknownKind(other.to_owned())),
  }
}

// ─── AssetStatus ─────────────────────────────────────────────────────────────

pub fn encode_status(s: AssetStatus) -> &'static str {
  match s {
    AssetStatus::Active => "active",
    AssetStatus::Replaced => "replaced",
    AssetStatus::Inactive => "inactive",
  }
}

pub fn decode_status(s: &str) -> Result<AssetStatus> {
  match s {
    "active" => Ok(AssetStatus::Active),
    "replaced" => Ok(AssetStatus::Replaced),
    "inactive" => Ok(AssetStatus::Inactive),
    other => {
      Err(Error::Core(parc_core::Error::UnknownStatus(other.to_owned())))
    }
  }
}

// ─── Placement ───────────────────────────────────────────────────────────────

/// Assemble a placement from its two columns. Exactly one set is corruption.
pub fn decode_placement(
  row_id: &str,
  position: Option<String>,
  user: Option<String>,
) -> Result<Option<Placement>> {
  match (position, user) {
    (Some(position), Some(user)) => Ok(Some(Placement { position, user })),
    (None, None) => Ok(None),
    _ => Err(Error::InconsistentPlacement(row_id.to_owned())),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `installations` row.
pub struct RawInstallation {
  pub installation_id: String,
  pub name:            String,
  pub organization:    Option<String>,
  pub client:          String,
  pub site:            String,
  pub invoice_number:  String,
  pub invoice_date:    String,
  pub kind:            String,
  pub position:        Option<String>,
  pub user:            Option<String>,
  pub created_at:      String,
}

impl RawInstallation {
  pub fn into_installation(self) -> Result<Installation> {
    let placement =
      decode_placement(&self.installation_id, self.position, self.user)?;
    Ok(Installation {
      installation_id: decode_uuid(&self.installation_id)?,
      name:            self.name,
      organization:    self.organization,
      client:          self.client,
      site:            self.site,
      invoice_number:  self.invoice_number,
      invoice_date:    decode_date(&self.invoice_date)?,
      kind:            decode_installation_kind(&self.kind)?,
      placement,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `assets` row.
pub struct RawAsset {
  pub asset_id:        String,
  pub installation_id: String,
  pub detail_type:     String,
  pub detail_json:     String,
  pub status:          String,
  pub created_at:      String,
}

impl RawAsset {
  pub fn into_asset(self) -> Result<Asset> {
    let data: serde_json::Value = serde_json::from_str(&self.detail_json)?;
    let detail = AssetDetail::from_parts(&self.detail_type, data)
      .map_err(Error::Core)?;
    Ok(Asset {
      asset_id:        decode_uuid(&self.asset_id)?,
      installation_id: decode_uuid(&self.installation_id)?,
      detail,
      status:          decode_status(&self.status)?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `replacement_events` row.
pub struct RawEvent {
  pub seq:                  i64,
  pub event_id:             String,
  pub recorded_at:          String,
  pub installation_id:      String,
  pub predecessor_asset_id: Option<String>,
  pub successor_asset_id:   Option<String>,
  pub predecessor_position: Option<String>,
  pub predecessor_user:     Option<String>,
  pub successor_position:   Option<String>,
  pub successor_user:       Option<String>,
  pub reason:               Option<String>,
}

impl RawEvent {
  pub fn into_event(self) -> Result<ReplacementEvent> {
    let predecessor_fields = decode_placement(
      &self.event_id,
      self.predecessor_position,
      self.predecessor_user,
    )?;
    let successor_fields = decode_placement(
      &self.event_id,
      self.successor_position,
      self.successor_user,
    )?;

    Ok(ReplacementEvent {
      event_id: decode_uuid(&self.event_id)?,
      seq: self.seq,
      recorded_at: decode_dt(&self.recorded_at)?,
      installation_id: decode_uuid(&self.installation_id)?,
      predecessor_asset_id: self
        .predecessor_asset_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      successor_asset_id: self
        .successor_asset_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      predecessor_fields,
      successor_fields,
      reason: self.reason,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn installation_kind_round_trips() {
    for kind in [InstallationKind::Equipment, InstallationKind::License] {
      assert_eq!(
        decode_installation_kind(encode_installation_kind(kind)).unwrap(),
        kind
      );
    }
  }

  #[test]
  fn unknown_kind_column_is_reported_as_such() {
    assert!(matches!(
      decode_installation_kind("printer"),
      Err(Error::UnknownKind(k)) if k == "printer"
    ));
  }
}
