//! [`SqliteStore`] — the SQLite implementation of [`AssetStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use parc_core::{
  asset::{Asset, AssetDetail, NewAsset},
  installation::{Installation, InstallationKind, NewInstallation},
  ledger::{LedgerFilter, NewReplacementEvent, ReplacementEvent},
  replace::{PlannedChange, ReplacementOutcome, ReplacementPlan},
  store::{ApplyError, AssetStore, DeleteError},
};

use crate::{
  encode::{
    RawAsset, RawEvent, RawInstallation, encode_date, encode_dt,
    encode_installation_kind, encode_status, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

const INSTALLATION_COLUMNS: &str = "installation_id, name, organization, \
   client, site, invoice_number, invoice_date, kind, position, user, \
   created_at";

const ASSET_COLUMNS: &str =
  "asset_id, installation_id, detail_type, detail_json, status, created_at";

const EVENT_COLUMNS: &str = "seq, event_id, recorded_at, installation_id, \
   predecessor_asset_id, successor_asset_id, predecessor_position, \
   predecessor_user, successor_position, successor_user, reason";

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn installation_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawInstallation> {
  Ok(RawInstallation {
    installation_id: row.get(0)?,
    name:            row.get(1)?,
    organization:    row.get(2)?,
    client:          row.get(3)?,
    site:            row.get(4)?,
    invoice_number:  row.get(5)?,
    invoice_date:    row.get(6)?,
    kind:            row.get(7)?,
    position:        row.get(8)?,
    user:            row.get(9)?,
    created_at:      row.get(10)?,
  })
}

fn asset_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAsset> {
  Ok(RawAsset {
    asset_id:        row.get(0)?,
    installation_id: row.get(1)?,
    detail_type:     row.get(2)?,
    detail_json:     row.get(3)?,
    status:          row.get(4)?,
    created_at:      row.get(5)?,
  })
}

fn event_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEvent> {
  Ok(RawEvent {
    seq:                  row.get(0)?,
    event_id:             row.get(1)?,
    recorded_at:          row.get(2)?,
    installation_id:      row.get(3)?,
    predecessor_asset_id: row.get(4)?,
    successor_asset_id:   row.get(5)?,
    predecessor_position: row.get(6)?,
    predecessor_user:     row.get(7)?,
    successor_position:   row.get(8)?,
    successor_user:       row.get(9)?,
    reason:               row.get(10)?,
  })
}

fn read_installation(
  conn: &rusqlite::Connection,
  id_str: &str,
) -> rusqlite::Result<RawInstallation> {
  conn.query_row(
    &format!(
      "SELECT {INSTALLATION_COLUMNS} FROM installations WHERE installation_id = ?1"
    ),
    rusqlite::params![id_str],
    installation_from_row,
  )
}

fn read_asset(
  conn: &rusqlite::Connection,
  id_str: &str,
) -> rusqlite::Result<RawAsset> {
  conn.query_row(
    &format!("SELECT {ASSET_COLUMNS} FROM assets WHERE asset_id = ?1"),
    rusqlite::params![id_str],
    asset_from_row,
  )
}

fn read_event_by_seq(
  conn: &rusqlite::Connection,
  seq: i64,
) -> rusqlite::Result<RawEvent> {
  conn.query_row(
    &format!("SELECT {EVENT_COLUMNS} FROM replacement_events WHERE seq = ?1"),
    rusqlite::params![seq],
    event_from_row,
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Parc asset store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// The refreshed rows produced by a committed replacement transaction.
struct RawApplied {
  event:        RawEvent,
  installation: RawInstallation,
  asset:        RawAsset,
  predecessor:  Option<RawAsset>,
}

/// Outcome of a guarded DELETE, decided inside the transaction.
enum DeleteCheck {
  Deleted,
  Missing,
  Referenced,
}

/// The successor representation of a plan, pre-encoded for the transaction
/// closure.
enum PreparedChange {
  NewUnit {
    detail_type: &'static str,
    detail_json: String,
  },
  FieldMutation {
    position: String,
    user:     String,
  },
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

#[cfg(test)]
impl SqliteStore {
  /// Run arbitrary DDL/DML — used by tests to inject storage faults.
  pub(crate) async fn execute_batch(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── AssetStore impl ─────────────────────────────────────────────────────────

impl AssetStore for SqliteStore {
  type Error = Error;

  // ── Installations ─────────────────────────────────────────────────────────

  async fn add_installation(
    &self,
    input: NewInstallation,
  ) -> Result<Installation> {
    let installation = Installation {
      installation_id: Uuid::new_v4(),
      name:            input.name,
      organization:    input.organization,
      client:          input.client,
      site:            input.site,
      invoice_number:  input.invoice_number,
      invoice_date:    input.invoice_date,
      kind:            input.kind,
      placement:       input.placement,
      created_at:      Utc::now(),
    };

    let id_str       = encode_uuid(installation.installation_id);
    let name         = installation.name.clone();
    let organization = installation.organization.clone();
    let client       = installation.client.clone();
    let site         = installation.site.clone();
    let invoice_no   = installation.invoice_number.clone();
    let invoice_date = encode_date(installation.invoice_date);
    let kind_str     = encode_installation_kind(installation.kind).to_owned();
    let position     = installation.placement.as_ref().map(|p| p.position.clone());
    let user         = installation.placement.as_ref().map(|p| p.user.clone());
    let at_str       = encode_dt(installation.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO installations (
             installation_id, name, organization, client, site,
             invoice_number, invoice_date, kind, position, user, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            id_str,
            name,
            organization,
            client,
            site,
            invoice_no,
            invoice_date,
            kind_str,
            position,
            user,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(installation)
  }

  async fn get_installation(&self, id: Uuid) -> Result<Option<Installation>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawInstallation> = self
      .conn
      .call(move |conn| Ok(read_installation(conn, &id_str).optional()?))
      .await?;

    raw.map(RawInstallation::into_installation).transpose()
  }

  async fn list_installations(
    &self,
    kind: Option<InstallationKind>,
  ) -> Result<Vec<Installation>> {
    let kind_str = kind.map(encode_installation_kind).map(str::to_owned);

    let raws: Vec<RawInstallation> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(k) = kind_str {
          let mut stmt = conn.prepare(&format!(
            "SELECT {INSTALLATION_COLUMNS} FROM installations WHERE kind = ?1"
          ))?;
          stmt
            .query_map(rusqlite::params![k], installation_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {INSTALLATION_COLUMNS} FROM installations"
          ))?;
          stmt
            .query_map([], installation_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawInstallation::into_installation)
      .collect()
  }

  async fn delete_installation(
    &self,
    id: Uuid,
  ) -> Result<(), DeleteError<Error>> {
    let id_str = encode_uuid(id);

    let check: DeleteCheck = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let assets: i64 = tx.query_row(
          "SELECT COUNT(*) FROM assets WHERE installation_id = ?1",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?;
        let events: i64 = tx.query_row(
          "SELECT COUNT(*) FROM replacement_events WHERE installation_id = ?1",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?;
        if assets > 0 || events > 0 {
          return Ok(DeleteCheck::Referenced);
        }

        let n = tx.execute(
          "DELETE FROM installations WHERE installation_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(if n == 0 { DeleteCheck::Missing } else { DeleteCheck::Deleted })
      })
      .await
      .map_err(|e| DeleteError::Storage(Error::Database(e)))?;

    match check {
      DeleteCheck::Deleted => Ok(()),
      DeleteCheck::Missing => Err(DeleteError::NotFound(id)),
      DeleteCheck::Referenced => Err(DeleteError::Referenced(id)),
    }
  }

  // ── Assets ────────────────────────────────────────────────────────────────

  async fn add_asset(&self, input: NewAsset) -> Result<Asset> {
    let asset = Asset {
      asset_id:        Uuid::new_v4(),
      installation_id: input.installation_id,
      detail:          input.detail,
      status:          parc_core::asset::AssetStatus::Active,
      created_at:      Utc::now(),
    };

    let id_str      = encode_uuid(asset.asset_id);
    let inst_id_str = encode_uuid(asset.installation_id);
    let detail_type = asset.detail.discriminant().to_owned();
    let detail_json = asset.detail.to_json()?.to_string();
    let status_str  = encode_status(asset.status).to_owned();
    let at_str      = encode_dt(asset.created_at);

    let installation_exists: bool = self
      .conn
      .call(move |conn| {
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM installations WHERE installation_id = ?1",
            rusqlite::params![inst_id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(false);
        }

        conn.execute(
          "INSERT INTO assets (
             asset_id, installation_id, detail_type, detail_json, status,
             created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            inst_id_str,
            detail_type,
            detail_json,
            status_str,
            at_str,
          ],
        )?;
        Ok(true)
      })
      .await?;

    if !installation_exists {
      return Err(Error::InstallationNotFound(asset.installation_id));
    }
    Ok(asset)
  }

  async fn get_asset(&self, id: Uuid) -> Result<Option<Asset>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawAsset> = self
      .conn
      .call(move |conn| Ok(read_asset(conn, &id_str).optional()?))
      .await?;

    raw.map(RawAsset::into_asset).transpose()
  }

  async fn list_assets(&self, installation_id: Uuid) -> Result<Vec<Asset>> {
    let inst_id_str = encode_uuid(installation_id);

    let raws: Vec<RawAsset> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ASSET_COLUMNS} FROM assets WHERE installation_id = ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![inst_id_str], asset_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAsset::into_asset).collect()
  }

  async fn delete_asset(&self, id: Uuid) -> Result<(), DeleteError<Error>> {
    let id_str = encode_uuid(id);

    let check: DeleteCheck = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let status: Option<String> = tx
          .query_row(
            "SELECT status FROM assets WHERE asset_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(status) = status else {
          return Ok(DeleteCheck::Missing);
        };

        let events: i64 = tx.query_row(
          "SELECT COUNT(*) FROM replacement_events
           WHERE predecessor_asset_id = ?1 OR successor_asset_id = ?1",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?;
        if status != "active" || events > 0 {
          return Ok(DeleteCheck::Referenced);
        }

        tx.execute(
          "DELETE FROM assets WHERE asset_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(DeleteCheck::Deleted)
      })
      .await
      .map_err(|e| DeleteError::Storage(Error::Database(e)))?;

    match check {
      DeleteCheck::Deleted => Ok(()),
      DeleteCheck::Missing => Err(DeleteError::NotFound(id)),
      DeleteCheck::Referenced => Err(DeleteError::Referenced(id)),
    }
  }

  // ── Ledger — append-only ──────────────────────────────────────────────────

  async fn append_event(
    &self,
    input: NewReplacementEvent,
  ) -> Result<ReplacementEvent> {
    let event_id    = Uuid::new_v4();
    let recorded_at = Utc::now();

    let event_id_str = encode_uuid(event_id);
    let at_str       = encode_dt(recorded_at);
    let inst_id_str  = encode_uuid(input.installation_id);
    let pred_id_str  = input.predecessor_asset_id.map(encode_uuid);
    let succ_id_str  = input.successor_asset_id.map(encode_uuid);
    let pred_pos     = input.predecessor_fields.as_ref().map(|p| p.position.clone());
    let pred_user    = input.predecessor_fields.as_ref().map(|p| p.user.clone());
    let succ_pos     = input.successor_fields.as_ref().map(|p| p.position.clone());
    let succ_user    = input.successor_fields.as_ref().map(|p| p.user.clone());
    let reason       = input.reason.clone();

    let seq: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO replacement_events (
             event_id, recorded_at, installation_id,
             predecessor_asset_id, successor_asset_id,
             predecessor_position, predecessor_user,
             successor_position, successor_user, reason
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            event_id_str,
            at_str,
            inst_id_str,
            pred_id_str,
            succ_id_str,
            pred_pos,
            pred_user,
            succ_pos,
            succ_user,
            reason,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(ReplacementEvent {
      event_id,
      seq,
      recorded_at,
      installation_id:      input.installation_id,
      predecessor_asset_id: input.predecessor_asset_id,
      successor_asset_id:   input.successor_asset_id,
      predecessor_fields:   input.predecessor_fields,
      successor_fields:     input.successor_fields,
      reason:               input.reason,
    })
  }

  async fn query_events(
    &self,
    filter: &LedgerFilter,
  ) -> Result<Vec<ReplacementEvent>> {
    let filter = filter.clone();

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let (where_clause, args): (&str, Vec<String>) = match &filter {
          LedgerFilter::ByInstallation(id) => {
            ("installation_id = ?1", vec![encode_uuid(*id)])
          }
          LedgerFilter::ByAsset(id) => (
            "predecessor_asset_id = ?1 OR successor_asset_id = ?1",
            vec![encode_uuid(*id)],
          ),
          LedgerFilter::ByPlacement(p) => (
            "(predecessor_position = ?1 AND predecessor_user = ?2)
             OR (successor_position = ?1 AND successor_user = ?2)",
            vec![p.position.clone(), p.user.clone()],
          ),
        };

        let sql = format!(
          "SELECT {EVENT_COLUMNS} FROM replacement_events
           WHERE {where_clause}
           ORDER BY recorded_at DESC, seq DESC"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(args), event_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  // ── Transactional writes ──────────────────────────────────────────────────

  async fn apply_replacement(
    &self,
    plan: ReplacementPlan,
  ) -> Result<ReplacementOutcome, ApplyError<Error>> {
    let predecessor_id = plan.predecessor_id;

    let pred_id_str = encode_uuid(plan.predecessor_id);
    let inst_id_str = encode_uuid(plan.installation_id);
    let expected_status = encode_status(plan.expected_status).to_owned();
    let expected_pos =
      plan.expected_placement.as_ref().map(|p| p.position.clone());
    let expected_user = plan.expected_placement.as_ref().map(|p| p.user.clone());
    let reason = plan.reason;

    let prepared = match plan.change {
      PlannedChange::NewUnit(spec) => {
        let detail = AssetDetail::EquipmentUnit(spec);
        let detail_json = detail
          .to_json()
          .map_err(|e| ApplyError::Storage(Error::Core(e)))?
          .to_string();
        PreparedChange::NewUnit {
          detail_type: detail.discriminant(),
          detail_json,
        }
      }
      PlannedChange::FieldMutation { successor } => {
        PreparedChange::FieldMutation {
          position: successor.position,
          user:     successor.user,
        }
      }
    };

    let raw: Option<RawApplied> = self
      .conn
      .call(move |conn| {
        let tx =
          conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Re-read the predecessor under the write lock. Any drift from what
        // the plan was built against means another replacement won the race.
        let status: Option<String> = tx
          .query_row(
            "SELECT status FROM assets WHERE asset_id = ?1",
            rusqlite::params![pred_id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(status) = status else { return Ok(None) };
        if status != expected_status {
          return Ok(None);
        }

        let (position, user): (Option<String>, Option<String>) = tx.query_row(
          "SELECT position, user FROM installations WHERE installation_id = ?1",
          rusqlite::params![inst_id_str],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        if position != expected_pos || user != expected_user {
          return Ok(None);
        }

        let now_str      = encode_dt(Utc::now());
        let event_id_str = encode_uuid(Uuid::new_v4());

        // 1. Successor representation.
        let (succ_id_str, pred_fields, succ_fields) = match &prepared {
          PreparedChange::NewUnit { detail_type, detail_json } => {
            let succ_id_str = encode_uuid(Uuid::new_v4());
            tx.execute(
              "INSERT INTO assets (
                 asset_id, installation_id, detail_type, detail_json,
                 status, created_at
               ) VALUES (?1, ?2, ?3, ?4, 'active', ?5)",
              rusqlite::params![
                succ_id_str,
                inst_id_str,
                detail_type,
                detail_json,
                now_str,
              ],
            )?;
            (succ_id_str, (None, None), (None, None))
          }
          PreparedChange::FieldMutation { position, user } => {
            tx.execute(
              "UPDATE installations SET position = ?1, user = ?2
               WHERE installation_id = ?3",
              rusqlite::params![position, user, inst_id_str],
            )?;
            (
              pred_id_str.clone(),
              (expected_pos.clone(), expected_user.clone()),
              (Some(position.clone()), Some(user.clone())),
            )
          }
        };

        // 2. Ledger entry.
        tx.execute(
          "INSERT INTO replacement_events (
             event_id, recorded_at, installation_id,
             predecessor_asset_id, successor_asset_id,
             predecessor_position, predecessor_user,
             successor_position, successor_user, reason
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            event_id_str,
            now_str,
            inst_id_str,
            pred_id_str,
            succ_id_str,
            pred_fields.0,
            pred_fields.1,
            succ_fields.0,
            succ_fields.1,
            reason,
          ],
        )?;
        let seq = tx.last_insert_rowid();

        // 3. Predecessor status.
        tx.execute(
          "UPDATE assets SET status = 'replaced' WHERE asset_id = ?1",
          rusqlite::params![pred_id_str],
        )?;

        // Refreshed views, read inside the same transaction.
        let event        = read_event_by_seq(&tx, seq)?;
        let installation = read_installation(&tx, &inst_id_str)?;
        let asset        = read_asset(&tx, &succ_id_str)?;
        let predecessor  = if succ_id_str != pred_id_str {
          Some(read_asset(&tx, &pred_id_str)?)
        } else {
          None
        };

        tx.commit()?;
        Ok(Some(RawApplied { event, installation, asset, predecessor }))
      })
      .await
      .map_err(|e| ApplyError::Storage(Error::Database(e)))?;

    let Some(raw) = raw else {
      return Err(ApplyError::Conflict { asset_id: predecessor_id });
    };

    Ok(ReplacementOutcome {
      event: raw.event.into_event().map_err(ApplyError::Storage)?,
      installation: raw
        .installation
        .into_installation()
        .map_err(ApplyError::Storage)?,
      asset: raw.asset.into_asset().map_err(ApplyError::Storage)?,
      predecessor: raw
        .predecessor
        .map(RawAsset::into_asset)
        .transpose()
        .map_err(ApplyError::Storage)?,
    })
  }

  async fn deactivate_asset(
    &self,
    asset_id: Uuid,
  ) -> Result<Asset, ApplyError<Error>> {
    let id_str = encode_uuid(asset_id);

    let raw: Option<RawAsset> = self
      .conn
      .call(move |conn| {
        let tx =
          conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM assets WHERE asset_id = ?1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(None);
        }

        tx.execute(
          "UPDATE assets SET status = 'inactive' WHERE asset_id = ?1",
          rusqlite::params![id_str],
        )?;
        let asset = read_asset(&tx, &id_str)?;
        tx.commit()?;
        Ok(Some(asset))
      })
      .await
      .map_err(|e| ApplyError::Storage(Error::Database(e)))?;

    let Some(raw) = raw else {
      return Err(ApplyError::Conflict { asset_id });
    };
    raw.into_asset().map_err(ApplyError::Storage)
  }
}
