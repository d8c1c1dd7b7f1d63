//! Handlers for replacement, deactivation, and the raw ledger.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/assets/:id/replace` | Body: [`ReplaceBody`] |
//! | `POST` | `/assets/:id/deactivate` | Licenses only; idempotent |
//! | `GET`  | `/ledger` | Exactly one filter: `installation_id`, `asset_id`, or `position`+`user` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use parc_core::{
  asset::{Asset, EquipmentSpec},
  installation::Placement,
  ledger::{LedgerFilter, ReplacementEvent},
  replace,
  replace::{AssetChange, ChangeRequest, PlacementChange, ReplacementOutcome},
  store::AssetStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Replace ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /assets/:id/replace`.
///
/// With `successor_unit` set, the request is an equipment replacement; the
/// flag/value pairs describe a license placement change otherwise. The
/// orchestrator rejects whichever form does not match the asset's kind.
#[derive(Debug, Deserialize)]
pub struct ReplaceBody {
  #[serde(default)]
  pub change_position: bool,
  #[serde(default)]
  pub change_user:     bool,
  pub new_position:    Option<String>,
  pub new_user:        Option<String>,
  pub successor_unit:  Option<EquipmentSpec>,
  pub reason:          Option<String>,
}

impl From<ReplaceBody> for ChangeRequest {
  fn from(b: ReplaceBody) -> Self {
    let change = match b.successor_unit {
      Some(spec) => AssetChange::NewUnit(spec),
      None => AssetChange::FieldMutation(PlacementChange {
        change_position: b.change_position,
        change_user:     b.change_user,
        new_position:    b.new_position,
        new_user:        b.new_user,
      }),
    };
    ChangeRequest { change, reason: b.reason }
  }
}

/// `POST /assets/:id/replace` — returns the full [`ReplacementOutcome`].
pub async fn replace_one<S: AssetStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ReplaceBody>,
) -> Result<Json<ReplacementOutcome>, ApiError> {
  let outcome = replace::replace(store.as_ref(), id, ChangeRequest::from(body))
    .await
    .map_err(ApiError::from_replace)?;
  Ok(Json(outcome))
}

// ─── Deactivate ───────────────────────────────────────────────────────────────

/// `POST /assets/:id/deactivate` — returns the refreshed asset.
pub async fn deactivate_one<S: AssetStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Asset>, ApiError> {
  let asset = replace::deactivate(store.as_ref(), id)
    .await
    .map_err(ApiError::from_replace)?;
  Ok(Json(asset))
}

// ─── Ledger ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LedgerParams {
  pub installation_id: Option<Uuid>,
  pub asset_id:        Option<Uuid>,
  pub position:        Option<String>,
  pub user:            Option<String>,
}

impl LedgerParams {
  fn into_filter(self) -> Result<LedgerFilter, ApiError> {
    match (self.installation_id, self.asset_id, self.position, self.user) {
      (Some(id), None, None, None) => Ok(LedgerFilter::ByInstallation(id)),
      (None, Some(id), None, None) => Ok(LedgerFilter::ByAsset(id)),
      (None, None, Some(position), Some(user)) => {
        Ok(LedgerFilter::ByPlacement(Placement { position, user }))
      }
      _ => Err(ApiError::InvalidRequest(
        "provide exactly one of installation_id, asset_id, or position+user"
          .to_owned(),
      )),
    }
  }
}

/// `GET /ledger?installation_id=...` — raw ledger query, newest first.
pub async fn ledger<S: AssetStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<LedgerParams>,
) -> Result<Json<Vec<ReplacementEvent>>, ApiError> {
  let filter = params.into_filter()?;
  let events = store
    .query_events(&filter)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(events))
}
