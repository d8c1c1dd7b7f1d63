//! Handlers for `/assets` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/assets` | Body: [`NewAsset`]; returns 201 |
//! | `GET`    | `/assets/:id` | 404 if not found |
//! | `DELETE` | `/assets/:id` | 409 once replaced, deactivated, or referenced |
//! | `GET`    | `/assets/:id/history` | Resolved lineage, newest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use parc_core::{
  asset::{Asset, NewAsset},
  ledger::ReplacementEvent,
  lineage,
  store::AssetStore,
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /assets` — body: [`NewAsset`]; returns 201 + the stored asset.
/// 404 when the named installation does not exist.
pub async fn create<S: AssetStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewAsset>,
) -> Result<impl IntoResponse, ApiError> {
  store
    .get_installation(body.installation_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| {
      ApiError::NotFound(format!(
        "installation {} not found",
        body.installation_id
      ))
    })?;

  let asset = store
    .add_asset(body)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(asset)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /assets/:id`
pub async fn get_one<S: AssetStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Asset>, ApiError> {
  let asset = store
    .get_asset(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("asset {id} not found")))?;
  Ok(Json(asset))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /assets/:id` — 409 while the ledger references the asset.
pub async fn delete_one<S: AssetStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  store.delete_asset(id).await.map_err(ApiError::from_delete)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /assets/:id/history`
pub async fn history<S: AssetStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReplacementEvent>>, ApiError> {
  let events = lineage::asset_history(store.as_ref(), id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(events))
}
