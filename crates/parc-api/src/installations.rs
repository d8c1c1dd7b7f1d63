//! Handlers for `/installations` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/installations` | Optional `?kind=equipment\|license` |
//! | `POST`   | `/installations` | Body: [`NewInstallation`]; returns 201 |
//! | `GET`    | `/installations/:id` | 404 if not found |
//! | `DELETE` | `/installations/:id` | 409 while assets or events reference it |
//! | `GET`    | `/installations/:id/assets` | All owned assets, any status |
//! | `GET`    | `/installations/:id/history` | Resolved lineage, newest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use parc_core::{
  asset::Asset,
  installation::{Installation, InstallationKind, NewInstallation},
  ledger::ReplacementEvent,
  lineage,
  store::AssetStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub kind: Option<InstallationKind>,
}

/// `GET /installations[?kind=<kind>]`
pub async fn list<S: AssetStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Installation>>, ApiError> {
  let installations = store
    .list_installations(params.kind)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(installations))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /installations` — body: [`NewInstallation`]; returns 201.
pub async fn create<S: AssetStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewInstallation>,
) -> Result<impl IntoResponse, ApiError> {
  let installation = store
    .add_installation(body)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(installation)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /installations/:id`
pub async fn get_one<S: AssetStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Installation>, ApiError> {
  let installation = store
    .get_installation(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("installation {id} not found")))?;
  Ok(Json(installation))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /installations/:id` — 409 while still referenced.
pub async fn delete_one<S: AssetStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  store
    .delete_installation(id)
    .await
    .map_err(ApiError::from_delete)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Owned assets ─────────────────────────────────────────────────────────────

/// `GET /installations/:id/assets`
pub async fn assets<S: AssetStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Asset>>, ApiError> {
  let assets = store
    .list_assets(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(assets))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /installations/:id/history` — union of identifier-linked and
/// placement-matched events, newest first.
pub async fn history<S: AssetStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReplacementEvent>>, ApiError> {
  let events = lineage::installation_history(store.as_ref(), id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(events))
}
