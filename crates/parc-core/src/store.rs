//! The `AssetStore` trait and supporting error types.
//!
//! The trait is implemented by storage backends (e.g. `parc-store-sqlite`).
//! Higher layers (`parc-api`, the orchestrator and resolver in this crate)
//! depend on this abstraction, not on any concrete backend.

use std::future::Future;

use thiserror::Error;
use uuid::Uuid;

use crate::{
  asset::{Asset, NewAsset},
  installation::{Installation, InstallationKind, NewInstallation},
  ledger::{LedgerFilter, NewReplacementEvent, ReplacementEvent},
  replace::{ReplacementOutcome, ReplacementPlan},
};

// ─── Structured failures ─────────────────────────────────────────────────────

/// Failure of a transactional plan application.
///
/// `Conflict` means the in-transaction re-check observed state that differs
/// from what the plan was built against — another caller won the race. It is
/// kept apart from `Storage` so the orchestrator can surface it as a distinct
/// retryable error kind without inspecting backend error types.
#[derive(Debug, Error)]
pub enum ApplyError<E> {
  #[error("replacement conflict on asset {asset_id}")]
  Conflict { asset_id: Uuid },

  #[error("storage error: {0}")]
  Storage(#[source] E),
}

/// Failure of an entity deletion. Deletion of a referenced entity is an
/// explicit rejection, never a cascade or a silent orphaning.
#[derive(Debug, Error)]
pub enum DeleteError<E> {
  #[error("entity not found: {0}")]
  NotFound(Uuid),

  #[error("entity {0} is still referenced and cannot be deleted")]
  Referenced(Uuid),

  #[error("storage error: {0}")]
  Storage(#[source] E),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Parc storage backend.
///
/// The ledger methods are append-only. Multi-entity writes go through
/// [`AssetStore::apply_replacement`], which must execute the whole plan as a
/// single all-or-nothing transaction with an internal state re-check.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait AssetStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Installations ─────────────────────────────────────────────────────

  /// Create and persist a new installation. The surrogate identifier is
  /// assigned by the store.
  fn add_installation(
    &self,
    input: NewInstallation,
  ) -> impl Future<Output = Result<Installation, Self::Error>> + Send + '_;

  /// Retrieve an installation by identifier. Returns `None` if not found.
  fn get_installation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Installation>, Self::Error>> + Send + '_;

  /// List all installations, optionally filtered by kind.
  fn list_installations(
    &self,
    kind: Option<InstallationKind>,
  ) -> impl Future<Output = Result<Vec<Installation>, Self::Error>> + Send + '_;

  /// Delete an installation. Rejected with [`DeleteError::Referenced`] while
  /// it still owns assets or ledger events.
  fn delete_installation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), DeleteError<Self::Error>>> + Send + '_;

  // ── Assets ────────────────────────────────────────────────────────────

  /// Create and persist a new asset with `Active` status.
  fn add_asset(
    &self,
    input: NewAsset,
  ) -> impl Future<Output = Result<Asset, Self::Error>> + Send + '_;

  /// Retrieve an asset by identifier. Returns `None` if not found.
  fn get_asset(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Asset>, Self::Error>> + Send + '_;

  /// List all assets owned by an installation.
  fn list_assets(
    &self,
    installation_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Asset>, Self::Error>> + Send + '_;

  /// Delete an asset. Rejected while any ledger event references it or its
  /// status is no longer `Active`.
  fn delete_asset(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), DeleteError<Self::Error>>> + Send + '_;

  // ── Ledger — append-only ──────────────────────────────────────────────

  /// Append one event and return it as persisted. Never rejects on business
  /// grounds; validation happens upstream in the orchestrator. Also the
  /// entry point for importing legacy history recorded under the old
  /// placement-keyed identity scheme.
  fn append_event(
    &self,
    input: NewReplacementEvent,
  ) -> impl Future<Output = Result<ReplacementEvent, Self::Error>> + Send + '_;

  /// Query the ledger. Ordered newest-first by `recorded_at`, ties broken by
  /// insertion order; never reordered after the fact.
  fn query_events<'a>(
    &'a self,
    filter: &'a LedgerFilter,
  ) -> impl Future<Output = Result<Vec<ReplacementEvent>, Self::Error>> + Send + 'a;

  // ── Transactional writes ──────────────────────────────────────────────

  /// Apply a validated [`ReplacementPlan`] as one atomic unit: create or
  /// mutate the successor, append exactly one event, update statuses. The
  /// plan's expected status and placement are re-checked inside the
  /// transaction; a mismatch rolls back and returns [`ApplyError::Conflict`].
  fn apply_replacement(
    &self,
    plan: ReplacementPlan,
  ) -> impl Future<Output = Result<ReplacementOutcome, ApplyError<Self::Error>>> + Send + '_;

  /// Set an asset's status to `Inactive` and return the refreshed row.
  /// The kind guard (licenses only) lives in the orchestrator.
  fn deactivate_asset(
    &self,
    asset_id: Uuid,
  ) -> impl Future<Output = Result<Asset, ApplyError<Self::Error>>> + Send + '_;
}
