//! Error type for `parc-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] parc_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// An `installations.kind` column holding neither known discriminant.
  #[error("unknown installation kind: {0:?}")]
  UnknownKind(String),

  /// Attempted to add an asset to a missing installation.
  #[error("installation not found: {0}")]
  InstallationNotFound(uuid::Uuid),

  /// A placement pair with exactly one of its two columns set.
  #[error("placement columns are inconsistent on row {0}")]
  InconsistentPlacement(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
