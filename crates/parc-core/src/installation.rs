//! Installation — the deployment context that owns assets.
//!
//! Every installation carries a stable surrogate identifier regardless of
//! kind. The workstation/user pair that historically identified license
//! installations survives as [`Placement`]: display data, plus a
//! backward-compatibility lookup key for ledger history recorded before
//! stable identifiers existed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of deployment an installation represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallationKind {
  Equipment,
  License,
}

/// The mutable descriptive pair of a license installation: workstation name
/// plus username. Snapshotted into ledger events on every replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
  pub position: String,
  pub user:     String,
}

/// A named deployment context. Owns zero or more assets; deleting an
/// installation that still owns assets or ledger history is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
  pub installation_id: Uuid,
  pub name:            String,
  pub organization:    Option<String>,
  pub client:          String,
  pub site:            String,
  pub invoice_number:  String,
  pub invoice_date:    NaiveDate,
  pub kind:            InstallationKind,
  /// Present on license installations; optional otherwise.
  pub placement:       Option<Placement>,
  /// Server-assigned; never changes after creation.
  pub created_at:      DateTime<Utc>,
}

/// Input to [`crate::store::AssetStore::add_installation`].
/// The identifier and `created_at` are always set by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInstallation {
  pub name:           String,
  pub organization:   Option<String>,
  pub client:         String,
  pub site:           String,
  pub invoice_number: String,
  pub invoice_date:   NaiveDate,
  pub kind:           InstallationKind,
  pub placement:      Option<Placement>,
}
