//! The replacement orchestrator.
//!
//! Validates a change request against the status state machine, captures the
//! before/after placement snapshots, and hands the store a fully-built
//! [`ReplacementPlan`] to apply as a single transaction. The two historical
//! code paths — new row per equipment replacement, in-place mutation per
//! license replacement — are unified under [`AssetChange`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  asset::{Asset, AssetKind, AssetStatus, EquipmentSpec},
  installation::{Installation, Placement},
  ledger::ReplacementEvent,
  status::{self, Operation, TransitionError},
  store::{ApplyError, AssetStore},
};

// ─── Change request ──────────────────────────────────────────────────────────

/// Which descriptive fields of a license placement change, and to what.
/// A flag without a corresponding non-empty value is invalid; no flag at all
/// is a no-op request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacementChange {
  #[serde(default)]
  pub change_position: bool,
  #[serde(default)]
  pub change_user:     bool,
  pub new_position:    Option<String>,
  pub new_user:        Option<String>,
}

/// Malformed or empty change requests, detected before any storage call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChangeRequestError {
  #[error("no field changes requested")]
  NoOp,

  #[error("{0} must be provided and non-empty when its change flag is set")]
  EmptyValue(&'static str),
}

impl PlacementChange {
  /// Compute the successor placement, or reject the request.
  pub fn apply(&self, current: &Placement) -> Result<Placement, ChangeRequestError> {
    if !self.change_position && !self.change_user {
      return Err(ChangeRequestError::NoOp);
    }

    let mut next = current.clone();
    if self.change_position {
      match self.new_position.as_deref() {
        Some(p) if !p.trim().is_empty() => next.position = p.to_owned(),
        _ => return Err(ChangeRequestError::EmptyValue("new_position")),
      }
    }
    if self.change_user {
      match self.new_user.as_deref() {
        Some(u) if !u.trim().is_empty() => next.user = u.to_owned(),
        _ => return Err(ChangeRequestError::EmptyValue("new_user")),
      }
    }
    Ok(next)
  }
}

/// The unified successor representation: a brand-new equipment unit, or an
/// in-place mutation of the license placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum AssetChange {
  NewUnit(EquipmentSpec),
  FieldMutation(PlacementChange),
}

/// Caller input to [`replace`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequest {
  pub change: AssetChange,
  pub reason: Option<String>,
}

// ─── Plan and outcome ────────────────────────────────────────────────────────

/// The side-effect half of a validated replacement, applied by the store as
/// one transaction. `expected_status` and `expected_placement` are what the
/// orchestrator observed; the store re-checks them inside the transaction so
/// that two concurrent replacements of the same asset cannot both win.
#[derive(Debug, Clone)]
pub struct ReplacementPlan {
  pub installation_id:    Uuid,
  pub predecessor_id:     Uuid,
  pub expected_status:    AssetStatus,
  pub expected_placement: Option<Placement>,
  pub change:             PlannedChange,
  pub reason:             Option<String>,
}

#[derive(Debug, Clone)]
pub enum PlannedChange {
  /// Insert the successor unit (`Active`) and mark the predecessor
  /// `Replaced`. The event links both units by identifier.
  NewUnit(EquipmentSpec),
  /// Rewrite the installation placement and mark the seat `Replaced`. The
  /// event snapshots the placement before and after.
  FieldMutation { successor: Placement },
}

/// Everything a replacement produced, read back inside the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplacementOutcome {
  pub event:        ReplacementEvent,
  pub installation: Installation,
  /// The live asset after the replacement: the new unit on the equipment
  /// path, the mutated seat on the license path.
  pub asset:        Asset,
  /// The superseded unit (equipment path only).
  pub predecessor:  Option<Asset>,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Rejections and failures of [`replace`] and [`deactivate`]. The first five
/// are deterministic given the input; `ConflictingReplacement` and
/// `StorageUnavailable` are safe to retry with backoff.
#[derive(Debug, Error)]
pub enum ReplaceError<E> {
  #[error("asset not found: {0}")]
  NotFound(Uuid),

  #[error("asset {asset_id} is {status:?} and permits no further replacement")]
  TerminalStateViolation { asset_id: Uuid, status: AssetStatus },

  #[error("no field changes requested")]
  NoOpRequest,

  #[error("invalid change request: {0}")]
  InvalidChangeRequest(String),

  #[error("conflicting replacement on asset {0}")]
  ConflictingReplacement(Uuid),

  #[error("storage unavailable: {0}")]
  StorageUnavailable(#[source] E),
}

impl<E> ReplaceError<E> {
  fn from_transition(err: TransitionError, asset: &Asset) -> Self {
    match err {
      TransitionError::Terminal => Self::TerminalStateViolation {
        asset_id: asset.asset_id,
        status:   asset.status,
      },
      // A stale equipment predecessor is exactly what the loser of a
      // replacement race observes.
      TransitionError::StalePredecessor => {
        Self::ConflictingReplacement(asset.asset_id)
      }
      TransitionError::UnsupportedForKind => {
        Self::InvalidChangeRequest(err.to_string())
      }
    }
  }

  fn from_apply(err: ApplyError<E>) -> Self {
    match err {
      ApplyError::Conflict { asset_id } => Self::ConflictingReplacement(asset_id),
      ApplyError::Storage(e) => Self::StorageUnavailable(e),
    }
  }
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Replace an asset.
///
/// Preconditions are checked in order, each with a distinct error kind:
/// existence, state-machine admissibility, at least one requested change,
/// non-empty values for every flagged change. Only then is the plan handed to
/// the store for atomic application.
pub async fn replace<S: AssetStore>(
  store: &S,
  asset_id: Uuid,
  request: ChangeRequest,
) -> Result<ReplacementOutcome, ReplaceError<S::Error>> {
  let asset = store
    .get_asset(asset_id)
    .await
    .map_err(ReplaceError::StorageUnavailable)?
    .ok_or(ReplaceError::NotFound(asset_id))?;

  let installation = store
    .get_installation(asset.installation_id)
    .await
    .map_err(ReplaceError::StorageUnavailable)?
    .ok_or(ReplaceError::NotFound(asset.installation_id))?;

  status::transition(asset.kind(), asset.status, Operation::Replace)
    .map_err(|e| ReplaceError::from_transition(e, &asset))?;

  let change = plan_change(&asset, &installation, request.change)?;

  let plan = ReplacementPlan {
    installation_id:    installation.installation_id,
    predecessor_id:     asset.asset_id,
    expected_status:    asset.status,
    expected_placement: installation.placement.clone(),
    change,
    reason:             request.reason,
  };

  tracing::debug!(
    asset_id = %asset.asset_id,
    installation_id = %installation.installation_id,
    "applying replacement plan"
  );

  store
    .apply_replacement(plan)
    .await
    .map_err(ReplaceError::from_apply)
}

/// Deactivate a license seat — terminal, and idempotent on an already
/// inactive seat.
pub async fn deactivate<S: AssetStore>(
  store: &S,
  asset_id: Uuid,
) -> Result<Asset, ReplaceError<S::Error>> {
  let asset = store
    .get_asset(asset_id)
    .await
    .map_err(ReplaceError::StorageUnavailable)?
    .ok_or(ReplaceError::NotFound(asset_id))?;

  status::transition(asset.kind(), asset.status, Operation::Deactivate)
    .map_err(|e| ReplaceError::from_transition(e, &asset))?;

  store
    .deactivate_asset(asset_id)
    .await
    .map_err(ReplaceError::from_apply)
}

/// Match the requested change against the asset kind and validate it.
fn plan_change<E>(
  asset: &Asset,
  installation: &Installation,
  change: AssetChange,
) -> Result<PlannedChange, ReplaceError<E>> {
  match (asset.kind(), change) {
    (AssetKind::Equipment, AssetChange::NewUnit(spec)) => {
      validate_unit_spec(&spec)?;
      Ok(PlannedChange::NewUnit(spec))
    }
    (AssetKind::License, AssetChange::FieldMutation(pc)) => {
      let current = installation.placement.as_ref().ok_or_else(|| {
        ReplaceError::InvalidChangeRequest(
          "license installation has no placement to change".to_owned(),
        )
      })?;
      let successor = pc.apply(current).map_err(|e| match e {
        ChangeRequestError::NoOp => ReplaceError::NoOpRequest,
        other => ReplaceError::InvalidChangeRequest(other.to_string()),
      })?;
      Ok(PlannedChange::FieldMutation { successor })
    }
    (AssetKind::Equipment, AssetChange::FieldMutation(_)) => {
      Err(ReplaceError::InvalidChangeRequest(
        "equipment is replaced with a new unit, not a field change".to_owned(),
      ))
    }
    (AssetKind::License, AssetChange::NewUnit(_)) => {
      Err(ReplaceError::InvalidChangeRequest(
        "a license seat is replaced in place, not with a new unit".to_owned(),
      ))
    }
  }
}

fn validate_unit_spec<E>(spec: &EquipmentSpec) -> Result<(), ReplaceError<E>> {
  for (field, value) in [
    ("brand", &spec.brand),
    ("model", &spec.model),
    ("serial_number", &spec.serial_number),
  ] {
    if value.trim().is_empty() {
      return Err(ReplaceError::InvalidChangeRequest(format!(
        "{field} of the successor unit must be non-empty"
      )));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn placement(position: &str, user: &str) -> Placement {
    Placement {
      position: position.to_owned(),
      user:     user.to_owned(),
    }
  }

  #[test]
  fn placement_change_applies_flagged_fields_only() {
    let current = placement("PC-01", "alice");
    let change = PlacementChange {
      change_position: true,
      new_position: Some("PC-02".to_owned()),
      ..Default::default()
    };
    assert_eq!(change.apply(&current).unwrap(), placement("PC-02", "alice"));
  }

  #[test]
  fn placement_change_without_flags_is_a_noop_request() {
    let change = PlacementChange {
      new_position: Some("PC-02".to_owned()),
      ..Default::default()
    };
    assert_eq!(
      change.apply(&placement("PC-01", "alice")),
      Err(ChangeRequestError::NoOp)
    );
  }

  #[test]
  fn placement_change_rejects_missing_or_blank_values() {
    let missing = PlacementChange { change_user: true, ..Default::default() };
    assert_eq!(
      missing.apply(&placement("PC-01", "alice")),
      Err(ChangeRequestError::EmptyValue("new_user"))
    );

    let blank = PlacementChange {
      change_position: true,
      new_position: Some("   ".to_owned()),
      ..Default::default()
    };
    assert_eq!(
      blank.apply(&placement("PC-01", "alice")),
      Err(ChangeRequestError::EmptyValue("new_position"))
    );
  }

  #[test]
  fn placement_change_can_rewrite_both_fields() {
    let change = PlacementChange {
      change_position: true,
      change_user:     true,
      new_position:    Some("PC-09".to_owned()),
      new_user:        Some("bob".to_owned()),
    };
    assert_eq!(
      change.apply(&placement("PC-01", "alice")).unwrap(),
      placement("PC-09", "bob")
    );
  }
}
