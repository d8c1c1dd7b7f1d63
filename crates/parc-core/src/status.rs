//! The status state machine.
//!
//! A pure transition function over `(kind, status, operation)`. The
//! orchestrator uses it as a guard before mutating anything, and the SQLite
//! backend re-derives the same check inside its transaction.
//!
//! License path:
//!
//! ```text
//! ACTIVE --REPLACE--> REPLACED --REPLACE--> REPLACED (repeatable)
//! ACTIVE --DEACTIVATE--> INACTIVE (terminal)
//! REPLACED --DEACTIVATE--> INACTIVE (terminal)
//! INACTIVE --REPLACE--> rejected
//! ```
//!
//! Equipment path: `ACTIVE --REPLACE--> REPLACED`, nothing else. A replaced
//! unit is not the live unit any more, so replacing it again is rejected.

use thiserror::Error;

use crate::asset::{AssetKind, AssetStatus};

/// The operations the state machine arbitrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Replace,
  Deactivate,
}

/// A rejected transition. Each variant maps to a distinct caller-facing
/// error kind in [`crate::replace::ReplaceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
  #[error("asset is in a terminal state and cannot be replaced")]
  Terminal,

  #[error("a replaced equipment unit is not the live unit; replace its successor instead")]
  StalePredecessor,

  #[error("deactivation applies to license seats only")]
  UnsupportedForKind,
}

/// Compute the next status for `op`, or reject it. Pure; no side effects.
pub fn transition(
  kind: AssetKind,
  status: AssetStatus,
  op: Operation,
) -> Result<AssetStatus, TransitionError> {
  match (kind, status, op) {
    (_, AssetStatus::Inactive, Operation::Replace) => {
      Err(TransitionError::Terminal)
    }
    (AssetKind::License, _, Operation::Replace) => Ok(AssetStatus::Replaced),
    (AssetKind::Equipment, AssetStatus::Active, Operation::Replace) => {
      Ok(AssetStatus::Replaced)
    }
    (AssetKind::Equipment, AssetStatus::Replaced, Operation::Replace) => {
      Err(TransitionError::StalePredecessor)
    }
    // Deactivation is terminal from any status, but only for licenses.
    (AssetKind::License, _, Operation::Deactivate) => Ok(AssetStatus::Inactive),
    (AssetKind::Equipment, _, Operation::Deactivate) => {
      Err(TransitionError::UnsupportedForKind)
    }
  }
}
