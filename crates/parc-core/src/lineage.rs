//! Lineage resolution — reconstructing replacement history.
//!
//! Two lookup strategies are unioned: the stored foreign key, and equality of
//! recorded placement snapshots against the installation's *current*
//! placement. The value strategy recovers license history recorded before
//! installations had stable identifiers; a pure foreign-key join would lose
//! it after a rename. The cost is a known ambiguity: two installations that
//! ever shared a placement pair can pull in each other's events. Such
//! cross-installation matches are kept (matching the source system) but
//! logged, pending a product decision on placement uniqueness.

use std::collections::HashSet;

use uuid::Uuid;

use crate::{
  ledger::{LedgerFilter, ReplacementEvent},
  store::AssetStore,
};

/// Resolve the replacement history of an installation, newest first.
///
/// Never fails on missing history — an unknown installation or one without a
/// placement simply degrades to the foreign-key strategy, usually yielding
/// an empty result.
pub async fn installation_history<S: AssetStore>(
  store: &S,
  installation_id: Uuid,
) -> Result<Vec<ReplacementEvent>, S::Error> {
  let mut events = store
    .query_events(&LedgerFilter::ByInstallation(installation_id))
    .await?;

  if let Some(installation) = store.get_installation(installation_id).await? {
    if let Some(placement) = installation.placement {
      let matched = store
        .query_events(&LedgerFilter::ByPlacement(placement))
        .await?;
      merge(&mut events, matched, installation_id);
    }
  }

  sort_newest_first(&mut events);
  Ok(events)
}

/// Resolve the replacement history of a single asset, newest first.
///
/// Foreign-key matches on either event end, plus the value strategy through
/// the owning installation's current placement.
pub async fn asset_history<S: AssetStore>(
  store: &S,
  asset_id: Uuid,
) -> Result<Vec<ReplacementEvent>, S::Error> {
  let mut events = store.query_events(&LedgerFilter::ByAsset(asset_id)).await?;

  if let Some(asset) = store.get_asset(asset_id).await? {
    if let Some(installation) =
      store.get_installation(asset.installation_id).await?
    {
      if let Some(placement) = installation.placement {
        let matched = store
          .query_events(&LedgerFilter::ByPlacement(placement))
          .await?;
        merge(&mut events, matched, installation.installation_id);
      }
    }
  }

  sort_newest_first(&mut events);
  Ok(events)
}

/// Union `matched` into `events`, de-duplicating by event identifier.
/// An event can legitimately match both strategies; it must appear once.
fn merge(
  events: &mut Vec<ReplacementEvent>,
  matched: Vec<ReplacementEvent>,
  resolved_installation: Uuid,
) {
  let seen: HashSet<Uuid> = events.iter().map(|e| e.event_id).collect();
  for event in matched {
    if seen.contains(&event.event_id) {
      continue;
    }
    if event.installation_id != resolved_installation {
      tracing::warn!(
        event_id = %event.event_id,
        event_installation = %event.installation_id,
        resolved_installation = %resolved_installation,
        "placement match crossed installation boundaries; histories may be merged"
      );
    }
    events.push(event);
  }
}

fn sort_newest_first(events: &mut [ReplacementEvent]) {
  events
    .sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then(b.seq.cmp(&a.seq)));
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;

  fn event(seq: i64, at: i64) -> ReplacementEvent {
    ReplacementEvent {
      event_id:             Uuid::new_v4(),
      seq,
      recorded_at:          Utc.timestamp_opt(at, 0).unwrap(),
      installation_id:      Uuid::new_v4(),
      predecessor_asset_id: None,
      successor_asset_id:   None,
      predecessor_fields:   None,
      successor_fields:     None,
      reason:               None,
    }
  }

  #[test]
  fn sort_is_newest_first_with_seq_tiebreak() {
    let mut events = vec![event(1, 100), event(3, 200), event(2, 200)];
    sort_newest_first(&mut events);
    let seqs: Vec<i64> = events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![3, 2, 1]);
  }

  #[test]
  fn merge_deduplicates_by_event_id() {
    let shared = event(1, 100);
    let mut events = vec![shared.clone()];
    let extra = event(2, 200);
    merge(
      &mut events,
      vec![shared.clone(), extra.clone()],
      shared.installation_id,
    );
    assert_eq!(events.len(), 2);
    assert!(events.iter().any(|e| e.event_id == extra.event_id));
  }
}
