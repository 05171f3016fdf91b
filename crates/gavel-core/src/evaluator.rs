//! The strike decay evaluator.
//!
//! Walks a subject's history backwards from a reference time. The newest
//! strike inside the two-month window is active; the walk then restarts from
//! that strike's own timestamp, so each strike issued while an earlier one was
//! still live keeps the chain alive. The walk stops at the ban threshold or at
//! the first empty window.
//!
//! When the walk stops short, one decayed strike from the four-month grace
//! lookback may be revived, provided something is still active as of the
//! reference time. At most one strike is ever revived this way.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
  Error, Result,
  policy::{ESCALATION_THRESHOLD, StrikeWindow},
  store::StrikeStore,
  strike::{StrikeRecord, SubjectKey},
};

/// Read-only decision logic layered over a [`StrikeStore`].
///
/// Holds no state of its own; concurrent evaluations for different subjects
/// never interfere.
pub struct StrikeEvaluator<'s, S> {
  store: &'s S,
}

impl<'s, S: StrikeStore> StrikeEvaluator<'s, S> {
  pub fn new(store: &'s S) -> Self { Self { store } }

  /// The subject's strikes that count toward escalation as of
  /// `reference_time`, newest first. Never longer than
  /// [`ESCALATION_THRESHOLD`].
  ///
  /// Store failures propagate as [`Error::StoreUnavailable`]; a store that
  /// contradicts itself yields [`Error::InconsistentRecordState`]. Neither is
  /// ever read as "no active strikes".
  pub async fn evaluate(
    &self,
    key: SubjectKey,
    reference_time: DateTime<Utc>,
  ) -> Result<Vec<StrikeRecord>> {
    let mut active = Vec::with_capacity(ESCALATION_THRESHOLD);
    let mut cursor = reference_time;

    while active.len() < ESCALATION_THRESHOLD {
      let window = StrikeWindow::active_before(cursor)?;
      let count = self.count(key, window).await?;
      debug!(%key, start = %window.start, end = %window.end, count, "active window");

      if count == 0 {
        if !active.is_empty()
          && let Some(revived) = self.revive(key, reference_time, window).await?
        {
          active.push(revived);
        }
        break;
      }

      let latest = self.latest(key, window).await?.ok_or_else(|| {
        Error::InconsistentRecordState {
          key,
          detail: format!(
            "{count} records counted in [{}, {}) but none returned",
            window.start, window.end
          ),
        }
      })?;

      cursor = latest.issued_at;
      active.push(latest);
    }

    debug!(%key, %reference_time, active = active.len(), "evaluated active strikes");
    Ok(active)
  }

  /// The grace step. `exhausted` is the empty active window the walk ended
  /// on; its start bounds the lookback from above. Only called once something
  /// is active as of the reference time, which is the successor a decayed
  /// strike needs to count again.
  async fn revive(
    &self,
    key: SubjectKey,
    reference_time: DateTime<Utc>,
    exhausted: StrikeWindow,
  ) -> Result<Option<StrikeRecord>> {
    let grace = StrikeWindow::grace_before(reference_time, exhausted.start)?;
    if grace.is_empty() {
      return Ok(None);
    }

    let revived = self.latest(key, grace).await?;
    if let Some(record) = &revived {
      debug!(%key, record_id = %record.record_id, issued_at = %record.issued_at, "revived decayed strike");
    }
    Ok(revived)
  }

  async fn count(&self, key: SubjectKey, window: StrikeWindow) -> Result<u64> {
    self
      .store
      .count_in_range(key, window)
      .await
      .map_err(Error::store)
  }

  /// `find_latest_in_range`, rejecting any record outside the window asked
  /// for. Each step of the walk must move strictly backwards in time.
  async fn latest(
    &self,
    key: SubjectKey,
    window: StrikeWindow,
  ) -> Result<Option<StrikeRecord>> {
    let found = self
      .store
      .find_latest_in_range(key, window)
      .await
      .map_err(Error::store)?;

    match found {
      Some(record) if record.key != key || !window.contains(record.issued_at) => {
        Err(Error::InconsistentRecordState {
          key,
          detail: format!(
            "record {} issued at {} returned for [{}, {})",
            record.record_id, record.issued_at, window.start, window.end
          ),
        })
      }
      other => Ok(other),
    }
  }
}

/// Convenience wrapper around [`StrikeEvaluator::evaluate`].
pub async fn evaluate_active_strikes<S: StrikeStore>(
  store: &S,
  key: SubjectKey,
  reference_time: DateTime<Utc>,
) -> Result<Vec<StrikeRecord>> {
  StrikeEvaluator::new(store).evaluate(key, reference_time).await
}
