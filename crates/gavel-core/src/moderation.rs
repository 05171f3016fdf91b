//! The moderation workflow around the evaluator: issuing strikes, looking a
//! subject up and administrative deletion.
//!
//! Issuing a strike is insert-then-evaluate. Two moderators striking the same
//! subject at once could otherwise both evaluate before either insert lands
//! and each see one strike fewer than the combined total, missing a ban. Every
//! mutating operation therefore holds a per-subject lock for its whole
//! duration. Different subjects never contend.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  escalation::Escalation,
  evaluator::StrikeEvaluator,
  lookup::StrikeReport,
  policy::{ISSUE_LOOKAHEAD, LOOKUP_LOOKAHEAD, offset_forward},
  store::StrikeStore,
  strike::{StrikeRecord, StrikeRequest, SubjectKey},
};

// ─── Locks ───────────────────────────────────────────────────────────────────

/// One async mutex per subject, created on first use.
#[derive(Clone, Default)]
pub struct SubjectLocks {
  inner: Arc<DashMap<SubjectKey, Arc<Mutex<()>>>>,
}

impl SubjectLocks {
  pub fn new() -> Self { Self::default() }

  /// Wait for exclusive access to `key`.
  pub async fn lock(&self, key: SubjectKey) -> OwnedMutexGuard<()> {
    // The map guard is dropped at the end of this statement, before awaiting.
    let mutex = Arc::clone(&self.inner.entry(key).or_default());
    mutex.lock_owned().await
  }

  /// Drop the entry for `key` if nobody holds or awaits it.
  fn release(&self, key: SubjectKey, guard: OwnedMutexGuard<()>) {
    drop(guard);
    self
      .inner
      .remove_if(&key, |_, mutex| Arc::strong_count(mutex) == 1);
  }

  /// Number of subjects with a live lock entry.
  pub fn len(&self) -> usize { self.inner.len() }

  pub fn is_empty(&self) -> bool { self.inner.is_empty() }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Result of issuing a strike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrikeOutcome {
  /// The units written for this strike, oldest first.
  pub records:    Vec<StrikeRecord>,
  /// Active strikes after the insert, newest first.
  pub active:     Vec<StrikeRecord>,
  pub escalation: Escalation,
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// Entry point for the moderation-command layer.
///
/// Cloning is cheap; clones share the store and the lock table.
pub struct ModerationService<S> {
  store: Arc<S>,
  locks: SubjectLocks,
}

impl<S> Clone for ModerationService<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), locks: self.locks.clone() }
  }
}

impl<S: StrikeStore> ModerationService<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store, locks: SubjectLocks::new() }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn locks(&self) -> &SubjectLocks { &self.locks }

  /// Record a strike issued at `issued_at` and decide whether it escalates.
  ///
  /// Any store failure aborts with an error and no decision. The units of a
  /// strike are written together, so a failed strike leaves none on file.
  pub async fn issue_strike(
    &self,
    request: StrikeRequest,
    issued_at: DateTime<Utc>,
  ) -> Result<StrikeOutcome> {
    let key = request.key;
    let guard = self.locks.lock(key).await;
    let outcome = self.issue_locked(&request, issued_at).await;
    self.locks.release(key, guard);

    match &outcome {
      Ok(o) if o.escalation == Escalation::Ban => warn!(
        %key, moderator_id = request.moderator_id, active = o.active.len(),
        "strike reached ban threshold"
      ),
      Ok(o) => info!(
        %key, moderator_id = request.moderator_id, severity = request.severity.units(),
        active = o.active.len(), escalation = ?o.escalation, "strike issued"
      ),
      Err(e) => error!(%key, error = %e, "strike aborted; no enforcement decided"),
    }
    outcome
  }

  async fn issue_locked(
    &self,
    request: &StrikeRequest,
    issued_at: DateTime<Utc>,
  ) -> Result<StrikeOutcome> {
    let units = request.expand(issued_at)?;
    let newest = units.last().map_or(issued_at, |u| u.issued_at);

    let records = self.store.insert_many(units).await.map_err(Error::store)?;

    let evaluate_at = offset_forward(newest, ISSUE_LOOKAHEAD)?;
    let active = StrikeEvaluator::new(self.store.as_ref())
      .evaluate(request.key, evaluate_at)
      .await?;
    let escalation = Escalation::decide(active.len(), request.severity);

    Ok(StrikeOutcome { records, active, escalation })
  }

  /// The subject's active strikes as of `at`.
  pub async fn active_strikes(
    &self,
    key: SubjectKey,
    at: DateTime<Utc>,
  ) -> Result<Vec<StrikeRecord>> {
    StrikeEvaluator::new(self.store.as_ref()).evaluate(key, at).await
  }

  /// Active and expired strikes for display, evaluated slightly ahead of
  /// `now`.
  pub async fn lookup(&self, key: SubjectKey, now: DateTime<Utc>) -> Result<StrikeReport> {
    let as_of = offset_forward(now, LOOKUP_LOOKAHEAD)?;
    let active = self.active_strikes(key, as_of).await?;
    let history = self.store.find_all(key).await.map_err(Error::store)?;
    Ok(StrikeReport::build(key, as_of, active, history))
  }

  pub async fn get_strike(&self, record_id: Uuid) -> Result<StrikeRecord> {
    self
      .store
      .get(record_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::StrikeNotFound(record_id))
  }

  /// Administrative removal of a single strike unit.
  pub async fn delete_strike(&self, record_id: Uuid) -> Result<StrikeRecord> {
    let record = self.get_strike(record_id).await?;

    let guard = self.locks.lock(record.key).await;
    let deleted = self.store.delete(record_id).await.map_err(Error::store);
    self.locks.release(record.key, guard);

    if !deleted? {
      return Err(Error::StrikeNotFound(record_id));
    }
    info!(key = %record.key, %record_id, "strike deleted");
    Ok(record)
  }
}
