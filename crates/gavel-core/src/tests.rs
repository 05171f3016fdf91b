//! Evaluator and moderation-service tests against an in-memory store.

use std::sync::{
  Arc, Mutex,
  atomic::{AtomicU8, Ordering},
};

use chrono::{DateTime, Duration, Months, TimeZone as _, Utc};
use uuid::Uuid;

use crate::{
  ESCALATION_THRESHOLD, Error, evaluate_active_strikes,
  escalation::Escalation,
  moderation::ModerationService,
  policy::StrikeWindow,
  store::StrikeStore,
  strike::{NewStrike, Severity, StrikeRecord, StrikeRequest, SubjectKey},
};

// ─── Fixture store ───────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("memory store offline")]
struct Offline;

const OFFLINE: u8 = 1;
const LATEST_MISSING: u8 = 2;
const LATEST_STALE: u8 = 3;
const FAIL_SECOND_UNIT: u8 = 4;

/// Healthy by default; `fault` switches on one failure mode at a time.
#[derive(Default)]
struct MemoryStore {
  records: Mutex<Vec<StrikeRecord>>,
  fault:   AtomicU8,
}

impl MemoryStore {
  fn fail_with(&self, fault: u8) { self.fault.store(fault, Ordering::SeqCst); }

  fn check(&self) -> Result<(), Offline> {
    match self.fault.load(Ordering::SeqCst) {
      OFFLINE => Err(Offline),
      _ => Ok(()),
    }
  }

  fn matching(&self, key: SubjectKey, window: StrikeWindow) -> Vec<StrikeRecord> {
    self
      .records
      .lock()
      .unwrap()
      .iter()
      .filter(|r| r.key == key && window.contains(r.issued_at))
      .cloned()
      .collect()
  }
}

fn assign_id(strike: NewStrike) -> StrikeRecord {
  StrikeRecord {
    record_id:      Uuid::new_v4(),
    key:            strike.key,
    issued_at:      strike.issued_at,
    moderator_id:   strike.moderator_id,
    reference_link: strike.reference_link,
    reason:         strike.reason,
  }
}

impl StrikeStore for MemoryStore {
  type Error = Offline;

  async fn insert(&self, strike: NewStrike) -> Result<StrikeRecord, Offline> {
    // Give concurrent callers a chance to interleave.
    tokio::task::yield_now().await;
    self.check()?;
    let record = assign_id(strike);
    self.records.lock().unwrap().push(record.clone());
    Ok(record)
  }

  async fn insert_many(&self, strikes: Vec<NewStrike>) -> Result<Vec<StrikeRecord>, Offline> {
    tokio::task::yield_now().await;
    self.check()?;
    let mut staged = Vec::with_capacity(strikes.len());
    for (i, strike) in strikes.into_iter().enumerate() {
      if i == 1 && self.fault.load(Ordering::SeqCst) == FAIL_SECOND_UNIT {
        return Err(Offline);
      }
      staged.push(assign_id(strike));
    }
    self.records.lock().unwrap().extend(staged.iter().cloned());
    Ok(staged)
  }

  async fn delete(&self, record_id: Uuid) -> Result<bool, Offline> {
    self.check()?;
    let mut records = self.records.lock().unwrap();
    let before = records.len();
    records.retain(|r| r.record_id != record_id);
    Ok(records.len() != before)
  }

  async fn count_in_range(
    &self,
    key: SubjectKey,
    window: StrikeWindow,
  ) -> Result<u64, Offline> {
    tokio::task::yield_now().await;
    self.check()?;
    Ok(self.matching(key, window).len() as u64)
  }

  async fn find_latest_in_range(
    &self,
    key: SubjectKey,
    window: StrikeWindow,
  ) -> Result<Option<StrikeRecord>, Offline> {
    self.check()?;
    match self.fault.load(Ordering::SeqCst) {
      LATEST_MISSING => Ok(None),
      LATEST_STALE => Ok(self
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.key == key)
        .max_by_key(|r| r.issued_at)
        .map(|r| StrikeRecord { issued_at: window.end, ..r.clone() })),
      _ => Ok(
        self
          .matching(key, window)
          .into_iter()
          .max_by_key(|r| r.issued_at),
      ),
    }
  }

  async fn find_all(&self, key: SubjectKey) -> Result<Vec<StrikeRecord>, Offline> {
    self.check()?;
    let mut all: Vec<_> = self
      .records
      .lock()
      .unwrap()
      .iter()
      .filter(|r| r.key == key)
      .cloned()
      .collect();
    all.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
    Ok(all)
  }

  async fn get(&self, record_id: Uuid) -> Result<Option<StrikeRecord>, Offline> {
    self.check()?;
    Ok(
      self
        .records
        .lock()
        .unwrap()
        .iter()
        .find(|r| r.record_id == record_id)
        .cloned(),
    )
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

const KEY: SubjectKey = SubjectKey { group_id: 10, subject_id: 42 };

fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap() }

fn months_ago(t: DateTime<Utc>, n: u32) -> DateTime<Utc> {
  t.checked_sub_months(Months::new(n)).unwrap()
}

async fn strike_at(store: &MemoryStore, key: SubjectKey, at: DateTime<Utc>) -> StrikeRecord {
  store
    .insert(NewStrike {
      key,
      issued_at: at,
      moderator_id: 7,
      reference_link: None,
      reason: "spam".into(),
    })
    .await
    .unwrap()
}

fn ids(records: &[StrikeRecord]) -> Vec<Uuid> {
  records.iter().map(|r| r.record_id).collect()
}

fn request(key: SubjectKey, severity: Severity) -> StrikeRequest {
  StrikeRequest {
    key,
    severity,
    moderator_id: 7,
    reference_link: Some("https://chat.example/msg/1".into()),
    reason: "harassment".into(),
  }
}

// ─── Evaluator ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn no_strikes_is_empty() {
  let store = MemoryStore::default();
  for at in [t0(), months_ago(t0(), 7), t0() + Duration::days(400)] {
    let active = evaluate_active_strikes(&store, KEY, at).await.unwrap();
    assert!(active.is_empty());
  }
}

#[tokio::test]
async fn single_recent_strike_is_active() {
  let store = MemoryStore::default();
  let a = strike_at(&store, KEY, t0()).await;

  let active = evaluate_active_strikes(&store, KEY, t0() + Duration::days(1))
    .await
    .unwrap();
  assert_eq!(active, vec![a]);
}

#[tokio::test]
async fn single_strike_past_grace_is_inactive() {
  let store = MemoryStore::default();
  strike_at(&store, KEY, t0()).await;

  let at = t0().checked_add_months(Months::new(5)).unwrap();
  let active = evaluate_active_strikes(&store, KEY, at).await.unwrap();
  assert!(active.is_empty());
}

#[tokio::test]
async fn lone_decayed_strike_is_not_revived() {
  let store = MemoryStore::default();
  strike_at(&store, KEY, months_ago(t0(), 3)).await;

  let active = evaluate_active_strikes(&store, KEY, t0()).await.unwrap();
  assert!(active.is_empty());
}

#[tokio::test]
async fn decayed_strike_with_recent_successor_counts() {
  let store = MemoryStore::default();
  let a = strike_at(&store, KEY, months_ago(t0(), 3)).await;
  let b = strike_at(&store, KEY, t0() - Duration::weeks(3)).await;

  let active = evaluate_active_strikes(&store, KEY, t0()).await.unwrap();
  assert_eq!(ids(&active), vec![b.record_id, a.record_id]);
}

#[tokio::test]
async fn chain_reaching_past_grace_revives_nothing() {
  let store = MemoryStore::default();
  // The walk ends on [2024-01-09, 2024-03-09), which already starts before
  // the grace lookback at 2024-02-15, so there is nothing left to revive.
  let newer = strike_at(&store, KEY, t0() - Duration::weeks(7)).await;
  let older = strike_at(&store, KEY, t0() - Duration::weeks(14)).await;
  strike_at(&store, KEY, Utc.with_ymd_and_hms(2023, 12, 1, 12, 0, 0).unwrap()).await;

  let active = evaluate_active_strikes(&store, KEY, t0()).await.unwrap();
  assert_eq!(ids(&active), vec![newer.record_id, older.record_id]);
}

#[tokio::test]
async fn successor_inside_window_chains_directly() {
  let store = MemoryStore::default();
  let a = strike_at(&store, KEY, months_ago(t0(), 3)).await;
  let b = strike_at(&store, KEY, months_ago(t0(), 1)).await;

  let active = evaluate_active_strikes(&store, KEY, t0()).await.unwrap();
  assert_eq!(ids(&active), vec![b.record_id, a.record_id]);
}

#[tokio::test]
async fn three_chained_strikes_reach_threshold() {
  let store = MemoryStore::default();
  let c = strike_at(&store, KEY, t0() - Duration::weeks(6)).await;
  let b = strike_at(&store, KEY, t0() - Duration::weeks(3)).await;
  let a = strike_at(&store, KEY, t0()).await;

  let active = evaluate_active_strikes(&store, KEY, t0() + Duration::hours(1))
    .await
    .unwrap();
  assert_eq!(active.len(), ESCALATION_THRESHOLD);
  assert_eq!(ids(&active), vec![a.record_id, b.record_id, c.record_id]);
}

#[tokio::test]
async fn walk_stops_at_threshold() {
  let store = MemoryStore::default();
  for weeks in [12, 9, 6, 3, 0] {
    strike_at(&store, KEY, t0() - Duration::weeks(weeks)).await;
  }

  let active = evaluate_active_strikes(&store, KEY, t0() + Duration::hours(1))
    .await
    .unwrap();
  assert_eq!(active.len(), ESCALATION_THRESHOLD);
  assert_eq!(active[2].issued_at, t0() - Duration::weeks(6));
}

#[tokio::test]
async fn gap_breaks_the_chain() {
  let store = MemoryStore::default();
  strike_at(&store, KEY, months_ago(t0(), 5)).await;
  let b = strike_at(&store, KEY, t0() - Duration::weeks(1)).await;

  let active = evaluate_active_strikes(&store, KEY, t0()).await.unwrap();
  assert_eq!(ids(&active), vec![b.record_id]);
}

#[tokio::test]
async fn grace_revives_at_most_one_strike() {
  let store = MemoryStore::default();
  strike_at(&store, KEY, months_ago(t0(), 3) - Duration::weeks(2)).await;
  let a = strike_at(&store, KEY, months_ago(t0(), 3)).await;
  let b = strike_at(&store, KEY, t0() - Duration::weeks(1)).await;

  let active = evaluate_active_strikes(&store, KEY, t0()).await.unwrap();
  assert_eq!(ids(&active), vec![b.record_id, a.record_id]);
}

#[tokio::test]
async fn evaluation_is_repeatable() {
  let store = MemoryStore::default();
  strike_at(&store, KEY, months_ago(t0(), 3)).await;
  strike_at(&store, KEY, t0() - Duration::weeks(3)).await;
  strike_at(&store, KEY, t0() - Duration::days(1)).await;

  let first = evaluate_active_strikes(&store, KEY, t0()).await.unwrap();
  let second = evaluate_active_strikes(&store, KEY, t0()).await.unwrap();
  assert_eq!(first, second);
}

#[tokio::test]
async fn window_lower_bound_is_inclusive() {
  let store = MemoryStore::default();
  let edge = strike_at(&store, KEY, months_ago(t0(), 2)).await;

  let active = evaluate_active_strikes(&store, KEY, t0()).await.unwrap();
  assert_eq!(active, vec![edge]);

  let later = t0() + Duration::seconds(1);
  assert!(evaluate_active_strikes(&store, KEY, later).await.unwrap().is_empty());
}

#[tokio::test]
async fn window_upper_bound_is_exclusive() {
  let store = MemoryStore::default();
  let now = strike_at(&store, KEY, t0()).await;

  assert!(evaluate_active_strikes(&store, KEY, t0()).await.unwrap().is_empty());
  let active = evaluate_active_strikes(&store, KEY, t0() + Duration::seconds(1))
    .await
    .unwrap();
  assert_eq!(active, vec![now]);
}

#[tokio::test]
async fn other_subjects_do_not_count() {
  let store = MemoryStore::default();
  let other_user = SubjectKey::new(KEY.group_id, 99);
  let other_group = SubjectKey::new(11, KEY.subject_id);
  strike_at(&store, other_user, t0() - Duration::days(1)).await;
  strike_at(&store, other_group, t0() - Duration::days(2)).await;
  let mine = strike_at(&store, KEY, t0() - Duration::days(3)).await;

  let active = evaluate_active_strikes(&store, KEY, t0()).await.unwrap();
  assert_eq!(active, vec![mine]);
}

#[tokio::test]
async fn store_outage_propagates() {
  let store = MemoryStore::default();
  strike_at(&store, KEY, t0() - Duration::days(1)).await;
  store.fail_with(OFFLINE);

  let err = evaluate_active_strikes(&store, KEY, t0()).await.unwrap_err();
  assert!(matches!(err, Error::StoreUnavailable(_)));
  assert!(err.is_store_failure());
}

#[tokio::test]
async fn missing_latest_is_inconsistent() {
  let store = MemoryStore::default();
  strike_at(&store, KEY, t0() - Duration::days(1)).await;
  store.fail_with(LATEST_MISSING);

  let err = evaluate_active_strikes(&store, KEY, t0()).await.unwrap_err();
  assert!(matches!(err, Error::InconsistentRecordState { key, .. } if key == KEY));
}

#[tokio::test]
async fn latest_outside_window_is_inconsistent() {
  let store = MemoryStore::default();
  strike_at(&store, KEY, t0() - Duration::days(1)).await;
  store.fail_with(LATEST_STALE);

  let err = evaluate_active_strikes(&store, KEY, t0()).await.unwrap_err();
  assert!(matches!(err, Error::InconsistentRecordState { .. }));
}

// ─── Strike requests and escalation ──────────────────────────────────────────

#[test]
fn severity_bounds() {
  assert_eq!(Severity::try_from(2).unwrap(), Severity::Two);
  assert!(matches!(Severity::try_from(0), Err(Error::InvalidSeverity(0))));
  assert!(matches!(Severity::try_from(4), Err(Error::InvalidSeverity(4))));
}

#[test]
fn severity_expands_one_second_apart() {
  let units = request(KEY, Severity::Three).expand(t0()).unwrap();
  let times: Vec<_> = units.iter().map(|u| u.issued_at).collect();
  assert_eq!(times, vec![t0(), t0() + Duration::seconds(1), t0() + Duration::seconds(2)]);
  assert!(units.iter().all(|u| u.key == KEY && u.reason == "harassment"));
}

#[test]
fn expansion_past_representable_time_fails() {
  let last = DateTime::<Utc>::MAX_UTC;
  assert!(matches!(
    request(KEY, Severity::Three).expand(last),
    Err(Error::TimeOutOfRange)
  ));
  assert_eq!(request(KEY, Severity::One).expand(last).unwrap()[0].issued_at, last);
}

#[test]
fn escalation_rules() {
  assert_eq!(Escalation::decide(0, Severity::One), Escalation::None);
  assert_eq!(Escalation::decide(1, Severity::One), Escalation::None);
  assert_eq!(Escalation::decide(2, Severity::One), Escalation::Mute);
  assert_eq!(Escalation::decide(2, Severity::Two), Escalation::None);
  assert_eq!(Escalation::decide(3, Severity::One), Escalation::Ban);
  assert_eq!(Escalation::decide(3, Severity::Two), Escalation::Ban);
}

#[test]
fn strike_request_json_shape() {
  let json = serde_json::json!({
    "group_id": 10, "subject_id": 42, "severity": 2,
    "moderator_id": 7, "reason": "spam"
  });
  let req: StrikeRequest = serde_json::from_value(json).unwrap();
  assert_eq!(req.key, KEY);
  assert_eq!(req.severity, Severity::Two);
  assert!(req.reference_link.is_none());

  let bad = serde_json::json!({
    "group_id": 10, "subject_id": 42, "severity": 5,
    "moderator_id": 7, "reason": "spam"
  });
  assert!(serde_json::from_value::<StrikeRequest>(bad).is_err());
}

// ─── Moderation service ──────────────────────────────────────────────────────

fn service() -> ModerationService<MemoryStore> {
  ModerationService::new(Arc::new(MemoryStore::default()))
}

#[tokio::test]
async fn level_three_strike_bans_immediately() {
  let svc = service();
  let outcome = svc.issue_strike(request(KEY, Severity::Three), t0()).await.unwrap();

  assert_eq!(outcome.records.len(), 3);
  assert_eq!(outcome.active.len(), 3);
  assert_eq!(outcome.escalation, Escalation::Ban);
  assert_eq!(outcome.records[2].issued_at - outcome.records[0].issued_at, Duration::seconds(2));
}

#[tokio::test]
async fn second_level_one_strike_mutes() {
  let svc = service();
  let first = svc.issue_strike(request(KEY, Severity::One), t0()).await.unwrap();
  assert_eq!(first.escalation, Escalation::None);

  let second = svc
    .issue_strike(request(KEY, Severity::One), t0() + Duration::days(10))
    .await
    .unwrap();
  assert_eq!(second.active.len(), 2);
  assert_eq!(second.escalation, Escalation::Mute);
}

#[tokio::test]
async fn level_two_strike_does_not_prompt_second_mute() {
  let svc = service();
  let outcome = svc.issue_strike(request(KEY, Severity::Two), t0()).await.unwrap();
  assert_eq!(outcome.active.len(), 2);
  assert_eq!(outcome.escalation, Escalation::None);

  let next = svc
    .issue_strike(request(KEY, Severity::One), t0() + Duration::days(1))
    .await
    .unwrap();
  assert_eq!(next.escalation, Escalation::Ban);
}

#[tokio::test]
async fn decayed_history_does_not_escalate() {
  let svc = service();
  svc.issue_strike(request(KEY, Severity::One), months_ago(t0(), 6)).await.unwrap();
  svc.issue_strike(request(KEY, Severity::One), months_ago(t0(), 5)).await.unwrap();

  let outcome = svc.issue_strike(request(KEY, Severity::One), t0()).await.unwrap();
  assert_eq!(outcome.active.len(), 1);
  assert_eq!(outcome.escalation, Escalation::None);
}

#[tokio::test]
async fn concurrent_strikes_on_one_subject_are_serialised() {
  let svc = service();
  svc.issue_strike(request(KEY, Severity::One), t0() - Duration::days(3)).await.unwrap();

  let (a, b) = tokio::join!(
    svc.issue_strike(request(KEY, Severity::One), t0()),
    svc.issue_strike(request(KEY, Severity::One), t0() + Duration::seconds(1)),
  );
  let mut escalations = vec![a.unwrap().escalation, b.unwrap().escalation];
  escalations.sort_by_key(|e| *e as u8);
  assert_eq!(escalations, vec![Escalation::Mute, Escalation::Ban]);
  assert!(svc.locks().is_empty());
}

#[tokio::test]
async fn failed_insert_decides_nothing() {
  let svc = service();
  svc.store().fail_with(OFFLINE);

  let err = svc.issue_strike(request(KEY, Severity::Three), t0()).await.unwrap_err();
  assert!(err.is_store_failure());
  assert!(svc.locks().is_empty());
}

#[tokio::test]
async fn failed_multi_unit_strike_leaves_nothing_on_file() {
  let svc = service();
  svc.store().fail_with(FAIL_SECOND_UNIT);

  let err = svc.issue_strike(request(KEY, Severity::Three), t0()).await.unwrap_err();
  assert!(err.is_store_failure());
  assert!(svc.store().find_all(KEY).await.unwrap().is_empty());

  // A retry is judged on its own units only.
  svc.store().fail_with(0);
  let retry = svc.issue_strike(request(KEY, Severity::One), t0()).await.unwrap();
  assert_eq!(retry.active.len(), 1);
  assert_eq!(retry.escalation, Escalation::None);
}

#[tokio::test]
async fn strike_at_end_of_time_is_rejected_before_insert() {
  let svc = service();
  let err = svc
    .issue_strike(request(KEY, Severity::Two), DateTime::<Utc>::MAX_UTC)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::TimeOutOfRange));
  assert!(svc.store().find_all(KEY).await.unwrap().is_empty());
}

#[tokio::test]
async fn different_subjects_do_not_contend() {
  let svc = service();
  let other = SubjectKey::new(KEY.group_id, KEY.subject_id + 1);
  let held = svc.locks().lock(KEY).await;

  let outcome = tokio::time::timeout(
    std::time::Duration::from_secs(5),
    svc.issue_strike(request(other, Severity::One), t0()),
  )
  .await
  .expect("strike on another subject waited for a held lock")
  .unwrap();
  assert_eq!(outcome.active.len(), 1);

  let blocked = tokio::time::timeout(
    std::time::Duration::from_millis(50),
    svc.issue_strike(request(KEY, Severity::One), t0()),
  )
  .await;
  assert!(blocked.is_err());
  assert!(svc.store().find_all(KEY).await.unwrap().is_empty());

  drop(held);
  let outcome = svc.issue_strike(request(KEY, Severity::One), t0()).await.unwrap();
  assert_eq!(outcome.active.len(), 1);
}

#[tokio::test]
async fn lookup_labels_expired_strikes() {
  let svc = service();
  let store = Arc::clone(svc.store());
  let old = strike_at(&store, KEY, months_ago(t0(), 8)).await;
  let recent = strike_at(&store, KEY, t0() - Duration::days(5)).await;

  let report = svc.lookup(KEY, t0()).await.unwrap();
  assert_eq!(report.as_of, t0() + Duration::minutes(2));
  assert_eq!(report.active_count(), 1);
  assert_eq!(ids(&report.active), vec![recent.record_id]);
  assert_eq!(report.history.len(), 2);
  assert_eq!(report.history[0].record.record_id, recent.record_id);
  assert!(report.history[0].status.is_active());
  assert_eq!(report.expired().map(|r| r.record_id).collect::<Vec<_>>(), vec![old.record_id]);
}

#[tokio::test]
async fn lookup_includes_strike_issued_just_now() {
  let svc = service();
  let store = Arc::clone(svc.store());
  strike_at(&store, KEY, t0() + Duration::seconds(30)).await;

  let report = svc.lookup(KEY, t0()).await.unwrap();
  assert_eq!(report.active_count(), 1);
}

#[tokio::test]
async fn delete_strike_removes_it() {
  let svc = service();
  let outcome = svc.issue_strike(request(KEY, Severity::Two), t0()).await.unwrap();
  let victim = outcome.records[0].record_id;

  let deleted = svc.delete_strike(victim).await.unwrap();
  assert_eq!(deleted.record_id, victim);

  let report = svc.lookup(KEY, t0()).await.unwrap();
  assert_eq!(report.history.len(), 1);
  assert!(matches!(
    svc.delete_strike(victim).await,
    Err(Error::StrikeNotFound(id)) if id == victim
  ));
}
