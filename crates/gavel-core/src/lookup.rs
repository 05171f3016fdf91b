//! The lookup read model: a subject's full history with each record labelled
//! active or expired.
//!
//! Derived entirely from an evaluation plus the full history; never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::strike::{StrikeRecord, SubjectKey};

/// Whether a record counts toward escalation as of the report time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrikeStatus {
  Active,
  Expired,
}

impl StrikeStatus {
  pub fn is_active(&self) -> bool { matches!(self, Self::Active) }
}

/// A record bundled with its status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedStrike {
  pub record: StrikeRecord,
  pub status: StrikeStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrikeReport {
  pub key:     SubjectKey,
  /// The reference time the active set was evaluated at.
  pub as_of:   DateTime<Utc>,
  /// Active strikes, newest first, exactly as the evaluator returned them.
  pub active:  Vec<StrikeRecord>,
  /// Every record on file, newest first.
  pub history: Vec<ResolvedStrike>,
}

impl StrikeReport {
  /// Label each record in `history` by membership in `active`.
  pub fn build(
    key: SubjectKey,
    as_of: DateTime<Utc>,
    active: Vec<StrikeRecord>,
    history: Vec<StrikeRecord>,
  ) -> Self {
    let history = history
      .into_iter()
      .map(|record| {
        let status = if active.iter().any(|a| a.record_id == record.record_id) {
          StrikeStatus::Active
        } else {
          StrikeStatus::Expired
        };
        ResolvedStrike { record, status }
      })
      .collect();

    Self { key, as_of, active, history }
  }

  pub fn active_count(&self) -> usize { self.active.len() }

  pub fn expired(&self) -> impl Iterator<Item = &StrikeRecord> {
    self
      .history
      .iter()
      .filter(|rs| !rs.status.is_active())
      .map(|rs| &rs.record)
  }
}
