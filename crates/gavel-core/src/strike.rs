//! Strike types: the unit of moderation penalty.
//!
//! A strike record is an immutable fact about a subject at a point in time.
//! Records are never updated; a higher-severity strike is written as several
//! single-unit records so the decay logic only ever reasons about units.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, policy::offset_forward};

// ─── Subject ─────────────────────────────────────────────────────────────────

/// The struck user, scoped to the group (guild/server) they were struck in.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SubjectKey {
  pub group_id:   u64,
  pub subject_id: u64,
}

impl SubjectKey {
  pub fn new(group_id: u64, subject_id: u64) -> Self {
    Self { group_id, subject_id }
  }
}

impl fmt::Display for SubjectKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.group_id, self.subject_id)
  }
}

// ─── Severity ────────────────────────────────────────────────────────────────

/// How heavy a single strike invocation is. A level-N strike is recorded as N
/// single-unit records issued one second apart.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Severity {
  One,
  Two,
  Three,
}

impl Severity {
  /// Number of single-unit records this severity expands into.
  pub fn units(self) -> u8 {
    match self {
      Self::One => 1,
      Self::Two => 2,
      Self::Three => 3,
    }
  }

  /// A level-2 strike carries its own mute, so reaching the mute threshold
  /// through it does not prompt a second one.
  pub fn is_self_muting(self) -> bool { matches!(self, Self::Two) }
}

impl TryFrom<u8> for Severity {
  type Error = Error;

  fn try_from(level: u8) -> Result<Self> {
    match level {
      1 => Ok(Self::One),
      2 => Ok(Self::Two),
      3 => Ok(Self::Three),
      other => Err(Error::InvalidSeverity(other)),
    }
  }
}

impl From<Severity> for u8 {
  fn from(severity: Severity) -> Self { severity.units() }
}

// ─── StrikeRecord ────────────────────────────────────────────────────────────

/// A persisted strike unit. Once written, no field is ever updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrikeRecord {
  /// Store-assigned identifier.
  pub record_id:      Uuid,
  #[serde(flatten)]
  pub key:            SubjectKey,
  /// The decay clock runs off this field.
  pub issued_at:      DateTime<Utc>,
  pub moderator_id:   u64,
  /// Link to the offending message or report, if any.
  pub reference_link: Option<String>,
  pub reason:         String,
}

// ─── NewStrike ───────────────────────────────────────────────────────────────

/// Input to [`crate::store::StrikeStore::insert`]. `record_id` is always
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStrike {
  pub key:            SubjectKey,
  pub issued_at:      DateTime<Utc>,
  pub moderator_id:   u64,
  pub reference_link: Option<String>,
  pub reason:         String,
}

// ─── StrikeRequest ───────────────────────────────────────────────────────────

/// A moderator's request to strike a subject, as received from the command
/// layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrikeRequest {
  #[serde(flatten)]
  pub key:            SubjectKey,
  pub severity:       Severity,
  pub moderator_id:   u64,
  #[serde(default)]
  pub reference_link: Option<String>,
  pub reason:         String,
}

impl StrikeRequest {
  /// Expand into one [`NewStrike`] per severity unit, the first at
  /// `issued_at` and each following one a whole second later so the units
  /// keep a strict order.
  pub fn expand(&self, issued_at: DateTime<Utc>) -> Result<Vec<NewStrike>> {
    (0..self.severity.units())
      .map(|offset| {
        Ok(NewStrike {
          key:            self.key,
          issued_at:      offset_forward(issued_at, Duration::seconds(i64::from(offset)))?,
          moderator_id:   self.moderator_id,
          reference_link: self.reference_link.clone(),
          reason:         self.reason.clone(),
        })
      })
      .collect()
  }
}
