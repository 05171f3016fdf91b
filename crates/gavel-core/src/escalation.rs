//! Escalation decisions taken after a strike is recorded.

use serde::{Deserialize, Serialize};

use crate::{
  policy::{ESCALATION_THRESHOLD, MUTE_THRESHOLD},
  strike::Severity,
};

/// What the enforcement collaborator should do once a strike is recorded.
/// Mute and ban are mutually exclusive; ban wins when both thresholds are met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Escalation {
  None,
  /// Prompt the moderator for a mute duration, then mute.
  Mute,
  /// Prompt the moderator for a message deletion window, then ban.
  Ban,
}

impl Escalation {
  /// Decide from the number of active strikes after the new strike, and the
  /// severity of the strike that was just issued.
  pub fn decide(active: usize, severity: Severity) -> Self {
    if active >= ESCALATION_THRESHOLD {
      Self::Ban
    } else if active == MUTE_THRESHOLD && !severity.is_self_muting() {
      Self::Mute
    } else {
      Self::None
    }
  }
}
