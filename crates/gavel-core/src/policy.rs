//! Decay policy constants and the calendar arithmetic behind them.
//!
//! Windows are calendar-relative: two months before 31 March is 31 January,
//! two months before 30 April is 28 (or 29) February. Lengths therefore vary
//! with the months spanned.

use chrono::{DateTime, Duration, Months, Utc};

use crate::{Error, Result};

/// A strike with no chaining successor stops counting after this long.
pub const ACTIVE_WINDOW: Months = Months::new(2);

/// Lookback used to find a decayed strike that a later one may revive.
pub const GRACE_WINDOW: Months = Months::new(4);

/// Active strike count that prompts a mute.
pub const MUTE_THRESHOLD: usize = 2;

/// Active strike count that triggers a ban.
pub const ESCALATION_THRESHOLD: usize = 3;

/// How far past the newest inserted unit a post-strike evaluation looks, so
/// the just-written records are included despite read lag.
pub const ISSUE_LOOKAHEAD: Duration = Duration::seconds(5);

/// Forward offset applied to lookups to avoid flicker at window edges.
pub const LOOKUP_LOOKAHEAD: Duration = Duration::minutes(2);

/// `t` minus `months` calendar months.
pub fn months_before(t: DateTime<Utc>, months: Months) -> Result<DateTime<Utc>> {
  t.checked_sub_months(months).ok_or(Error::TimeOutOfRange)
}

/// `t` plus a fixed offset, failing instead of panicking at the edges of the
/// representable range.
pub fn offset_forward(t: DateTime<Utc>, by: Duration) -> Result<DateTime<Utc>> {
  t.checked_add_signed(by).ok_or(Error::TimeOutOfRange)
}

// ─── Window ──────────────────────────────────────────────────────────────────

/// A half-open time range `[start, end)` over `issued_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrikeWindow {
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>,
}

impl StrikeWindow {
  pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
    Self { start, end }
  }

  /// The active-decay window ending (exclusively) at `end`.
  pub fn active_before(end: DateTime<Utc>) -> Result<Self> {
    Ok(Self::new(months_before(end, ACTIVE_WINDOW)?, end))
  }

  /// The grace lookback starting four months before `anchor` and ending
  /// (exclusively) at `end`.
  pub fn grace_before(anchor: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
    Ok(Self::new(months_before(anchor, GRACE_WINDOW)?, end))
  }

  pub fn contains(&self, t: DateTime<Utc>) -> bool {
    self.start <= t && t < self.end
  }

  pub fn is_empty(&self) -> bool { self.start >= self.end }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
  }

  #[test]
  fn months_before_keeps_day_of_month() {
    assert_eq!(months_before(at(2024, 5, 15), ACTIVE_WINDOW).unwrap(), at(2024, 3, 15));
    assert_eq!(months_before(at(2024, 2, 10), GRACE_WINDOW).unwrap(), at(2023, 10, 10));
  }

  #[test]
  fn months_before_clamps_to_short_month() {
    assert_eq!(months_before(at(2024, 4, 30), ACTIVE_WINDOW).unwrap(), at(2024, 2, 29));
    assert_eq!(months_before(at(2023, 4, 30), ACTIVE_WINDOW).unwrap(), at(2023, 2, 28));
  }

  #[test]
  fn window_is_half_open() {
    let w = StrikeWindow::active_before(at(2024, 5, 15)).unwrap();
    assert!(w.contains(at(2024, 3, 15)));
    assert!(!w.contains(at(2024, 5, 15)));
    assert!(!w.contains(at(2024, 3, 14)));
  }

  #[test]
  fn months_before_reports_overflow() {
    assert!(matches!(
      months_before(DateTime::<Utc>::MIN_UTC, ACTIVE_WINDOW),
      Err(Error::TimeOutOfRange)
    ));
  }
}
