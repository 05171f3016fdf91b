//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings in UTC with
//! microsecond precision (`2024-06-15T12:00:00.000000Z`), so SQL string
//! comparison orders them chronologically. Ids are stored as decimal strings;
//! UUIDs as hyphenated lowercase strings.

use chrono::{DateTime, Datelike as _, Duration, SecondsFormat, SubsecRound as _, Utc};
use gavel_core::strike::{StrikeRecord, SubjectKey};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Ids ──────────────────────────────────────────────────────────────────────

pub fn encode_id(id: u64) -> String { id.to_string() }

pub fn decode_id(s: &str) -> Result<u64> {
  s.parse().map_err(|_| Error::IdParse(s.to_owned()))
}

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

/// Drop precision the column cannot hold.
pub fn to_storage_precision(dt: DateTime<Utc>) -> DateTime<Utc> {
  dt.trunc_subsecs(6)
}

pub fn encode_dt(dt: DateTime<Utc>) -> Result<String> {
  // Four-digit years keep the string fixed-width.
  if !(0..=9999).contains(&dt.year()) {
    return Err(Error::DateRange(dt));
  }
  Ok(dt.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Lower bound at or below every storable timestamp.
const FLOOR_BOUND: &str = "0000-01-01T00:00:00.000000Z";

/// Upper bound above every storable timestamp: the largest one is a strict
/// prefix of it.
const CEILING_BOUND: &str = "9999-12-31T23:59:59.999999Z~";

/// Encode a range bound, rounding sub-microsecond remainders up. A stored
/// timestamp `r` satisfies `bound <= r` exactly when it satisfies
/// `encode_bound(bound) <= r`, and likewise for `<`.
///
/// Bounds outside the storable years clamp to [`FLOOR_BOUND`] or
/// [`CEILING_BOUND`], so a query never fails on its window alone.
pub fn encode_bound(dt: DateTime<Utc>) -> String {
  let floor = to_storage_precision(dt);
  let rounded = if floor == dt {
    Some(dt)
  } else {
    floor.checked_add_signed(Duration::microseconds(1))
  };
  let Some(bound) = rounded else {
    return CEILING_BOUND.to_owned();
  };
  match bound.year() {
    ..0 => FLOOR_BOUND.to_owned(),
    10000.. => CEILING_BOUND.to_owned(),
    _ => bound.to_rfc3339_opts(SecondsFormat::Micros, true),
  }
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const INSERT_STRIKE: &str = "INSERT INTO strikes (
     record_id, group_id, subject_id, issued_at,
     moderator_id, reference_link, reason
   ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

/// Column values for one `strikes` row, encoded and ready to bind.
pub struct EncodedStrike {
  record_id:      String,
  group_id:       String,
  subject_id:     String,
  issued_at:      String,
  moderator_id:   String,
  reference_link: Option<String>,
  reason:         String,
}

impl EncodedStrike {
  pub fn from_record(record: &StrikeRecord) -> Result<Self> {
    Ok(Self {
      record_id:      encode_uuid(record.record_id),
      group_id:       encode_id(record.key.group_id),
      subject_id:     encode_id(record.key.subject_id),
      issued_at:      encode_dt(record.issued_at)?,
      moderator_id:   encode_id(record.moderator_id),
      reference_link: record.reference_link.clone(),
      reason:         record.reason.clone(),
    })
  }

  pub fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(
      INSERT_STRIKE,
      rusqlite::params![
        self.record_id,
        self.group_id,
        self.subject_id,
        self.issued_at,
        self.moderator_id,
        self.reference_link,
        self.reason,
      ],
    )?;
    Ok(())
  }
}

/// Column list matching the field order of [`RawStrike`].
pub const STRIKE_COLUMNS: &str =
  "record_id, group_id, subject_id, issued_at, moderator_id, reference_link, reason";

/// Raw strings read directly from a `strikes` row.
pub struct RawStrike {
  pub record_id:      String,
  pub group_id:       String,
  pub subject_id:     String,
  pub issued_at:      String,
  pub moderator_id:   String,
  pub reference_link: Option<String>,
  pub reason:         String,
}

impl RawStrike {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:      row.get(0)?,
      group_id:       row.get(1)?,
      subject_id:     row.get(2)?,
      issued_at:      row.get(3)?,
      moderator_id:   row.get(4)?,
      reference_link: row.get(5)?,
      reason:         row.get(6)?,
    })
  }

  pub fn into_record(self) -> Result<StrikeRecord> {
    Ok(StrikeRecord {
      record_id:      decode_uuid(&self.record_id)?,
      key:            SubjectKey {
        group_id:   decode_id(&self.group_id)?,
        subject_id: decode_id(&self.subject_id)?,
      },
      issued_at:      decode_dt(&self.issued_at)?,
      moderator_id:   decode_id(&self.moderator_id)?,
      reference_link: self.reference_link,
      reason:         self.reason,
    })
  }
}
