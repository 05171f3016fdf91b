//! [`SqliteStore`], the SQLite implementation of [`StrikeStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use gavel_core::{
  policy::StrikeWindow,
  store::StrikeStore,
  strike::{NewStrike, StrikeRecord, SubjectKey},
};

use crate::{
  Result,
  encode::{
    EncodedStrike, RawStrike, STRIKE_COLUMNS, encode_bound, encode_id, encode_uuid,
    to_storage_precision,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A strike record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Encoded `(group_id, subject_id, start, end)` parameters for a window query.
type WindowParams = (String, String, String, String);

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by the tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("strike schema initialised");
    Ok(())
  }

  fn window_params(key: SubjectKey, window: StrikeWindow) -> WindowParams {
    (
      encode_id(key.group_id),
      encode_id(key.subject_id),
      encode_bound(window.start),
      encode_bound(window.end),
    )
  }
}

/// Give a new strike its record id and storage precision.
fn assign_id(strike: NewStrike) -> StrikeRecord {
  StrikeRecord {
    record_id:      Uuid::new_v4(),
    key:            strike.key,
    issued_at:      to_storage_precision(strike.issued_at),
    moderator_id:   strike.moderator_id,
    reference_link: strike.reference_link,
    reason:         strike.reason,
  }
}

// ─── StrikeStore impl ────────────────────────────────────────────────────────

impl StrikeStore for SqliteStore {
  type Error = crate::Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn insert(&self, strike: NewStrike) -> Result<StrikeRecord> {
    let record = assign_id(strike);
    let row    = EncodedStrike::from_record(&record)?;

    self
      .conn
      .call(move |conn| {
        row.insert(conn)?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn insert_many(&self, strikes: Vec<NewStrike>) -> Result<Vec<StrikeRecord>> {
    let records: Vec<StrikeRecord> = strikes.into_iter().map(assign_id).collect();
    let rows = records
      .iter()
      .map(EncodedStrike::from_record)
      .collect::<Result<Vec<_>>>()?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for row in &rows {
          row.insert(&tx)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(count = records.len(), "strike units inserted");
    Ok(records)
  }

  async fn delete(&self, record_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(record_id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM strikes WHERE record_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(removed > 0)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn count_in_range(&self, key: SubjectKey, window: StrikeWindow) -> Result<u64> {
    let (group_str, subject_str, start_str, end_str) = Self::window_params(key, window);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM strikes
           WHERE group_id = ?1 AND subject_id = ?2
             AND issued_at >= ?3 AND issued_at < ?4",
          rusqlite::params![group_str, subject_str, start_str, end_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(count as u64)
  }

  async fn find_latest_in_range(
    &self,
    key:    SubjectKey,
    window: StrikeWindow,
  ) -> Result<Option<StrikeRecord>> {
    let (group_str, subject_str, start_str, end_str) = Self::window_params(key, window);

    let raw: Option<RawStrike> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {STRIKE_COLUMNS} FROM strikes
               WHERE group_id = ?1 AND subject_id = ?2
                 AND issued_at >= ?3 AND issued_at < ?4
               ORDER BY issued_at DESC, record_id DESC
               LIMIT 1"
            ),
            rusqlite::params![group_str, subject_str, start_str, end_str],
            RawStrike::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawStrike::into_record).transpose()
  }

  async fn find_all(&self, key: SubjectKey) -> Result<Vec<StrikeRecord>> {
    let group_str   = encode_id(key.group_id);
    let subject_str = encode_id(key.subject_id);

    let raws: Vec<RawStrike> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {STRIKE_COLUMNS} FROM strikes
           WHERE group_id = ?1 AND subject_id = ?2
           ORDER BY issued_at DESC, record_id DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![group_str, subject_str], RawStrike::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStrike::into_record).collect()
  }

  async fn get(&self, record_id: Uuid) -> Result<Option<StrikeRecord>> {
    let id_str = encode_uuid(record_id);

    let raw: Option<RawStrike> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {STRIKE_COLUMNS} FROM strikes WHERE record_id = ?1"),
            rusqlite::params![id_str],
            RawStrike::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawStrike::into_record).transpose()
  }
}
