//! The `StrikeStore` trait, the record store the evaluator queries.
//!
//! Implemented by storage backends (e.g. `gavel-store-sqlite`). The evaluator
//! and the moderation service depend on this abstraction only.

use std::future::Future;

use uuid::Uuid;

use crate::{
  policy::StrikeWindow,
  strike::{NewStrike, StrikeRecord, SubjectKey},
};

/// Abstraction over a strike record store backend.
///
/// Records are append-only; the only removal is the explicit administrative
/// [`StrikeStore::delete`]. Inserts must be atomic per record, and
/// [`StrikeStore::insert_many`] atomic per batch.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait StrikeStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist a strike unit and return it with its assigned `record_id`.
  fn insert(
    &self,
    strike: NewStrike,
  ) -> impl Future<Output = Result<StrikeRecord, Self::Error>> + Send + '_;

  /// Persist every unit of one strike atomically: either all are written or,
  /// on error, none are. Returned records keep the input order.
  fn insert_many(
    &self,
    strikes: Vec<NewStrike>,
  ) -> impl Future<Output = Result<Vec<StrikeRecord>, Self::Error>> + Send + '_;

  /// Remove a record by id. Returns `false` if no such record existed.
  fn delete(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Count the subject's records with `issued_at` in `[window.start, window.end)`.
  fn count_in_range(
    &self,
    key: SubjectKey,
    window: StrikeWindow,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// The most recent of the subject's records in the window, if any.
  fn find_latest_in_range(
    &self,
    key: SubjectKey,
    window: StrikeWindow,
  ) -> impl Future<Output = Result<Option<StrikeRecord>, Self::Error>> + Send + '_;

  /// The subject's full history in the group, newest first.
  fn find_all(
    &self,
    key: SubjectKey,
  ) -> impl Future<Output = Result<Vec<StrikeRecord>, Self::Error>> + Send + '_;

  /// Retrieve a single record by id.
  fn get(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<Option<StrikeRecord>, Self::Error>> + Send + '_;
}
