//! Error type for `gavel-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A group, subject or moderator id column that is not a valid `u64`.
  #[error("malformed id column: {0:?}")]
  IdParse(String),

  #[error("timestamp cannot be stored: {0}")]
  DateRange(chrono::DateTime<chrono::Utc>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
