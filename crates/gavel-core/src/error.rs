//! Error types for `gavel-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::strike::SubjectKey;

#[derive(Debug, Error)]
pub enum Error {
  /// Any failure reading from or writing to the strike record store. Never
  /// retried here; callers must abort the enforcement action in progress.
  #[error("strike store unavailable: {0}")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The store contradicted itself between two queries, e.g. a nonzero count
  /// followed by no matching record. Treated exactly like an outage.
  #[error("inconsistent strike records for {key}: {detail}")]
  InconsistentRecordState { key: SubjectKey, detail: String },

  #[error("strike record not found: {0}")]
  StrikeNotFound(Uuid),

  #[error("invalid strike severity {0}; expected 1, 2 or 3")]
  InvalidSeverity(u8),

  #[error("timestamp out of range for calendar arithmetic")]
  TimeOutOfRange,
}

impl Error {
  /// Wrap a backend error as [`Error::StoreUnavailable`].
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::StoreUnavailable(Box::new(err))
  }

  /// Whether the error came from the record store rather than the caller's
  /// input. Enforcement must never proceed past one of these.
  pub fn is_store_failure(&self) -> bool {
    matches!(
      self,
      Self::StoreUnavailable(_) | Self::InconsistentRecordState { .. }
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
