//! Handlers for per-subject reads.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/groups/{group_id}/subjects/{subject_id}/strikes` | Lookup: active and expired strikes |
//! | `GET`  | `/api/groups/{group_id}/subjects/{subject_id}/active` | Optional `?at=<rfc3339>`; defaults to now |

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::{DateTime, Utc};
use gavel_core::{
  lookup::StrikeReport,
  store::StrikeStore,
  strike::{StrikeRecord, SubjectKey},
};
use serde::Deserialize;

use crate::{AppState, auth::Authenticated, error::Error, extract::ApiQuery};

// ─── Lookup ───────────────────────────────────────────────────────────────────

/// `GET /api/groups/{group_id}/subjects/{subject_id}/strikes`
pub async fn lookup<S>(
  _: Authenticated,
  State(state): State<AppState<S>>,
  Path((group_id, subject_id)): Path<(u64, u64)>,
) -> Result<Json<StrikeReport>, Error>
where
  S: StrikeStore + Clone + 'static,
{
  let key = SubjectKey::new(group_id, subject_id);
  Ok(Json(state.service.lookup(key, Utc::now()).await?))
}

// ─── Active ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ActiveParams {
  /// Reference time to evaluate at. Defaults to now.
  pub at: Option<DateTime<Utc>>,
}

/// `GET /api/groups/{group_id}/subjects/{subject_id}/active[?at=<rfc3339>]`
pub async fn active<S>(
  _: Authenticated,
  State(state): State<AppState<S>>,
  Path((group_id, subject_id)): Path<(u64, u64)>,
  ApiQuery(params): ApiQuery<ActiveParams>,
) -> Result<Json<Vec<StrikeRecord>>, Error>
where
  S: StrikeStore + Clone + 'static,
{
  let key = SubjectKey::new(group_id, subject_id);
  let at  = params.at.unwrap_or_else(Utc::now);
  Ok(Json(state.service.active_strikes(key, at).await?))
}
