//! Handlers for `/api/strikes` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/api/strikes` | Body: [`StrikeRequest`]; returns 201 + [`StrikeOutcome`] |
//! | `GET`    | `/api/strikes/{record_id}` | 404 if not found |
//! | `DELETE` | `/api/strikes/{record_id}` | Administrative removal; 204, or 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use gavel_core::{
  moderation::StrikeOutcome,
  store::StrikeStore,
  strike::{StrikeRecord, StrikeRequest},
};
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::Error, extract::ApiJson};

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /api/strikes`
///
/// Records the strike and returns the escalation the chat layer must carry
/// out. An undecodable body (including a severity outside 1..=3) is a 400.
/// On any store failure nothing is decided and the response is 503.
pub async fn create<S>(
  _: Authenticated,
  State(state): State<AppState<S>>,
  ApiJson(body): ApiJson<StrikeRequest>,
) -> Result<impl IntoResponse, Error>
where
  S: StrikeStore + Clone + 'static,
{
  let outcome: StrikeOutcome = state.service.issue_strike(body, Utc::now()).await?;
  Ok((StatusCode::CREATED, Json(outcome)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /api/strikes/{record_id}`
pub async fn get_one<S>(
  _: Authenticated,
  State(state): State<AppState<S>>,
  Path(record_id): Path<Uuid>,
) -> Result<Json<StrikeRecord>, Error>
where
  S: StrikeStore + Clone + 'static,
{
  Ok(Json(state.service.get_strike(record_id).await?))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /api/strikes/{record_id}`
pub async fn delete_one<S>(
  _: Authenticated,
  State(state): State<AppState<S>>,
  Path(record_id): Path<Uuid>,
) -> Result<StatusCode, Error>
where
  S: StrikeStore + Clone + 'static,
{
  state.service.delete_strike(record_id).await?;
  Ok(StatusCode::NO_CONTENT)
}
