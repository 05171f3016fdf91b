//! JSON moderation-command API for gavel.
//!
//! Exposes an axum [`Router`] backed by any [`StrikeStore`]. The chat layer
//! calls it to issue strikes and look subjects up, then carries out the
//! returned escalation itself.

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;

pub use error::Error;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{
  Router,
  routing::{get, post},
};
use gavel_core::{moderation::ModerationService, store::StrikeStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;
use handlers::{strikes, subjects};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `GAVEL_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,
}

impl ServerConfig {
  /// Layer defaults, the TOML file at `path` (optional) and `GAVEL_*`
  /// environment variables, later sources winning.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::load_from(path, config::Environment::with_prefix("GAVEL"))
  }

  fn load_from(path: &Path, env: config::Environment) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 7878)?
      .set_default("store_path", "gavel.db")?
      .add_source(config::File::from(path).required(false))
      .add_source(env)
      .build()?
      .try_deserialize()
  }

  /// `store_path` with a leading `~/` expanded to `$HOME`.
  pub fn resolved_store_path(&self) -> PathBuf {
    let raw = self.store_path.to_string_lossy();
    match (raw.strip_prefix("~/"), std::env::var_os("HOME")) {
      (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
      _ => self.store_path.clone(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub service: ModerationService<S>,
  pub auth:    Arc<AuthConfig>,
}

impl<S: StrikeStore> AppState<S> {
  pub fn new(store: Arc<S>, config: &ServerConfig) -> Self {
    Self {
      service: ModerationService::new(store),
      auth:    Arc::new(AuthConfig {
        username:      config.auth_username.clone(),
        password_hash: config.auth_password_hash.clone(),
      }),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: StrikeStore + Clone + 'static,
{
  Router::new()
    .route("/api/strikes", post(strikes::create::<S>))
    .route(
      "/api/strikes/{record_id}",
      get(strikes::get_one::<S>).delete(strikes::delete_one::<S>),
    )
    .route(
      "/api/groups/{group_id}/subjects/{subject_id}/strikes",
      get(subjects::lookup::<S>),
    )
    .route(
      "/api/groups/{group_id}/subjects/{subject_id}/active",
      get(subjects::active::<S>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
