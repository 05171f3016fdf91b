//! Async HTTP client wrapping the gavel JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use gavel_core::{
  lookup::StrikeReport,
  moderation::StrikeOutcome,
  strike::{StrikeRequest, SubjectKey},
};
use reqwest::{Client, Response, StatusCode};
use uuid::Uuid;

/// Connection settings for the gavel API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

/// Async HTTP client for the gavel JSON API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  /// Turn a non-2xx response into an error carrying the server's message.
  async fn check(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::debug!(%status, body, "{what} failed");
    Err(anyhow!("{what} → {status}: {body}"))
  }

  // ── Strikes ───────────────────────────────────────────────────────────────

  /// `POST /api/strikes`
  pub async fn strike(&self, request: &StrikeRequest) -> Result<StrikeOutcome> {
    let resp = self
      .auth(self.client.post(self.url("/strikes")))
      .json(request)
      .send()
      .await
      .context("POST /strikes failed")?;

    Self::check(resp, "POST /strikes")
      .await?
      .json()
      .await
      .context("deserialising strike outcome")
  }

  /// `DELETE /api/strikes/{id}`. Returns `false` if the record did not exist.
  pub async fn delete(&self, record_id: Uuid) -> Result<bool> {
    let path = format!("/strikes/{record_id}");
    let resp = self
      .auth(self.client.delete(self.url(&path)))
      .send()
      .await
      .with_context(|| format!("DELETE {path} failed"))?;

    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(false);
    }
    Self::check(resp, "DELETE /strikes").await?;
    Ok(true)
  }

  // ── Subjects ──────────────────────────────────────────────────────────────

  /// `GET /api/groups/{group}/subjects/{subject}/strikes`
  pub async fn lookup(&self, key: SubjectKey) -> Result<StrikeReport> {
    let path = format!("/groups/{}/subjects/{}/strikes", key.group_id, key.subject_id);
    let resp = self
      .auth(self.client.get(self.url(&path)))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;

    Self::check(resp, "GET lookup")
      .await?
      .json()
      .await
      .context("deserialising strike report")
  }
}
