//! `gavel`: moderator command line for the gavel strike server.
//!
//! # Usage
//!
//! ```
//! gavel --url http://localhost:7878 --user mod --password secret \
//!   strike 811234567890123456 42 --severity 2 --moderator 7 --reason "spam"
//! gavel --config ~/.config/gavel/config.toml lookup 811234567890123456 42
//! gavel delete 6f1c0c1e-8d4b-4f7e-9f7a-2a0b3c4d5e6f
//! ```

mod client;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use gavel_core::{
  escalation::Escalation,
  lookup::StrikeReport,
  moderation::StrikeOutcome,
  strike::{Severity, StrikeRecord, StrikeRequest, SubjectKey},
};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "gavel", about = "Moderator CLI for the gavel strike server")]
struct Args {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the gavel server (default: http://localhost:7878).
  #[arg(long, env = "GAVEL_URL")]
  url: Option<String>,

  /// API username.
  #[arg(long, env = "GAVEL_USER")]
  user: Option<String>,

  /// API password (plaintext).
  #[arg(long, env = "GAVEL_PASSWORD")]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Issue a strike against a subject.
  Strike {
    group:   u64,
    subject: u64,
    /// Strike level, 1 to 3.
    #[arg(short, long, default_value_t = 1)]
    severity: u8,
    /// Id of the issuing moderator.
    #[arg(short, long)]
    moderator: u64,
    #[arg(short, long)]
    reason: String,
    /// Link to the offending message.
    #[arg(short, long)]
    link: Option<String>,
  },
  /// Show a subject's active and expired strikes.
  Lookup { group: u64, subject: u64 },
  /// Delete a single strike record.
  Delete { record_id: Uuid },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
}

fn non_empty(s: &str) -> Option<String> { (!s.is_empty()).then(|| s.to_string()) }

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| non_empty(&file_cfg.url))
      .unwrap_or_else(|| "http://localhost:7878".to_string()),
    username: args
      .user
      .or_else(|| non_empty(&file_cfg.username))
      .unwrap_or_default(),
    password: args
      .password
      .or_else(|| non_empty(&file_cfg.password))
      .unwrap_or_default(),
  };

  let client = ApiClient::new(api_config)?;

  match args.command {
    Command::Strike { group, subject, severity, moderator, reason, link } => {
      let severity = Severity::try_from(severity)?;
      let request = StrikeRequest {
        key: SubjectKey::new(group, subject),
        severity,
        moderator_id: moderator,
        reference_link: link,
        reason,
      };
      let outcome = client.strike(&request).await?;
      print_outcome(&outcome);
    }
    Command::Lookup { group, subject } => {
      let report = client.lookup(SubjectKey::new(group, subject)).await?;
      print_report(&report);
    }
    Command::Delete { record_id } => {
      if !client.delete(record_id).await? {
        bail!("no strike with id {record_id}");
      }
      println!("deleted {record_id}");
    }
  }

  Ok(())
}

// ─── Output ───────────────────────────────────────────────────────────────────

fn print_outcome(outcome: &StrikeOutcome) {
  println!(
    "recorded {} strike(s); {} active",
    outcome.records.len(),
    outcome.active.len()
  );
  match outcome.escalation {
    Escalation::None => {}
    Escalation::Mute => println!("→ subject should be muted"),
    Escalation::Ban => println!("→ subject has reached the ban threshold"),
  }
}

fn print_report(report: &StrikeReport) {
  println!(
    "{}: {} active strike(s) as of {}",
    report.key,
    report.active_count(),
    stamp(report.as_of)
  );
  if report.history.is_empty() {
    println!("  no strikes on record");
    return;
  }
  for resolved in &report.history {
    let marker = if resolved.status.is_active() { "*" } else { " " };
    println!("{marker} {}", line(&resolved.record));
  }
}

fn line(record: &StrikeRecord) -> String {
  let mut out = format!(
    "{}  {}  by {}  {}",
    record.record_id,
    stamp(record.issued_at),
    record.moderator_id,
    record.reason
  );
  if let Some(link) = &record.reference_link {
    out.push_str("  <");
    out.push_str(link);
    out.push('>');
  }
  out
}

fn stamp(dt: DateTime<Utc>) -> String { dt.format("%Y-%m-%d %H:%M:%S").to_string() }
