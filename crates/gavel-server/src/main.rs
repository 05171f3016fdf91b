//! `gavel-server`: serves the moderation API over the SQLite strike store.
//!
//! ```text
//! gavel-server --config /etc/gavel/config.toml
//! echo -n 'hunter2' | gavel-server hash-password
//! ```
//!
//! Settings not in the file come from `GAVEL_*` variables, e.g.
//! `GAVEL_AUTH_PASSWORD_HASH` or `GAVEL_PORT`.

use std::{io::Read as _, path::PathBuf, sync::Arc};

use anyhow::{Context as _, anyhow};
use clap::{Parser, Subcommand};
use gavel_server::{AppState, ServerConfig, auth};
use gavel_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "gavel moderation strike server")]
struct Cli {
  /// TOML configuration file; missing is fine when `GAVEL_*` covers it.
  #[arg(short, long, default_value = "config.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the API (the default).
  Serve,
  /// Read a password from stdin and print its `auth_password_hash`.
  HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  match cli.command.unwrap_or(Command::Serve) {
    Command::HashPassword => print_hash(),
    Command::Serve => {
      tracing_subscriber::fmt()
        .with_env_filter(
          EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy(),
        )
        .init();
      serve(ServerConfig::load(&cli.config).context("loading configuration")?).await
    }
  }
}

async fn serve(cfg: ServerConfig) -> anyhow::Result<()> {
  let store_path = cfg.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("opening strike store {}", store_path.display()))?;

  let app = gavel_server::router(AppState::new(Arc::new(store), &cfg));
  let listener = TcpListener::bind((cfg.host.as_str(), cfg.port))
    .await
    .with_context(|| format!("binding {}:{}", cfg.host, cfg.port))?;

  tracing::info!(
    addr = %listener.local_addr()?,
    store = %store_path.display(),
    "gavel-server ready"
  );
  axum::serve(listener, app).await.context("server error")
}

fn print_hash() -> anyhow::Result<()> {
  let mut input = String::new();
  std::io::stdin()
    .read_to_string(&mut input)
    .context("reading password from stdin")?;
  let password = input.trim_end_matches(['\r', '\n']);
  if password.is_empty() {
    anyhow::bail!("no password on stdin");
  }
  let hash = auth::hash_password(password).map_err(|e| anyhow!("argon2: {e}"))?;
  println!("{hash}");
  Ok(())
}
