//! leadbook server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) overlaid by
//! `LEADBOOK_*` environment variables, opens the SQLite store, and serves the
//! JSON API over HTTP.
//!
//! # Bootstrapping an admin
//!
//! ```text
//! cargo run -p leadbook-api --bin server -- add-user --email admin@example.com --role admin --password
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::{Parser, Subcommand};
use leadbook_api::{AppState, ServerConfig};
use leadbook_core::{
  principal::{NewUser, Role},
  store::LeadStore,
};
use leadbook_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Leadbook buyer-lead server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
  /// Create a user in the configured store.
  AddUser {
    #[arg(long)]
    email:    String,
    #[arg(long)]
    name:     Option<String>,
    #[arg(long, default_value = "user")]
    role:     Role,
    /// Prompt for a login password.
    #[arg(long)]
    password: bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command.unwrap_or(Command::Serve) {
    Command::HashPassword => {
      println!("{}", hash_password(&read_password()?)?);
      Ok(())
    }
    Command::AddUser { email, name, role, password } => {
      let server_cfg = load_config(&cli.config)?;
      let store = open_store(&server_cfg).await?;
      let password_hash = if password {
        Some(hash_password(&read_password()?)?)
      } else {
        None
      };
      let user = store
        .add_user(NewUser { email, name, role, password_hash })
        .await
        .context("failed to add user")?;
      println!("{} {} {}", user.id, user.email, user.role);
      Ok(())
    }
    Command::Serve => serve(load_config(&cli.config)?).await,
  }
}

async fn serve(server_cfg: ServerConfig) -> anyhow::Result<()> {
  let store = open_store(&server_cfg).await?;
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let app = leadbook_api::router(AppState::new(store, server_cfg));

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("LEADBOOK"))
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

async fn open_store(server_cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);
  SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))
}

fn hash_password(password: &str) -> anyhow::Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string(),
  )
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  let password = line.trim_end_matches(['\r', '\n']).to_string();
  anyhow::ensure!(!password.is_empty(), "password must not be empty");
  Ok(password)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
