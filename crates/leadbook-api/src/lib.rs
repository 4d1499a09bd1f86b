//! JSON REST API for Leadbook.
//!
//! Exposes an axum [`Router`] backed by any [`LeadStore`]. Every route lives
//! under `/api` and, apart from login, requires a bearer token.

pub mod auth;
pub mod buyers;
pub mod error;
pub mod transfer;
pub mod users;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, patch, post},
};
use leadbook_core::store::LeadStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::TokenKeys;

// ─── Configuration ───────────────────────────────────────────────────────────

pub const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_IMPORT_MAX_ROWS: usize = 200;

/// Runtime server configuration, deserialised from `config.toml` and
/// `LEADBOOK_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  pub store_path:      PathBuf,
  /// HS256 key for bearer tokens.
  pub token_secret:    String,
  #[serde(default = "default_token_ttl_secs")]
  pub token_ttl_secs:  u64,
  /// Largest number of data rows accepted in one import file.
  #[serde(default = "default_import_max_rows")]
  pub import_max_rows: usize,
}

fn default_token_ttl_secs() -> u64 { DEFAULT_TOKEN_TTL_SECS }

fn default_import_max_rows() -> usize { DEFAULT_IMPORT_MAX_ROWS }

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: LeadStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub tokens: Arc<TokenKeys>,
}

impl<S: LeadStore> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Self {
    let tokens = TokenKeys::new(&config.token_secret, config.token_ttl_secs);
    Self {
      store:  Arc::new(store),
      config: Arc::new(config),
      tokens: Arc::new(tokens),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the application [`Router`], with every route nested under `/api`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: LeadStore + Clone + 'static,
{
  let api = Router::new()
    // Session
    .route("/auth/login", post(auth::login::<S>))
    .route("/me", get(auth::me))
    // Buyers
    .route("/buyers", get(buyers::list::<S>).post(buyers::create::<S>))
    .route("/buyers/import", post(transfer::import::<S>))
    .route("/buyers/export", get(transfer::export::<S>))
    .route(
      "/buyers/{id}",
      get(buyers::get_one::<S>)
        .put(buyers::update::<S>)
        .delete(buyers::delete_one::<S>),
    )
    .route("/buyers/{id}/history", get(buyers::history::<S>))
    // Users
    .route("/users", get(users::list::<S>))
    .route("/users/{id}/role", patch(users::change_role::<S>))
    .route("/users/{id}", delete(users::remove::<S>));

  Router::new()
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
