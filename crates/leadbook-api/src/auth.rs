//! Bearer-token authentication: token issue and verification, the
//! [`CurrentPrincipal`] extractor, and the login endpoint.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  Json,
  extract::{FromRequestParts, State, rejection::JsonRejection},
  http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use leadbook_core::{
  Error,
  principal::{Principal, Role, User},
  store::LeadStore,
  users::{self, PrincipalClaim},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// JWT payload. `sub` is the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  #[serde(default)]
  pub sub:   Option<String>,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub role:  Option<Role>,
  pub iat:   i64,
  pub exp:   i64,
}

impl From<Claims> for PrincipalClaim {
  fn from(c: Claims) -> Self {
    PrincipalClaim {
      email: c.email,
      id:    c.sub,
      role:  c.role,
    }
  }
}

/// HS256 signing and verification keys derived from the server secret.
pub struct TokenKeys {
  encoding: EncodingKey,
  decoding: DecodingKey,
  ttl_secs: i64,
}

impl TokenKeys {
  pub fn new(secret: &str, ttl_secs: u64) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
      ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
    }
  }

  /// Sign `claims` as-is.
  pub fn sign(&self, claims: &Claims) -> jsonwebtoken::errors::Result<String> {
    encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
  }

  /// Issue a token for `user`, valid for the configured lifetime.
  pub fn issue(&self, user: &User) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now().timestamp();
    self.sign(&Claims {
      sub:   Some(user.id.to_string()),
      email: user.email.clone(),
      role:  Some(user.role),
      iat:   now,
      exp:   now.saturating_add(self.ttl_secs),
    })
  }

  /// Check the signature and expiry of `token`.
  pub fn verify(&self, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
  }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated actor of a request.
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<AppState<S>> for CurrentPrincipal
where
  S: LeadStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer(&parts.headers).ok_or(Error::Unauthenticated)?;
    let claims = state.tokens.verify(token).map_err(|e| {
      tracing::debug!(error = %e, "bearer token rejected");
      Error::Unauthenticated
    })?;
    let principal = users::resolve(state.store.as_ref(), &claims.into()).await?;
    Ok(CurrentPrincipal(principal))
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
  pub token: String,
  pub user:  User,
}

fn password_matches(password: &str, hash: Option<&str>) -> bool {
  let Some(parsed) = hash.and_then(|h| PasswordHash::new(h).ok()) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

/// `POST /auth/login`, body: `{"email": "...", "password": "..."}`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError>
where
  S: LeadStore + Clone + 'static,
{
  let Json(body) = body?;
  let user = state
    .store
    .find_user_by_email(&body.email)
    .await
    .map_err(Error::store)?
    .filter(|u| password_matches(&body.password, u.password_hash.as_deref()))
    .ok_or(Error::Unauthenticated)?;

  let token = state
    .tokens
    .issue(&user)
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))?;
  tracing::info!(user_id = %user.id, "user logged in");
  Ok(Json(LoginResponse { token, user }))
}

/// `GET /me`
pub async fn me(CurrentPrincipal(principal): CurrentPrincipal) -> Json<Principal> {
  Json(principal)
}
