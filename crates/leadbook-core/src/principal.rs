//! Principals (the actor behind a request) and the users they resolve from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
  #[default]
  User,
  Admin,
}

/// The authenticated actor performing a request. Resolved per request and
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub id:    Uuid,
  pub email: String,
  pub role:  Role,
}

impl Principal {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

/// A row of the user table consulted by the principal resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id:            Uuid,
  /// Always stored lower-case.
  pub email:         String,
  pub name:          Option<String>,
  pub role:          Role,
  /// Argon2 PHC string; never leaves the server.
  #[serde(skip)]
  pub password_hash: Option<String>,
  pub created_at:    DateTime<Utc>,
}

impl User {
  pub fn principal(&self) -> Principal {
    Principal {
      id:    self.id,
      email: self.email.clone(),
      role:  self.role,
    }
  }
}

/// Input to [`crate::store::LeadStore::add_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub email:         String,
  pub name:          Option<String>,
  pub role:          Role,
  pub password_hash: Option<String>,
}

/// What happened to a removed user's buyers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRemoval {
  pub user:           User,
  /// The admin who inherited the buyers, if any.
  pub transferred_to: Option<Uuid>,
  /// Buyers moved to `transferred_to`, or orphaned when it is `None`.
  pub buyers:         usize,
}

/// Lower-case and trim an email for lookups and storage.
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }
