//! Admin-only handlers for `/users` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/users` | Oldest first |
//! | `PATCH`  | `/users/{id}/role` | Body: `{"role":"admin"}`; not on self |
//! | `DELETE` | `/users/{id}` | Not on self; buyers move to another admin |

use axum::{
  Json,
  extract::{
    Path, State,
    rejection::{JsonRejection, PathRejection},
  },
};
use leadbook_core::{
  principal::{Role, User, UserRemoval},
  store::LeadStore,
  users,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::CurrentPrincipal, error::ApiError};

/// `GET /users`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(actor): CurrentPrincipal,
) -> Result<Json<Vec<User>>, ApiError>
where
  S: LeadStore + Clone + 'static,
{
  Ok(Json(users::list(state.store.as_ref(), &actor).await?))
}

#[derive(Debug, Deserialize)]
pub struct RoleBody {
  pub role: Role,
}

/// `PATCH /users/{id}/role`
pub async fn change_role<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(actor): CurrentPrincipal,
  id: Result<Path<Uuid>, PathRejection>,
  body: Result<Json<RoleBody>, JsonRejection>,
) -> Result<Json<User>, ApiError>
where
  S: LeadStore + Clone + 'static,
{
  let Path(id) = id?;
  let Json(body) = body?;
  let user = users::change_role(state.store.as_ref(), &actor, id, body.role).await?;
  Ok(Json(user))
}

/// `DELETE /users/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(actor): CurrentPrincipal,
  id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<UserRemoval>, ApiError>
where
  S: LeadStore + Clone + 'static,
{
  let Path(id) = id?;
  Ok(Json(users::remove(state.store.as_ref(), &actor, id).await?))
}
