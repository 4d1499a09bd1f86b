//! Principal resolution and admin-only user management.

use serde::Deserialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  policy,
  principal::{Principal, Role, User, UserRemoval, normalize_email},
  store::LeadStore,
};

/// What an inbound request claims about its actor, after the transport
/// layer has verified the claim's signature.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrincipalClaim {
  pub email: String,
  /// A pre-resolved user id. Trusted as-is when it parses as a UUID.
  pub id:    Option<String>,
  pub role:  Option<Role>,
}

/// Turn a claim into a [`Principal`].
///
/// A claim carrying a well-formed id is trusted without a store round trip;
/// otherwise the user is looked up by email.
pub async fn resolve<S: LeadStore>(store: &S, claim: &PrincipalClaim) -> Result<Principal> {
  let email = normalize_email(&claim.email);
  if email.is_empty() {
    return Err(Error::Unauthenticated);
  }

  if let Some(id) = claim.id.as_deref().and_then(|s| Uuid::parse_str(s).ok()) {
    return Ok(Principal {
      id,
      email,
      role: claim.role.unwrap_or_default(),
    });
  }

  store
    .find_user_by_email(&email)
    .await
    .map_err(Error::store)?
    .map(|u| u.principal())
    .ok_or_else(|| Error::NotFound(format!("no user with email {email}")))
}

pub async fn list<S: LeadStore>(store: &S, actor: &Principal) -> Result<Vec<User>> {
  policy::check_user_listing(actor)?;
  store.list_users().await.map_err(Error::store)
}

pub async fn change_role<S: LeadStore>(
  store: &S,
  actor: &Principal,
  target: Uuid,
  role: Role,
) -> Result<User> {
  policy::check_role_change(actor, target)?;
  let user = store
    .set_user_role(target, role)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(format!("user {target} not found")))?;
  tracing::info!(user_id = %target, %role, by = %actor.id, "user role changed");
  Ok(user)
}

/// Remove a user. Their buyers go to the longest-standing other admin, or
/// are orphaned if there is none.
pub async fn remove<S: LeadStore>(
  store: &S,
  actor: &Principal,
  target: Uuid,
) -> Result<UserRemoval> {
  policy::check_user_removal(actor, target)?;
  let transfer_to = store
    .list_users()
    .await
    .map_err(Error::store)?
    .into_iter()
    .find(|u| u.role == Role::Admin && u.id != target)
    .map(|u| u.id);

  let removal = store
    .remove_user(target, transfer_to)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(format!("user {target} not found")))?;
  tracing::info!(
    user_id = %target,
    transferred_to = ?removal.transferred_to,
    buyers = removal.buyers,
    by = %actor.id,
    "user removed"
  );
  Ok(removal)
}
