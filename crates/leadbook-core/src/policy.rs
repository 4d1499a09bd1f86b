//! Access policy: who may read, write or delete a buyer record.
//!
//! Pure functions with no side effects. Callers resolve the [`Principal`]
//! once per request and pass it explicitly to every decision.
//!
//! | operation | allowed when |
//! |-----------|--------------|
//! | read one  | always |
//! | list / export | always, but scoped to owned records unless admin |
//! | create    | always; the creator becomes owner |
//! | write / delete | admin, or `owner_id == principal.id` |

use uuid::Uuid;

use crate::{
  Error, Result,
  buyer::BuyerRecord,
  principal::Principal,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Read,
  Write,
  Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Allow,
  Deny(&'static str),
}

impl Decision {
  pub fn is_allowed(self) -> bool { matches!(self, Self::Allow) }
}

pub fn can_read(_principal: &Principal, _record: &BuyerRecord) -> bool { true }

pub fn can_create(_principal: &Principal) -> bool { true }

pub fn can_write(principal: &Principal, record: &BuyerRecord) -> bool {
  principal.is_admin() || record.owner_id == Some(principal.id)
}

pub fn can_delete(principal: &Principal, record: &BuyerRecord) -> bool {
  principal.is_admin() || record.owner_id == Some(principal.id)
}

pub fn decide(principal: &Principal, record: &BuyerRecord, op: Operation) -> Decision {
  match op {
    Operation::Read if can_read(principal, record) => Decision::Allow,
    Operation::Write if can_write(principal, record) => Decision::Allow,
    Operation::Delete if can_delete(principal, record) => Decision::Allow,
    Operation::Read => Decision::Deny("you cannot view this buyer"),
    Operation::Write => Decision::Deny("only the owner or an admin can edit this buyer"),
    Operation::Delete => Decision::Deny("only the owner or an admin can delete this buyer"),
  }
}

/// [`decide`] as a `Result`, mapping a denial to [`Error::Forbidden`].
pub fn authorize(principal: &Principal, record: &BuyerRecord, op: Operation) -> Result<()> {
  match decide(principal, record, op) {
    Decision::Allow => Ok(()),
    Decision::Deny(reason) => Err(Error::Forbidden(reason.to_owned())),
  }
}

/// The owner a listing must be restricted to; `None` means every record.
pub fn list_scope(principal: &Principal) -> Option<Uuid> {
  (!principal.is_admin()).then_some(principal.id)
}

// ─── User management ─────────────────────────────────────────────────────────

fn require_admin(actor: &Principal) -> Result<()> {
  if actor.is_admin() {
    Ok(())
  } else {
    Err(Error::Forbidden("admin access required".to_owned()))
  }
}

/// Any admin may list users.
pub fn check_user_listing(actor: &Principal) -> Result<()> { require_admin(actor) }

/// An admin may change anyone's role except their own.
pub fn check_role_change(actor: &Principal, target: Uuid) -> Result<()> {
  require_admin(actor)?;
  if actor.id == target {
    return Err(Error::Forbidden("you cannot change your own role".to_owned()));
  }
  Ok(())
}

/// An admin may remove any account except their own.
pub fn check_user_removal(actor: &Principal, target: Uuid) -> Result<()> {
  require_admin(actor)?;
  if actor.id == target {
    return Err(Error::Forbidden("you cannot delete your own account".to_owned()));
  }
  Ok(())
}
