//! The append-only audit trail of buyer changes.
//!
//! Only two events are ever recorded: creation (with a full snapshot) and a
//! transition of `status`. Edits that leave the status unchanged produce no
//! entry at all.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  buyer::{BuyerRecord, Status},
  store::LeadStore,
};

// ─── Change ──────────────────────────────────────────────────────────────────

/// What a history entry describes.
///
/// Serialised as `{"action": "created"|"updated", "changes": {...}}`; a
/// creation also carries the full `snapshot` and an empty `changes` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "DiffPayload", try_from = "DiffPayload")]
pub enum Change {
  Created(Box<BuyerRecord>),
  StatusUpdated { from: Status, to: Status },
}

impl Change {
  pub fn action(&self) -> Action {
    match self {
      Self::Created(_) => Action::Created,
      Self::StatusUpdated { .. } => Action::Updated,
    }
  }
}

/// The `status` transition between two versions of a record, if any.
pub fn status_change(before: &BuyerRecord, after: &BuyerRecord) -> Option<Change> {
  (before.status != after.status).then_some(Change::StatusUpdated {
    from: before.status,
    to:   after.status,
  })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
  Created,
  Updated,
}

/// `{from, to}` for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
  pub from: serde_json::Value,
  pub to:   serde_json::Value,
}

/// Wire and storage shape of a [`Change`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DiffPayload {
  action:   Action,
  #[serde(default)]
  changes:  BTreeMap<String, FieldChange>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  snapshot: Option<Box<BuyerRecord>>,
}

impl From<Change> for DiffPayload {
  fn from(change: Change) -> Self {
    match change {
      Change::Created(snapshot) => Self {
        action:   Action::Created,
        changes:  BTreeMap::new(),
        snapshot: Some(snapshot),
      },
      Change::StatusUpdated { from, to } => {
        let field = FieldChange {
          from: serde_json::Value::String(from.to_string()),
          to:   serde_json::Value::String(to.to_string()),
        };
        Self {
          action:   Action::Updated,
          changes:  BTreeMap::from([("status".to_owned(), field)]),
          snapshot: None,
        }
      }
    }
  }
}

impl TryFrom<DiffPayload> for Change {
  type Error = String;

  fn try_from(payload: DiffPayload) -> Result<Self, Self::Error> {
    match payload.action {
      Action::Created => payload
        .snapshot
        .map(Change::Created)
        .ok_or_else(|| "created entry without snapshot".to_owned()),
      Action::Updated => {
        let status = payload
          .changes
          .get("status")
          .ok_or_else(|| "updated entry without a status change".to_owned())?;
        let parse = |v: &serde_json::Value| {
          serde_json::from_value::<Status>(v.clone()).map_err(|e| e.to_string())
        };
        Ok(Change::StatusUpdated {
          from: parse(&status.from)?,
          to:   parse(&status.to)?,
        })
      }
    }
  }
}

// ─── Entries ─────────────────────────────────────────────────────────────────

/// One immutable audit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
  pub id:         Uuid,
  pub buyer_id:   Uuid,
  /// `None` once the acting user has been removed.
  pub changed_by: Option<Uuid>,
  pub changed_at: DateTime<Utc>,
  pub diff:       Change,
}

/// Input to [`LeadStore::append_history`]. The id and timestamp are set by
/// the store.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
  pub buyer_id:   Uuid,
  pub changed_by: Option<Uuid>,
  pub diff:       Change,
}

// ─── Recorder ────────────────────────────────────────────────────────────────

/// Append a history entry. Failures are logged, never returned.
pub async fn record<S: LeadStore>(
  store: &S,
  buyer_id: Uuid,
  changed_by: Option<Uuid>,
  diff: Change,
) {
  let action = diff.action();
  let entry = NewHistoryEntry { buyer_id, changed_by, diff };
  if let Err(e) = store.append_history(entry).await {
    tracing::warn!(%buyer_id, ?action, error = %e, "failed to record buyer history");
  }
}
