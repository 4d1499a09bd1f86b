//! Ownership-aware buyer operations.
//!
//! Each function gates the store call through [`crate::policy`] and records
//! history where required. They are generic over [`LeadStore`] so every
//! surface (HTTP handlers, bulk import, tests) shares one set of rules.

use uuid::Uuid;

use crate::{
  Error, Result,
  buyer::{BuyerDraft, BuyerRecord, Source},
  form::BuyerForm,
  history::{self, Change, HistoryEntry},
  policy::{self, Operation},
  principal::Principal,
  store::{BuyerFilter, BuyerQuery, LeadStore, Page},
};

pub const DEFAULT_HISTORY_LIMIT: u32 = 20;
pub const MAX_HISTORY_LIMIT: u32 = 100;

fn not_found(id: Uuid) -> Error { Error::NotFound(format!("buyer {id} not found")) }

/// Non-admins only ever see their own buyers; `filter.owner_id` is
/// overwritten accordingly.
pub async fn list<S: LeadStore>(
  store: &S,
  principal: &Principal,
  mut filter: BuyerFilter,
  page: Option<u32>,
  limit: Option<u32>,
) -> Result<Page<BuyerRecord>> {
  filter.owner_id = policy::list_scope(principal);
  let query = BuyerQuery::new(filter, page, limit);
  store.list_buyers(&query).await.map_err(Error::store)
}

/// Same scoping as [`list`], without paging.
pub async fn export<S: LeadStore>(
  store: &S,
  principal: &Principal,
  mut filter: BuyerFilter,
) -> Result<Vec<BuyerRecord>> {
  filter.owner_id = policy::list_scope(principal);
  store.export_buyers(&filter).await.map_err(Error::store)
}

/// Fetch a single buyer. Reads are not owner-scoped.
pub async fn get<S: LeadStore>(store: &S, id: Uuid) -> Result<BuyerRecord> {
  store
    .get_buyer(id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| not_found(id))
}

/// Validate `form` and create a buyer owned by `principal`.
pub async fn create<S: LeadStore>(
  store: &S,
  principal: &Principal,
  form: &BuyerForm,
  default_source: Source,
) -> Result<BuyerRecord> {
  let draft = form.validate(default_source)?;
  insert(store, principal, draft).await
}

/// Persist an already-validated draft owned by `principal` and record its
/// creation.
pub async fn insert<S: LeadStore>(
  store: &S,
  principal: &Principal,
  draft: BuyerDraft,
) -> Result<BuyerRecord> {
  if !policy::can_create(principal) {
    return Err(Error::Forbidden("you cannot create buyers".to_owned()));
  }
  let record = store
    .insert_buyer(draft, Some(principal.id))
    .await
    .map_err(Error::store)?;

  tracing::info!(buyer_id = %record.id, owner_id = %principal.id, "buyer created");
  history::record(
    store,
    record.id,
    Some(principal.id),
    Change::Created(Box::new(record.clone())),
  )
  .await;
  Ok(record)
}

/// Replace every attribute of a buyer. Only a status transition is written
/// to history.
pub async fn update<S: LeadStore>(
  store: &S,
  principal: &Principal,
  id: Uuid,
  form: &BuyerForm,
) -> Result<BuyerRecord> {
  let before = get(store, id).await?;
  policy::authorize(principal, &before, Operation::Write)?;
  let draft = form.validate(Source::Website)?;

  let after = store
    .replace_buyer(id, draft)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| not_found(id))?;

  tracing::info!(buyer_id = %id, by = %principal.id, "buyer updated");
  if let Some(change) = history::status_change(&before, &after) {
    history::record(store, id, Some(principal.id), change).await;
  }
  Ok(after)
}

pub async fn delete<S: LeadStore>(
  store: &S,
  principal: &Principal,
  id: Uuid,
) -> Result<BuyerRecord> {
  let existing = get(store, id).await?;
  policy::authorize(principal, &existing, Operation::Delete)?;

  let deleted = store
    .delete_buyer(id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| not_found(id))?;
  tracing::info!(buyer_id = %id, by = %principal.id, "buyer deleted");
  Ok(deleted)
}

/// Most recent history entries of an existing buyer, newest first.
pub async fn history<S: LeadStore>(
  store: &S,
  id: Uuid,
  limit: Option<u32>,
) -> Result<Vec<HistoryEntry>> {
  get(store, id).await?;
  let limit = limit
    .unwrap_or(DEFAULT_HISTORY_LIMIT)
    .clamp(1, MAX_HISTORY_LIMIT);
  store.list_history(id, limit).await.map_err(Error::store)
}
