//! The `LeadStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `leadbook-store-sqlite`).
//! It is deliberately policy-free: ownership checks and history recording
//! live in [`crate::records`], which is generic over any backend.

use std::future::Future;

use serde::Serialize;
use uuid::Uuid;

use crate::{
  buyer::{BuyerDraft, BuyerRecord, City, PropertyType, Status},
  history::{HistoryEntry, NewHistoryEntry},
  principal::{NewUser, Role, User, UserRemoval},
};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

// ─── Query types ─────────────────────────────────────────────────────────────

/// Predicates shared by listing and export.
#[derive(Debug, Clone, Default)]
pub struct BuyerFilter {
  /// Case-insensitive substring over full name, phone and email.
  pub search:        Option<String>,
  pub city:          Option<City>,
  pub status:        Option<Status>,
  pub property_type: Option<PropertyType>,
  /// Restrict to a single owner. Set from [`crate::policy::list_scope`].
  pub owner_id:      Option<Uuid>,
}

/// Parameters for [`LeadStore::list_buyers`].
#[derive(Debug, Clone)]
pub struct BuyerQuery {
  pub filter: BuyerFilter,
  /// 1-based.
  pub page:   u32,
  pub limit:  u32,
}

impl BuyerQuery {
  /// Normalise out-of-range paging: page ≥ 1, limit in `1..=MAX_PAGE_SIZE`.
  pub fn new(filter: BuyerFilter, page: Option<u32>, limit: Option<u32>) -> Self {
    Self {
      filter,
      page:  page.unwrap_or(1).max(1),
      limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
    }
  }

  pub fn offset(&self) -> u64 { u64::from(self.page - 1) * u64::from(self.limit) }
}

/// One page of results plus the totals needed to render pagination.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
  pub items:       Vec<T>,
  pub total:       u64,
  pub page:        u32,
  pub limit:       u32,
  pub total_pages: u64,
}

impl<T> Page<T> {
  pub fn new(items: Vec<T>, total: u64, query: &BuyerQuery) -> Self {
    Self {
      items,
      total,
      page: query.page,
      limit: query.limit,
      total_pages: total.div_ceil(u64::from(query.limit)),
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Leadbook storage backend.
///
/// Every method is a single independent unit of work; there is no cross-call
/// transaction. All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait LeadStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create a user. The email is stored lower-cased and must be unique.
  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up a user by email, ignoring case.
  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// All users, oldest first.
  fn list_users(&self) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Returns `None` if the user does not exist.
  fn set_user_role(
    &self,
    id: Uuid,
    role: Role,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Atomically delete a user: their buyers move to `transfer_to` (or are
  /// orphaned when it is `None`) and their history entries lose the actor
  /// reference. Returns `None` if the user does not exist.
  fn remove_user(
    &self,
    id: Uuid,
    transfer_to: Option<Uuid>,
  ) -> impl Future<Output = Result<Option<UserRemoval>, Self::Error>> + Send + '_;

  // ── Buyers ────────────────────────────────────────────────────────────

  /// Persist a new buyer. The id and both timestamps are set by the store.
  fn insert_buyer(
    &self,
    draft: BuyerDraft,
    owner_id: Option<Uuid>,
  ) -> impl Future<Output = Result<BuyerRecord, Self::Error>> + Send + '_;

  fn get_buyer(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<BuyerRecord>, Self::Error>> + Send + '_;

  /// One page of buyers matching `query`, most recently updated first.
  fn list_buyers<'a>(
    &'a self,
    query: &'a BuyerQuery,
  ) -> impl Future<Output = Result<Page<BuyerRecord>, Self::Error>> + Send + 'a;

  /// Every buyer matching `filter`, most recently updated first.
  fn export_buyers<'a>(
    &'a self,
    filter: &'a BuyerFilter,
  ) -> impl Future<Output = Result<Vec<BuyerRecord>, Self::Error>> + Send + 'a;

  /// Overwrite every scalar attribute of a buyer and bump `updated_at`.
  /// Returns the stored record, or `None` if the buyer does not exist.
  fn replace_buyer(
    &self,
    id: Uuid,
    draft: BuyerDraft,
  ) -> impl Future<Output = Result<Option<BuyerRecord>, Self::Error>> + Send + '_;

  /// Hard-delete a buyer, returning it. `None` if it did not exist.
  fn delete_buyer(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<BuyerRecord>, Self::Error>> + Send + '_;

  // ── History (append-only) ────────────────────────────────────────────

  fn append_history(
    &self,
    entry: NewHistoryEntry,
  ) -> impl Future<Output = Result<HistoryEntry, Self::Error>> + Send + '_;

  /// The most recent `limit` entries for a buyer, newest first.
  fn list_history(
    &self,
    buyer_id: Uuid,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<HistoryEntry>, Self::Error>> + Send + '_;
}
