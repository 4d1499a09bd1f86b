//! [`SqliteStore`]: the SQLite implementation of [`LeadStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use leadbook_core::{
  buyer::{BuyerDraft, BuyerRecord},
  history::{HistoryEntry, NewHistoryEntry},
  principal::{NewUser, Role, User, UserRemoval, normalize_email},
  store::{BuyerFilter, BuyerQuery, LeadStore, Page},
};

use crate::{
  Error, Result,
  encode::{
    BUYER_COLUMNS, BuyerParams, RawBuyer, RawHistory, RawUser, USER_COLUMNS, encode_dt,
    encode_uuid, now,
  },
  schema::SCHEMA,
};

/// Shared predicate for listing, counting and export. Every parameter is
/// bound on each query; a NULL parameter disables its clause.
const FILTER_WHERE: &str = "WHERE (?1 IS NULL
         OR full_name LIKE ?1 ESCAPE '\\'
         OR phone     LIKE ?1 ESCAPE '\\'
         OR email     LIKE ?1 ESCAPE '\\')
     AND (?2 IS NULL OR city          = ?2)
     AND (?3 IS NULL OR status        = ?3)
     AND (?4 IS NULL OR property_type = ?4)
     AND (?5 IS NULL OR owner_id      = ?5)";

const BUYER_ORDER: &str = "ORDER BY updated_at DESC, rowid DESC";

/// Encoded [`BuyerFilter`] values, in `FILTER_WHERE` parameter order.
struct FilterParams {
  pattern:       Option<String>,
  city:          Option<String>,
  status:        Option<String>,
  property_type: Option<String>,
  owner_id:      Option<String>,
}

impl FilterParams {
  fn new(filter: &BuyerFilter) -> Self {
    Self {
      pattern:       filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(like_pattern),
      city:          filter.city.map(|c| c.to_string()),
      status:        filter.status.map(|s| s.to_string()),
      property_type: filter.property_type.map(|p| p.to_string()),
      owner_id:      filter.owner_id.map(encode_uuid),
    }
  }
}

/// Wrap `term` in `%` wildcards, escaping any LIKE metacharacters it holds.
fn like_pattern(term: &str) -> String {
  let mut out = String::with_capacity(term.len() + 2);
  out.push('%');
  for c in term.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Leadbook store backed by a single SQLite file.
///
/// Clones share one reference-counted connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert a brand-new buyer row.
  async fn insert_row(&self, record: &BuyerRecord) -> Result<()> {
    let p = BuyerParams::from_record(record)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO buyers (
             buyer_id, full_name, email, phone, city, property_type, bhk,
             purpose, budget_min, budget_max, timeline, source, status,
             notes, tags, owner_id, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                     ?14, ?15, ?16, ?17, ?18)",
          rusqlite::params![
            p.buyer_id,
            p.full_name,
            p.email,
            p.phone,
            p.city,
            p.property_type,
            p.bhk,
            p.purpose,
            p.budget_min,
            p.budget_max,
            p.timeline,
            p.source,
            p.status,
            p.notes,
            p.tags,
            p.owner_id,
            p.created_at,
            p.updated_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Overwrite the mutable columns of an existing row. Owner and
  /// `created_at` are never touched. Returns `false` if the row is gone.
  async fn update_row(&self, record: &BuyerRecord) -> Result<bool> {
    let p = BuyerParams::from_record(record)?;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE buyers SET
             full_name     = ?2,
             email         = ?3,
             phone         = ?4,
             city          = ?5,
             property_type = ?6,
             bhk           = ?7,
             purpose       = ?8,
             budget_min    = ?9,
             budget_max    = ?10,
             timeline      = ?11,
             source        = ?12,
             status        = ?13,
             notes         = ?14,
             tags          = ?15,
             updated_at    = ?16
           WHERE buyer_id = ?1",
          rusqlite::params![
            p.buyer_id,
            p.full_name,
            p.email,
            p.phone,
            p.city,
            p.property_type,
            p.bhk,
            p.purpose,
            p.budget_min,
            p.budget_max,
            p.timeline,
            p.source,
            p.status,
            p.notes,
            p.tags,
            p.updated_at,
          ],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }
}

// ─── LeadStore impl ──────────────────────────────────────────────────────────

impl LeadStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      id:            Uuid::new_v4(),
      email:         normalize_email(&input.email),
      name:          input.name,
      role:          input.role,
      password_hash: input.password_hash,
      created_at:    now(),
    };

    let id_str   = encode_uuid(user.id);
    let email    = user.email.clone();
    let name     = user.name.clone();
    let role_str = user.role.to_string();
    let hash     = user.password_hash.clone();
    let at_str   = encode_dt(user.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO users (user_id, email, name, role, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, email, name, role_str, hash, at_str],
        );
        match res {
          Ok(_) => Ok(true),
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
          {
            Ok(false)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(Error::DuplicateEmail(user.email));
    }
    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
            rusqlite::params![id_str],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn find_user_by_email<'a>(&'a self, email: &'a str) -> Result<Option<User>> {
    let email = normalize_email(email);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            rusqlite::params![email],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>> {
    let id_str   = encode_uuid(id);
    let role_str = role.to_string();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET role = ?2 WHERE user_id = ?1",
          rusqlite::params![id_str, role_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_user(id).await
  }

  async fn remove_user(
    &self,
    id: Uuid,
    transfer_to: Option<Uuid>,
  ) -> Result<Option<UserRemoval>> {
    let Some(user) = self.get_user(id).await? else {
      return Ok(None);
    };

    let id_str       = encode_uuid(id);
    let transfer_str = transfer_to.map(encode_uuid);

    let (removed, buyers) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let buyers = tx.execute(
          "UPDATE buyers SET owner_id = ?2 WHERE owner_id = ?1",
          rusqlite::params![id_str, transfer_str],
        )?;
        tx.execute(
          "UPDATE buyer_history SET changed_by = NULL WHERE changed_by = ?1",
          rusqlite::params![id_str],
        )?;
        let removed =
          tx.execute("DELETE FROM users WHERE user_id = ?1", rusqlite::params![id_str])?;
        tx.commit()?;
        Ok((removed, buyers))
      })
      .await?;

    // Raced with a concurrent removal; the transaction still ran harmlessly.
    if removed == 0 {
      return Ok(None);
    }

    Ok(Some(UserRemoval {
      user,
      transferred_to: transfer_to,
      buyers,
    }))
  }

  // ── Buyers ────────────────────────────────────────────────────────────────

  async fn insert_buyer(
    &self,
    draft: BuyerDraft,
    owner_id: Option<Uuid>,
  ) -> Result<BuyerRecord> {
    let record = BuyerRecord::from_draft(Uuid::new_v4(), draft, owner_id, now());
    self.insert_row(&record).await?;
    Ok(record)
  }

  async fn get_buyer(&self, id: Uuid) -> Result<Option<BuyerRecord>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawBuyer> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {BUYER_COLUMNS} FROM buyers WHERE buyer_id = ?1"),
            rusqlite::params![id_str],
            RawBuyer::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawBuyer::into_record).transpose()
  }

  async fn list_buyers<'a>(&'a self, query: &'a BuyerQuery) -> Result<Page<BuyerRecord>> {
    let f          = FilterParams::new(&query.filter);
    let limit_val  = i64::from(query.limit);
    let offset_val = i64::try_from(query.offset()).unwrap_or(i64::MAX);

    let (total, raws): (i64, Vec<RawBuyer>) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM buyers {FILTER_WHERE}"),
          rusqlite::params![f.pattern, f.city, f.status, f.property_type, f.owner_id],
          |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {BUYER_COLUMNS} FROM buyers {FILTER_WHERE} {BUYER_ORDER}
           LIMIT ?6 OFFSET ?7"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              f.pattern,
              f.city,
              f.status,
              f.property_type,
              f.owner_id,
              limit_val,
              offset_val,
            ],
            RawBuyer::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total, rows))
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawBuyer::into_record)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(items, u64::try_from(total).unwrap_or_default(), query))
  }

  async fn export_buyers<'a>(&'a self, filter: &'a BuyerFilter) -> Result<Vec<BuyerRecord>> {
    let f = FilterParams::new(filter);

    let raws: Vec<RawBuyer> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {BUYER_COLUMNS} FROM buyers {FILTER_WHERE} {BUYER_ORDER}"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![f.pattern, f.city, f.status, f.property_type, f.owner_id],
            RawBuyer::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBuyer::into_record).collect()
  }

  async fn replace_buyer(&self, id: Uuid, draft: BuyerDraft) -> Result<Option<BuyerRecord>> {
    let Some(current) = self.get_buyer(id).await? else {
      return Ok(None);
    };

    // Zero rows changed means a concurrent delete got there first.
    let record = current.replaced_with(draft, now());
    Ok(self.update_row(&record).await?.then_some(record))
  }

  async fn delete_buyer(&self, id: Uuid) -> Result<Option<BuyerRecord>> {
    let Some(record) = self.get_buyer(id).await? else {
      return Ok(None);
    };

    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM buyers WHERE buyer_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    Ok((deleted > 0).then_some(record))
  }

  // ── History (append-only) ────────────────────────────────────────────────

  async fn append_history(&self, entry: NewHistoryEntry) -> Result<HistoryEntry> {
    let entry = HistoryEntry {
      id:         Uuid::new_v4(),
      buyer_id:   entry.buyer_id,
      changed_by: entry.changed_by,
      changed_at: now(),
      diff:       entry.diff,
    };

    let id_str    = encode_uuid(entry.id);
    let buyer_str = encode_uuid(entry.buyer_id);
    let by_str    = entry.changed_by.map(encode_uuid);
    let at_str    = encode_dt(entry.changed_at);
    let diff_str  = serde_json::to_string(&entry.diff)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO buyer_history (entry_id, buyer_id, changed_by, changed_at, diff)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, buyer_str, by_str, at_str, diff_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(entry)
  }

  async fn list_history(&self, buyer_id: Uuid, limit: u32) -> Result<Vec<HistoryEntry>> {
    let buyer_str = encode_uuid(buyer_id);
    let limit_val = i64::from(limit);

    let raws: Vec<RawHistory> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT entry_id, buyer_id, changed_by, changed_at, diff
           FROM buyer_history
           WHERE buyer_id = ?1
           ORDER BY changed_at DESC, rowid DESC
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![buyer_str, limit_val], |row| {
            Ok(RawHistory {
              entry_id:   row.get(0)?,
              buyer_id:   row.get(1)?,
              changed_by: row.get(2)?,
              changed_at: row.get(3)?,
              diff:       row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHistory::into_entry).collect()
  }
}
