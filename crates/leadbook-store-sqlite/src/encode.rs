//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`
//! suffix) so that text ordering equals chronological ordering. Enumerations
//! are stored as their display strings, tags as a compact JSON array, and
//! UUIDs as hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use leadbook_core::{
  buyer::BuyerRecord,
  history::{Change, HistoryEntry},
  principal::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enumerations ────────────────────────────────────────────────────────────

pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::UnknownValue {
    column,
    value: s.to_owned(),
  })
}

// ─── Tags ────────────────────────────────────────────────────────────────────

pub fn encode_tags(tags: &[String]) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawBuyer::from_row`].
pub const BUYER_COLUMNS: &str = "buyer_id, full_name, email, phone, city, \
  property_type, bhk, purpose, budget_min, budget_max, timeline, source, \
  status, notes, tags, owner_id, created_at, updated_at";

/// Raw values read directly from a `buyers` row.
pub struct RawBuyer {
  pub buyer_id:      String,
  pub full_name:     String,
  pub email:         Option<String>,
  pub phone:         String,
  pub city:          String,
  pub property_type: String,
  pub bhk:           Option<String>,
  pub purpose:       String,
  pub budget_min:    Option<i64>,
  pub budget_max:    Option<i64>,
  pub timeline:      String,
  pub source:        String,
  pub status:        String,
  pub notes:         Option<String>,
  pub tags:          String,
  pub owner_id:      Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawBuyer {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      buyer_id:      row.get(0)?,
      full_name:     row.get(1)?,
      email:         row.get(2)?,
      phone:         row.get(3)?,
      city:          row.get(4)?,
      property_type: row.get(5)?,
      bhk:           row.get(6)?,
      purpose:       row.get(7)?,
      budget_min:    row.get(8)?,
      budget_max:    row.get(9)?,
      timeline:      row.get(10)?,
      source:        row.get(11)?,
      status:        row.get(12)?,
      notes:         row.get(13)?,
      tags:          row.get(14)?,
      owner_id:      row.get(15)?,
      created_at:    row.get(16)?,
      updated_at:    row.get(17)?,
    })
  }

  pub fn into_record(self) -> Result<BuyerRecord> {
    Ok(BuyerRecord {
      id:            decode_uuid(&self.buyer_id)?,
      full_name:     self.full_name,
      email:         self.email,
      phone:         self.phone,
      city:          decode_enum("city", &self.city)?,
      property_type: decode_enum("property_type", &self.property_type)?,
      bhk:           self
        .bhk
        .as_deref()
        .map(|b| decode_enum("bhk", b))
        .transpose()?,
      purpose:       decode_enum("purpose", &self.purpose)?,
      budget_min:    self.budget_min,
      budget_max:    self.budget_max,
      timeline:      decode_enum("timeline", &self.timeline)?,
      source:        decode_enum("source", &self.source)?,
      status:        decode_enum("status", &self.status)?,
      notes:         self.notes,
      tags:          decode_tags(&self.tags)?,
      owner_id:      decode_opt_uuid(self.owner_id)?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

/// Owned column values for an INSERT or UPDATE of a `buyers` row.
pub struct BuyerParams {
  pub buyer_id:      String,
  pub full_name:     String,
  pub email:         Option<String>,
  pub phone:         String,
  pub city:          String,
  pub property_type: String,
  pub bhk:           Option<String>,
  pub purpose:       String,
  pub budget_min:    Option<i64>,
  pub budget_max:    Option<i64>,
  pub timeline:      String,
  pub source:        String,
  pub status:        String,
  pub notes:         Option<String>,
  pub tags:          String,
  pub owner_id:      Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl BuyerParams {
  pub fn from_record(r: &BuyerRecord) -> Result<Self> {
    Ok(Self {
      buyer_id:      encode_uuid(r.id),
      full_name:     r.full_name.clone(),
      email:         r.email.clone(),
      phone:         r.phone.clone(),
      city:          r.city.to_string(),
      property_type: r.property_type.to_string(),
      bhk:           r.bhk.map(|b| b.to_string()),
      purpose:       r.purpose.to_string(),
      budget_min:    r.budget_min,
      budget_max:    r.budget_max,
      timeline:      r.timeline.to_string(),
      source:        r.source.to_string(),
      status:        r.status.to_string(),
      notes:         r.notes.clone(),
      tags:          encode_tags(&r.tags)?,
      owner_id:      r.owner_id.map(encode_uuid),
      created_at:    encode_dt(r.created_at),
      updated_at:    encode_dt(r.updated_at),
    })
  }
}

/// Column list matching [`RawUser::from_row`].
pub const USER_COLUMNS: &str = "user_id, email, name, role, password_hash, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:       String,
  pub email:         String,
  pub name:          Option<String>,
  pub role:          String,
  pub password_hash: Option<String>,
  pub created_at:    String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      email:         row.get(1)?,
      name:          row.get(2)?,
      role:          row.get(3)?,
      password_hash: row.get(4)?,
      created_at:    row.get(5)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:            decode_uuid(&self.user_id)?,
      email:         self.email,
      name:          self.name,
      role:          decode_enum("role", &self.role)?,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `buyer_history` row.
pub struct RawHistory {
  pub entry_id:   String,
  pub buyer_id:   String,
  pub changed_by: Option<String>,
  pub changed_at: String,
  pub diff:       String,
}

impl RawHistory {
  pub fn into_entry(self) -> Result<HistoryEntry> {
    let diff: Change = serde_json::from_str(&self.diff)?;
    Ok(HistoryEntry {
      id: decode_uuid(&self.entry_id)?,
      buyer_id: decode_uuid(&self.buyer_id)?,
      changed_by: decode_opt_uuid(self.changed_by)?,
      changed_at: decode_dt(&self.changed_at)?,
      diff,
    })
  }
}
