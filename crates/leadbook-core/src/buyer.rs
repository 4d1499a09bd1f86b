//! Buyer records, the unit of work of the Leadbook store.
//!
//! Every enumerated attribute is a closed set. The string forms (used on the
//! wire, in CSV files, and in database columns) come from the `strum` and
//! `serde` attributes below and must stay in sync.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};
use uuid::Uuid;

// ─── Enumerations ────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  Display, EnumString, IntoStaticStr, VariantNames,
)]
#[strum(ascii_case_insensitive)]
pub enum City {
  #[default]
  Chandigarh,
  Mohali,
  Zirakpur,
  Panchkula,
  Other,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  Display, EnumString, IntoStaticStr, VariantNames,
)]
#[strum(ascii_case_insensitive)]
pub enum PropertyType {
  #[default]
  Apartment,
  Villa,
  Plot,
  Office,
  Retail,
}

impl PropertyType {
  /// Residential types that must carry a bedroom count.
  pub fn requires_bhk(self) -> bool { matches!(self, Self::Apartment | Self::Villa) }
}

/// Bedroom count.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  Display, EnumString, IntoStaticStr, VariantNames,
)]
#[strum(ascii_case_insensitive)]
pub enum Bhk {
  #[serde(rename = "1")]
  #[strum(serialize = "1")]
  One,
  #[serde(rename = "2")]
  #[strum(serialize = "2")]
  Two,
  #[serde(rename = "3")]
  #[strum(serialize = "3")]
  Three,
  #[serde(rename = "4")]
  #[strum(serialize = "4")]
  Four,
  Studio,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  Display, EnumString, IntoStaticStr, VariantNames,
)]
#[strum(ascii_case_insensitive)]
pub enum Purpose {
  #[default]
  Buy,
  Rent,
}

/// How soon the buyer intends to close.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  Display, EnumString, IntoStaticStr, VariantNames,
)]
#[strum(ascii_case_insensitive)]
pub enum Timeline {
  #[default]
  #[serde(rename = "0-3m")]
  #[strum(serialize = "0-3m")]
  ZeroToThreeMonths,
  #[serde(rename = "3-6m")]
  #[strum(serialize = "3-6m")]
  ThreeToSixMonths,
  #[serde(rename = ">6m")]
  #[strum(serialize = ">6m")]
  MoreThanSixMonths,
  Exploring,
}

/// Where the lead came from.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  Display, EnumString, IntoStaticStr, VariantNames,
)]
#[strum(ascii_case_insensitive)]
pub enum Source {
  Website,
  Referral,
  #[serde(rename = "Walk-in")]
  #[strum(serialize = "Walk-in")]
  WalkIn,
  Call,
  Import,
  Other,
}

/// Pipeline stage of a lead.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  Display, EnumString, IntoStaticStr, VariantNames,
)]
#[strum(ascii_case_insensitive)]
pub enum Status {
  #[default]
  New,
  Qualified,
  Contacted,
  Visited,
  Negotiation,
  Converted,
  Dropped,
}

// ─── BuyerDraft ──────────────────────────────────────────────────────────────

/// Validated scalar attributes of a buyer, ready to be persisted.
///
/// Produced only by [`crate::form::BuyerForm::validate`], so every draft
/// already satisfies the bhk and budget invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyerDraft {
  pub full_name:     String,
  pub email:         Option<String>,
  pub phone:         String,
  pub city:          City,
  pub property_type: PropertyType,
  pub bhk:           Option<Bhk>,
  pub purpose:       Purpose,
  pub budget_min:    Option<i64>,
  pub budget_max:    Option<i64>,
  pub timeline:      Timeline,
  pub source:        Source,
  pub status:        Status,
  pub notes:         Option<String>,
  pub tags:          Vec<String>,
}

// ─── BuyerRecord ─────────────────────────────────────────────────────────────

/// A persisted buyer lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerRecord {
  pub id:            Uuid,
  pub full_name:     String,
  pub email:         Option<String>,
  pub phone:         String,
  pub city:          City,
  pub property_type: PropertyType,
  pub bhk:           Option<Bhk>,
  pub purpose:       Purpose,
  pub budget_min:    Option<i64>,
  pub budget_max:    Option<i64>,
  pub timeline:      Timeline,
  pub source:        Source,
  pub status:        Status,
  pub notes:         Option<String>,
  pub tags:          Vec<String>,
  /// `None` once the owning user has been removed without a transfer target.
  pub owner_id:      Option<Uuid>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

impl BuyerRecord {
  /// Assemble a new record from a draft. Both timestamps are set to `now`.
  pub fn from_draft(
    id: Uuid,
    draft: BuyerDraft,
    owner_id: Option<Uuid>,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      id,
      full_name: draft.full_name,
      email: draft.email,
      phone: draft.phone,
      city: draft.city,
      property_type: draft.property_type,
      bhk: draft.bhk,
      purpose: draft.purpose,
      budget_min: draft.budget_min,
      budget_max: draft.budget_max,
      timeline: draft.timeline,
      source: draft.source,
      status: draft.status,
      notes: draft.notes,
      tags: draft.tags,
      owner_id,
      created_at: now,
      updated_at: now,
    }
  }

  /// Replace every scalar attribute with `draft`, keeping identity,
  /// ownership and `created_at`.
  pub fn replaced_with(&self, draft: BuyerDraft, now: DateTime<Utc>) -> Self {
    Self {
      created_at: self.created_at,
      ..Self::from_draft(self.id, draft, self.owner_id, now)
    }
  }
}
