//! CSV codec for Leadbook buyer import and export.
//!
//! Converts between CSV text and [`leadbook_core`] types. Pure synchronous;
//! validation, ownership and persistence stay with the caller.
//!
//! # Quick start
//!
//! ```no_run
//! use leadbook_core::buyer::Source;
//!
//! let csv = "id,fullName,email,phone\n,Asha Verma,,9876543210\n";
//! for row in leadbook_csv::parse_import(csv, 200).unwrap() {
//!   println!("line {}: {:?}", row.line, row.form.validate(Source::Import));
//! }
//! ```

pub mod error;
mod parse;
mod serialize;

pub use error::{Error, Result};
use leadbook_core::{buyer::BuyerRecord, form::BuyerForm};

/// Column order shared by export and import.
pub const COLUMNS: [&str; 18] = [
  "id",
  "fullName",
  "email",
  "phone",
  "city",
  "propertyType",
  "bhk",
  "purpose",
  "budgetMin",
  "budgetMax",
  "timeline",
  "source",
  "status",
  "notes",
  "tags",
  "ownerId",
  "createdAt",
  "updatedAt",
];

// ─── Public types ────────────────────────────────────────────────────────────

/// One data row of an import file, not yet validated.
#[derive(Debug, Clone)]
pub struct ImportRow {
  /// The physical line the record starts on; the header is line 1.
  pub line: usize,
  pub form: BuyerForm,
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Split an import file into rows.
///
/// The first record is the header and is skipped. Fails when there is no
/// header, no data row, more than `max_rows` data rows, or an unterminated
/// quoted field.
pub fn parse_import(input: &str, max_rows: usize) -> Result<Vec<ImportRow>> {
  let mut records = parse::records(input)?.into_iter();
  if records.next().is_none() {
    return Err(Error::MissingHeader);
  }

  let rows: Vec<ImportRow> = records
    .map(|r| ImportRow {
      line: r.line,
      form: parse::to_form(r.fields),
    })
    .collect();

  match rows.len() {
    0 => Err(Error::NoDataRows),
    found if found > max_rows => Err(Error::TooManyRows { found, max: max_rows }),
    _ => Ok(rows),
  }
}

/// Serialize `records` as CSV text with a header line, in the given order.
pub fn serialize(records: &[BuyerRecord]) -> String { serialize::serialize(records) }

// ─── Round-trip test ─────────────────────────────────────────────────────────


// ─── Shared test helpers ─────────────────────────────────────────────────────
