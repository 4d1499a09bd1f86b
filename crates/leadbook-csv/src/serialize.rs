//! Buyer export serializer.
//!
//! One header line, then one line per record, all ending in `\n`.

use chrono::SecondsFormat;
use leadbook_core::buyer::BuyerRecord;

use crate::COLUMNS;

// ─── Field escaping ──────────────────────────────────────────────────────────

/// Quote `s` when it holds a delimiter, quote or line break, doubling any
/// inner quotes.
pub(crate) fn escape_field(s: &str) -> String {
  if s.contains([',', '"', '\r', '\n']) {
    format!("\"{}\"", s.replace('"', "\"\""))
  } else {
    s.to_owned()
  }
}

fn opt<T: ToString>(v: Option<T>) -> String {
  v.map(|v| v.to_string()).unwrap_or_default()
}

// ─── Records ─────────────────────────────────────────────────────────────────

fn row(r: &BuyerRecord) -> Vec<String> {
  vec![
    r.id.to_string(),
    r.full_name.clone(),
    opt(r.email.as_deref()),
    r.phone.clone(),
    r.city.to_string(),
    r.property_type.to_string(),
    opt(r.bhk),
    r.purpose.to_string(),
    opt(r.budget_min),
    opt(r.budget_max),
    r.timeline.to_string(),
    r.source.to_string(),
    r.status.to_string(),
    opt(r.notes.as_deref()),
    r.tags.join(","),
    opt(r.owner_id),
    r.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    r.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
  ]
}

pub(crate) fn serialize(records: &[BuyerRecord]) -> String {
  let mut out = COLUMNS.join(",");
  out.push('\n');

  for r in records {
    let line = row(r)
      .iter()
      .map(|f| escape_field(f))
      .collect::<Vec<_>>()
      .join(",");
    out.push_str(&line);
    out.push('\n');
  }

  out
}
