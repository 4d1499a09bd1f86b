//! Record splitter and positional row mapping for buyer imports.
//!
//! Pipeline:
//!   raw &str
//!     └─ records()   → Vec<Record>  (quote-aware, tracks start lines)
//!          └─ to_form() → BuyerForm

use std::{iter::Peekable, mem, str::Chars};

use leadbook_core::form::BuyerForm;

use crate::error::{Error, Result};

// ─── Records ─────────────────────────────────────────────────────────────────

/// One logical CSV record and the 1-based physical line it starts on.
#[derive(Debug)]
pub(crate) struct Record {
  pub line:   usize,
  pub fields: Vec<String>,
}

impl Record {
  /// A line with nothing on it but whitespace.
  fn is_blank(&self) -> bool {
    matches!(self.fields.as_slice(), [only] if only.trim().is_empty())
  }
}

/// Split `input` into records.
///
/// Fields wrapped in `"` may contain commas, doubled quotes and line breaks.
/// Both LF and CRLF endings are accepted. Blank lines are dropped but still
/// counted, so every record keeps the line number a spreadsheet would show.
pub(crate) fn records(input: &str) -> Result<Vec<Record>> {
  let input = input.strip_prefix('\u{feff}').unwrap_or(input);
  let mut chars = input.chars().peekable();
  let mut line = 1usize;
  let mut out = Vec::new();

  while chars.peek().is_some() {
    let start = line;
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;

    loop {
      match chars.next() {
        None => {
          fields.push(mem::take(&mut field));
          break;
        }
        Some('"') if field.is_empty() && !quoted => {
          quoted = true;
          read_quoted(&mut chars, &mut field, &mut line, start)?;
        }
        Some(',') => {
          fields.push(mem::take(&mut field));
          quoted = false;
        }
        Some('\r') if chars.peek() == Some(&'\n') => {}
        Some('\n') => {
          line += 1;
          fields.push(mem::take(&mut field));
          break;
        }
        Some(c) => field.push(c),
      }
    }

    let record = Record { line: start, fields };
    if quoted || !record.is_blank() {
      out.push(record);
    }
  }

  Ok(out)
}

/// Consume a quoted field body up to and including its closing quote.
fn read_quoted(
  chars: &mut Peekable<Chars<'_>>,
  field: &mut String,
  line: &mut usize,
  start: usize,
) -> Result<()> {
  loop {
    match chars.next() {
      None => return Err(Error::UnterminatedQuote { line: start }),
      Some('"') if chars.peek() == Some(&'"') => {
        chars.next();
        field.push('"');
      }
      Some('"') => return Ok(()),
      Some('\r') if chars.peek() == Some(&'\n') => {}
      Some('\n') => {
        *line += 1;
        field.push('\n');
      }
      Some(c) => field.push(c),
    }
  }
}

// ─── Row mapping ─────────────────────────────────────────────────────────────

/// Map positional fields onto a [`BuyerForm`].
///
/// Columns follow [`crate::COLUMNS`]. The id, status, owner and timestamp
/// columns are ignored; missing trailing columns are treated as empty.
pub(crate) fn to_form(fields: Vec<String>) -> BuyerForm {
  let mut cols = fields.into_iter().map(|f| {
    let f = f.trim();
    (!f.is_empty()).then(|| f.to_owned())
  });
  let mut next = || cols.next().flatten();

  let _id = next();
  let full_name = next();
  let email = next();
  let phone = next();
  let city = next();
  let property_type = next();
  let bhk = next();
  let purpose = next();
  let budget_min = next();
  let budget_max = next();
  let timeline = next();
  let source = next();
  let _status = next();
  let notes = next();
  let tags = next()
    .map(|t| t.split(',').map(|s| s.trim().to_owned()).collect())
    .unwrap_or_default();

  BuyerForm {
    full_name,
    email,
    phone,
    city,
    property_type,
    bhk,
    purpose,
    budget_min,
    budget_max,
    timeline,
    source,
    status: None,
    notes,
    tags,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn lines(input: &str) -> Vec<usize> {
    records(input).unwrap().iter().map(|r| r.line).collect()
  }

  #[test]
  fn splits_simple_records() {
    let recs = records("a,b,c\n1,2,3\n").unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[1].fields, vec!["1", "2", "3"]);
  }

  #[test]
  fn quoted_fields_keep_commas_quotes_and_newlines() {
    let recs = records("h\n\"Doe, Jane\",\"say \"\"hi\"\"\",\"two\nlines\"\nnext\n").unwrap();
    assert_eq!(recs[1].fields, vec!["Doe, Jane", "say \"hi\"", "two\nlines"]);
    assert_eq!(recs[2].fields, vec!["next"]);
  }

  #[test]
  fn line_numbers_count_blank_and_embedded_lines() {
    assert_eq!(lines("h\n\na\n\"x\ny\"\nb"), vec![1, 3, 4, 6]);
  }

  #[test]
  fn crlf_endings_are_accepted() {
    let recs = records("h1,h2\r\nv1,v2\r\n").unwrap();
    assert_eq!(recs[1].fields, vec!["v1", "v2"]);
  }

  #[test]
  fn crlf_inside_quotes_becomes_lf() {
    let recs = records("h\r\n\"a\r\nb\",c\r\nnext\r\n").unwrap();
    assert_eq!(recs[1].fields, vec!["a\nb", "c"]);
    assert_eq!(recs[1].line, 2);
    assert_eq!(recs[2].line, 4);
  }

  #[test]
  fn lone_carriage_return_in_quotes_is_kept() {
    let recs = records("h\n\"a\rb\"\n").unwrap();
    assert_eq!(recs[1].fields, vec!["a\rb"]);
  }

  #[test]
  fn byte_order_mark_is_stripped() {
    let recs = records("\u{feff}id,fullName\n").unwrap();
    assert_eq!(recs[0].fields[0], "id");
  }

  #[test]
  fn whitespace_only_lines_are_skipped() {
    assert_eq!(lines("h\n   \nrow\n"), vec![1, 3]);
  }

  #[test]
  fn unterminated_quote_is_an_error() {
    let err = records("h\n\"open,1\n").unwrap_err();
    assert!(matches!(err, Error::UnterminatedQuote { line: 2 }));
  }

  #[test]
  fn to_form_maps_columns_by_position() {
    let fields = [
      "ignored-id", " Asha ", "", "9876543210", "Mohali", "Villa", "3", "Buy",
      "100", "200", "3-6m", "", "Converted", "likes parks", "hot, corner ,",
    ]
    .map(String::from)
    .to_vec();
    let form = to_form(fields);

    assert_eq!(form.full_name.as_deref(), Some("Asha"));
    assert_eq!(form.email, None);
    assert_eq!(form.bhk.as_deref(), Some("3"));
    assert_eq!(form.source, None);
    assert_eq!(form.status, None);
    assert_eq!(form.tags, vec!["hot", "corner", ""]);
  }

  #[test]
  fn to_form_tolerates_short_rows() {
    let form = to_form(vec!["".into(), "Only Name".into()]);
    assert_eq!(form.full_name.as_deref(), Some("Only Name"));
    assert_eq!(form.phone, None);
    assert!(form.tags.is_empty());
  }
}
