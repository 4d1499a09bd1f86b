//! Error types for the leadbook-csv codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("CSV file is empty")]
  MissingHeader,

  #[error("CSV file has a header but no data rows")]
  NoDataRows,

  #[error("CSV file has {found} data rows; at most {max} are allowed")]
  TooManyRows { found: usize, max: usize },

  /// A quoted field that opens on `line` never closes.
  #[error("unterminated quoted field starting on line {line}")]
  UnterminatedQuote { line: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
