//! Bulk transfer: CSV import and export of buyers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/buyers/import` | Multipart field `file`; partial success |
//! | `GET`  | `/buyers/export` | Same filters as `/buyers`; `text/csv` attachment |

use axum::{
  Json,
  extract::{
    Multipart, Query, State,
    multipart::MultipartRejection,
    rejection::QueryRejection,
  },
  http::header,
  response::IntoResponse,
};
use chrono::Utc;
use leadbook_core::{
  Error, FieldErrors,
  buyer::{BuyerRecord, Source, Status},
  principal::Principal,
  records,
  store::LeadStore,
};
use leadbook_csv::ImportRow;
use serde::Serialize;

use crate::{AppState, auth::CurrentPrincipal, buyers::BuyerParams, error::ApiError};

pub const FILE_FIELD: &str = "file";

// ─── Import outcome ──────────────────────────────────────────────────────────

/// Why one import row was not saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
  /// The physical line the row starts on; the header is line 1.
  pub row:    usize,
  pub errors: FieldErrors,
}

impl RowFailure {
  /// `Row <n>: <field>: <message>, ...`
  pub fn message(&self) -> String { format!("Row {}: {}", self.row, self.errors) }
}

/// Everything that happened to an import file, row by row.
#[derive(Debug, Default)]
pub struct ImportOutcome {
  pub created:  Vec<BuyerRecord>,
  pub failures: Vec<RowFailure>,
}

/// Wire summary of an [`ImportOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
  pub success: usize,
  pub failed:  usize,
  pub errors:  Vec<String>,
}

impl ImportOutcome {
  pub fn report(&self) -> ImportReport {
    ImportReport {
      success: self.created.len(),
      failed:  self.failures.len(),
      errors:  self.failures.iter().map(RowFailure::message).collect(),
    }
  }
}

/// Validate and insert `rows` in file order on behalf of `principal`.
///
/// Each row stands alone: a validation or store failure is recorded against
/// that row and the rest of the file is still processed. Rows already saved
/// stay saved.
pub async fn import_rows<S: LeadStore>(
  store: &S,
  principal: &Principal,
  rows: Vec<ImportRow>,
) -> ImportOutcome {
  let mut outcome = ImportOutcome::default();

  for ImportRow { line, form } in rows {
    let saved = match form.validate(Source::Import) {
      Ok(mut draft) => {
        draft.status = Status::New;
        records::insert(store, principal, draft).await
      }
      Err(errors) => Err(Error::Validation(errors)),
    };

    match saved {
      Ok(record) => outcome.created.push(record),
      Err(Error::Validation(errors)) => outcome.failures.push(RowFailure { row: line, errors }),
      Err(e) => {
        tracing::error!(row = line, error = %e, "import row not saved");
        outcome.failures.push(RowFailure {
          row:    line,
          errors: FieldErrors::single("store", "could not save row"),
        });
      }
    }
  }

  outcome
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// Read the text of the `file` part of a multipart body.
async fn read_file(multipart: &mut Multipart) -> Result<String, ApiError> {
  while let Some(field) = multipart.next_field().await? {
    if field.name() == Some(FILE_FIELD) {
      return Ok(field.text().await?);
    }
  }
  Err(Error::Validation(FieldErrors::single(FILE_FIELD, "A CSV file is required")).into())
}

/// `POST /buyers/import`
pub async fn import<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImportReport>, ApiError>
where
  S: LeadStore + Clone + 'static,
{
  let text = read_file(&mut multipart?).await?;
  let rows = leadbook_csv::parse_import(&text, state.config.import_max_rows)
    .map_err(|e| Error::Validation(FieldErrors::single(FILE_FIELD, e.to_string())))?;

  let outcome = import_rows(state.store.as_ref(), &principal, rows).await;
  let report = outcome.report();
  tracing::info!(
    by = %principal.id,
    success = report.success,
    failed = report.failed,
    "buyers imported"
  );
  Ok(Json(report))
}

/// `attachment; filename="buyers-<scope>-<date>.csv"`
pub fn export_disposition(principal: &Principal) -> String {
  let scope = if principal.is_admin() { "admin-all" } else { "user-owned" };
  format!(
    "attachment; filename=\"buyers-{scope}-{}.csv\"",
    Utc::now().format("%Y-%m-%d")
  )
}

/// `GET /buyers/export`
pub async fn export<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  params: Result<Query<BuyerParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LeadStore + Clone + 'static,
{
  let Query(params) = params?;
  let filter = params.filter()?;
  let buyers = records::export(state.store.as_ref(), &principal, filter).await?;
  tracing::info!(by = %principal.id, count = buyers.len(), "buyers exported");

  Ok((
    [
      (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
      (header::CONTENT_DISPOSITION, export_disposition(&principal)),
    ],
    leadbook_csv::serialize(&buyers),
  ))
}
