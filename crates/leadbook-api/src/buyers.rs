//! Handlers for `/buyers` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/buyers` | `?page&limit&search&city&status&propertyType` |
//! | `POST`   | `/buyers` | Body: buyer form; 201 |
//! | `GET`    | `/buyers/{id}` | 404 if not found |
//! | `PUT`    | `/buyers/{id}` | Full replace; owner or admin |
//! | `DELETE` | `/buyers/{id}` | Owner or admin; returns the deleted record |
//! | `GET`    | `/buyers/{id}/history` | `?limit` |

use std::str::FromStr;

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use leadbook_core::{
  Error, FieldErrors,
  buyer::{BuyerRecord, City, PropertyType, Source, Status},
  form::BuyerForm,
  history::HistoryEntry,
  records,
  store::{BuyerFilter, LeadStore, Page},
};
use serde::Deserialize;
use strum::VariantNames;
use uuid::Uuid;

use crate::{AppState, auth::CurrentPrincipal, error::ApiError};

// ─── Query parameters ────────────────────────────────────────────────────────

/// Listing and export filters. Paging is ignored by export.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerParams {
  pub page:          Option<u32>,
  pub limit:         Option<u32>,
  pub search:        Option<String>,
  pub city:          Option<String>,
  pub status:        Option<String>,
  pub property_type: Option<String>,
}

fn filter_value<T>(errors: &mut FieldErrors, field: &str, raw: &Option<String>) -> Option<T>
where
  T: FromStr + VariantNames,
{
  let raw = raw.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
  T::from_str(raw)
    .map_err(|_| errors.push(field, format!("must be one of {}", T::VARIANTS.join(", "))))
    .ok()
}

impl BuyerParams {
  /// Parse the enumerated filters; an unknown value is a validation error.
  pub fn filter(&self) -> Result<BuyerFilter, Error> {
    let mut errors = FieldErrors::new();
    let filter = BuyerFilter {
      search:        self
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned),
      city:          filter_value::<City>(&mut errors, "city", &self.city),
      status:        filter_value::<Status>(&mut errors, "status", &self.status),
      property_type: filter_value::<PropertyType>(
        &mut errors,
        "propertyType",
        &self.property_type,
      ),
      owner_id:      None,
    };
    errors.into_result()?;
    Ok(filter)
  }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
  pub limit: Option<u32>,
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /buyers`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  params: Result<Query<BuyerParams>, QueryRejection>,
) -> Result<Json<Page<BuyerRecord>>, ApiError>
where
  S: LeadStore + Clone + 'static,
{
  let Query(params) = params?;
  let filter = params.filter()?;
  let page = records::list(
    state.store.as_ref(),
    &principal,
    filter,
    params.page,
    params.limit,
  )
  .await?;
  Ok(Json(page))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /buyers`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  body: Result<Json<BuyerForm>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LeadStore + Clone + 'static,
{
  let Json(form) = body?;
  let record =
    records::create(state.store.as_ref(), &principal, &form, Source::Website).await?;
  Ok((StatusCode::CREATED, Json(record)))
}

// ─── Single record ───────────────────────────────────────────────────────────

/// `GET /buyers/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(_): CurrentPrincipal,
  id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<BuyerRecord>, ApiError>
where
  S: LeadStore + Clone + 'static,
{
  let Path(id) = id?;
  Ok(Json(records::get(state.store.as_ref(), id).await?))
}

/// `PUT /buyers/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  id: Result<Path<Uuid>, PathRejection>,
  body: Result<Json<BuyerForm>, JsonRejection>,
) -> Result<Json<BuyerRecord>, ApiError>
where
  S: LeadStore + Clone + 'static,
{
  let Path(id) = id?;
  let Json(form) = body?;
  let record = records::update(state.store.as_ref(), &principal, id, &form).await?;
  Ok(Json(record))
}

/// `DELETE /buyers/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<BuyerRecord>, ApiError>
where
  S: LeadStore + Clone + 'static,
{
  let Path(id) = id?;
  let record = records::delete(state.store.as_ref(), &principal, id).await?;
  Ok(Json(record))
}

/// `GET /buyers/{id}/history`
pub async fn history<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(_): CurrentPrincipal,
  id: Result<Path<Uuid>, PathRejection>,
  params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError>
where
  S: LeadStore + Clone + 'static,
{
  let Path(id) = id?;
  let Query(params) = params?;
  let entries = records::history(state.store.as_ref(), id, params.limit).await?;
  Ok(Json(entries))
}
