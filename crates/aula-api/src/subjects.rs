//! Handlers for `/subjects` endpoints.

use aula_core::{
  Allocator,
  catalog::{NewSubject, Subject},
  store::SlotStore,
};
use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use uuid::Uuid;

use crate::error::ApiError;

/// `POST /subjects`. Body: `{"program_id":"P1","name":"Compilers","term":5}`
pub async fn create<S>(
  State(allocator): State<Allocator<S>>,
  payload: Result<Json<NewSubject>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SlotStore + 'static,
{
  let Json(body) = payload?;
  if body.program_id.is_empty() {
    return Err(ApiError::BadRequest("program_id must not be empty".into()));
  }
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("subject name must not be empty".into()));
  }
  let subject = allocator
    .store()
    .add_subject(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(subject)))
}

/// `GET /subjects/{id}`
pub async fn get_one<S>(
  State(allocator): State<Allocator<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Subject>, ApiError>
where
  S: SlotStore + 'static,
{
  let subject = allocator
    .store()
    .get_subject(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("subject {id} not found")))?;
  Ok(Json(subject))
}
