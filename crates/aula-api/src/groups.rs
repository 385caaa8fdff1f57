//! Handlers for `/groups` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/groups` | Body: `{"program_tag":"P1","name":"5A","shift":"morning","cycle":"2024-3"}` |
//! | `GET`  | `/groups/{id}` | 404 if not found |
//! | `GET`  | `/groups/{id}/teachers` | Optional `?program_id=P1` |

use aula_core::{
  Allocator,
  assignment::Teacher,
  catalog::{Group, NewGroup, ProgramId},
  store::SlotStore,
};
use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /groups`. The program tag is stored exactly as given.
pub async fn create<S>(
  State(allocator): State<Allocator<S>>,
  payload: Result<Json<NewGroup>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SlotStore + 'static,
{
  let Json(body) = payload?;
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("group name must not be empty".into()));
  }
  let group = allocator
    .store()
    .add_group(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(group)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /groups/{id}`
pub async fn get_one<S>(
  State(allocator): State<Allocator<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Group>, ApiError>
where
  S: SlotStore + 'static,
{
  let group = allocator
    .store()
    .get_group(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("group {id} not found")))?;
  Ok(Json(group))
}

// ─── Roster ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RosterParams {
  pub program_id: Option<ProgramId>,
}

/// `GET /groups/{id}/teachers[?program_id=<program>]`
pub async fn roster<S>(
  State(allocator): State<Allocator<S>>,
  Path(id): Path<Uuid>,
  query: Result<Query<RosterParams>, QueryRejection>,
) -> Result<Json<Vec<Teacher>>, ApiError>
where
  S: SlotStore + 'static,
{
  let Query(params) = query?;
  if let Some(program) = &params.program_id
    && program.is_empty()
  {
    return Err(ApiError::BadRequest("program_id must not be blank".into()));
  }
  let teachers = allocator
    .teachers_for_group(id, params.program_id.as_ref())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(teachers))
}
