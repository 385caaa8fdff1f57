//! Handlers for `/teachers` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/teachers` | Ordered by display name |
//! | `GET`  | `/teachers/{id}` | `ETag: "r<revision>"` |
//! | `PUT`  | `/teachers/{id}/assignments` | Whole-list replace; optional `If-Match` |

use aula_core::{
  Allocator,
  assignment::{Teacher, TeacherAssignment},
  store::SlotStore,
};
use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::{HeaderMap, header},
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, etag};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /teachers`
pub async fn list<S>(
  State(allocator): State<Allocator<S>>,
) -> Result<Json<Vec<Teacher>>, ApiError>
where
  S: SlotStore + 'static,
{
  let teachers = allocator
    .store()
    .list_teachers()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(teachers))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /teachers/{id}`
pub async fn get_one<S>(
  State(allocator): State<Allocator<S>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SlotStore + 'static,
{
  let teacher = allocator
    .store()
    .get_teacher(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("teacher {id} not found")))?;
  Ok(with_etag(teacher))
}

// ─── Replace ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReplaceBody {
  pub assignments: Vec<TeacherAssignment>,
}

/// `PUT /teachers/{id}/assignments`. Body:
/// `{"assignments":[{"program_id":"P1","subject_id":"…","group_ids":["…"]}]}`
///
/// An empty list releases every slot the teacher holds.
pub async fn replace<S>(
  State(allocator): State<Allocator<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  payload: Result<Json<ReplaceBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SlotStore + 'static,
{
  let Json(body) = payload?;
  let expected = etag::expected_revision(&headers)?;
  let teacher = allocator
    .replace_assignments(id, body.assignments, expected)
    .await
    .map_err(ApiError::store)?;
  Ok(with_etag(teacher))
}

pub(crate) fn with_etag(teacher: Teacher) -> impl IntoResponse {
  let tag = etag::format_revision(teacher.revision);
  ([(header::ETAG, tag)], Json(teacher))
}
