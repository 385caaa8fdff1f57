//! Handler for `POST /registrations`: teacher self-registration.

use aula_core::{
  Allocator,
  assignment::TeacherAssignment,
  catalog::{NewUser, ProgramId, Role},
  store::SlotStore,
};
use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, teachers::with_etag};

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub display_name: String,
  pub email:        String,
  pub program_id:   ProgramId,
  pub subject_id:   Uuid,
  pub group_ids:    Vec<Uuid>,
}

/// `POST /registrations`: creates a teacher account holding one
/// (subject, groups) entry.
pub async fn create<S>(
  State(allocator): State<Allocator<S>>,
  payload: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SlotStore + 'static,
{
  let Json(body) = payload?;
  if body.display_name.trim().is_empty() {
    return Err(ApiError::BadRequest("display_name must not be empty".into()));
  }

  let user = NewUser {
    display_name: body.display_name,
    email:        body.email,
    role:         Role::Teacher,
  };
  let claim =
    TeacherAssignment::new(body.program_id, body.subject_id, body.group_ids);

  let teacher = allocator
    .register_teacher(user, claim)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, with_etag(teacher)))
}
