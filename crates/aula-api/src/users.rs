//! Handlers for `/users` endpoints.

use aula_core::{
  Allocator,
  catalog::{NewUser, User},
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

/// `POST /users`. Body: `{"display_name":"Ana","email":"…","role":"teacher"}`
pub async fn create<S>(
  State(allocator): State<Allocator<S>>,
  payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SlotStore + 'static,
{
  let Json(body) = payload?;
  if body.display_name.trim().is_empty() {
    return Err(ApiError::BadRequest("display_name must not be empty".into()));
  }
  let user = allocator
    .store()
    .add_user(body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /users/{id}`
pub async fn get_one<S>(
  State(allocator): State<Allocator<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError>
where
  S: SlotStore + 'static,
{
  let user = allocator
    .store()
    .get_user(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
  Ok(Json(user))
}
