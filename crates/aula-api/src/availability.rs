//! Handler for `GET /programs/{program}/availability`.

use aula_core::{
  Allocator, availability::AvailableSubject, catalog::ProgramId,
  store::SlotStore,
};
use axum::{
  Json,
  extract::{Path, State},
};

use crate::error::ApiError;

/// The subjects of `program` that still have unclaimed groups, with those
/// groups.
pub async fn handler<S>(
  State(allocator): State<Allocator<S>>,
  Path(program): Path<String>,
) -> Result<Json<Vec<AvailableSubject>>, ApiError>
where
  S: SlotStore + 'static,
{
  let program = ProgramId::new(program);
  let available = allocator
    .resolve_available(&program)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(available))
}
