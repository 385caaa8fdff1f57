//! Revision ETags for teacher resources.
//!
//! A teacher's assignment revision is exposed as the strong ETag `"r<n>"`.
//! `If-Match` on a write is turned back into the expected revision.

use axum::http::{HeaderMap, header};

use crate::error::ApiError;

pub fn format_revision(revision: u64) -> String { format!("\"r{revision}\"") }

/// Read the expected revision from `If-Match`.
///
/// Returns `None` when the header is absent or `*`. Weak validators are
/// accepted; lists of more than one tag are not.
pub fn expected_revision(headers: &HeaderMap) -> Result<Option<u64>, ApiError> {
  let Some(value) = headers.get(header::IF_MATCH) else {
    return Ok(None);
  };
  let raw = value
    .to_str()
    .map_err(|_| ApiError::BadRequest("If-Match is not valid ASCII".into()))?;
  parse_revision(raw)
}

fn parse_revision(raw: &str) -> Result<Option<u64>, ApiError> {
  let tag = raw.trim();
  if tag == "*" {
    return Ok(None);
  }
  if tag.contains(',') {
    return Err(ApiError::BadRequest(
      "If-Match must carry a single entity tag".into(),
    ));
  }

  let tag = tag.strip_prefix("W/").unwrap_or(tag);
  let tag = tag.trim_matches('"');
  let digits = tag.strip_prefix('r').unwrap_or(tag);
  digits
    .parse::<u64>()
    .map(Some)
    .map_err(|_| ApiError::BadRequest(format!("unrecognised entity tag: {raw}")))
}
