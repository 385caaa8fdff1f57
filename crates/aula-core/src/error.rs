//! Error types for `aula-core`.
//!
//! Every error type in the workspace reports an [`ErrorKind`] through
//! [`Classify`], so the transport layer can pick a status without knowing the
//! concrete backend.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  assignment::Slot,
  catalog::{ProgramId, Role},
};

// ─── Kinds ───────────────────────────────────────────────────────────────────

/// The coarse failure taxonomy shared by the allocator, stores and API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  /// A referenced teacher, user, subject or group does not exist.
  NotFound,
  /// The target user does not carry the teacher role.
  InvalidRole,
  /// Caller-supplied input is malformed.
  Validation,
  /// A slot is already held by another teacher.
  Conflict,
  /// An optimistic concurrency token did not match.
  PreconditionFailed,
  /// The store could not be reached or did not answer in time. Retry the
  /// whole operation.
  Unavailable,
  /// Stored data could not be decoded.
  Internal,
}

/// Maps an error onto the shared [`ErrorKind`] taxonomy.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

// ─── Error ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("subject not found: {0}")]
  SubjectNotFound(Uuid),

  #[error("group not found: {0}")]
  GroupNotFound(Uuid),

  #[error("user {user_id} has role {role}, expected teacher")]
  InvalidRole { user_id: Uuid, role: Role },

  #[error("program id must not be empty")]
  EmptyProgramId,

  #[error("subject {subject_id} is assigned twice in program {program_id}")]
  DuplicateAssignment {
    program_id: ProgramId,
    subject_id: Uuid,
  },

  #[error("assignment for subject {0} lists no groups")]
  EmptyGroupSet(Uuid),

  #[error("group {group_id} is listed twice for subject {subject_id}")]
  DuplicateGroup { subject_id: Uuid, group_id: Uuid },

  #[error("subject {subject_id} does not belong to program {program_id}")]
  SubjectOutsideProgram {
    subject_id: Uuid,
    program_id: ProgramId,
  },

  #[error("subject {0} is not active")]
  InactiveSubject(Uuid),

  #[error("group {group_id} does not belong to program {program_id}")]
  GroupOutsideProgram {
    group_id:   Uuid,
    program_id: ProgramId,
  },

  #[error("slot {slot} is already claimed by teacher {held_by}")]
  SlotTaken { slot: Slot, held_by: Uuid },

  #[error("teacher {teacher_id} is at revision {actual}, expected {expected}")]
  StaleRevision {
    teacher_id: Uuid,
    expected:   u64,
    actual:     u64,
  },

  #[error("{0} timed out")]
  TimedOut(&'static str),
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::UserNotFound(_)
      | Self::SubjectNotFound(_)
      | Self::GroupNotFound(_) => ErrorKind::NotFound,
      Self::InvalidRole { .. } => ErrorKind::InvalidRole,
      Self::EmptyProgramId
      | Self::DuplicateAssignment { .. }
      | Self::EmptyGroupSet(_)
      | Self::DuplicateGroup { .. }
      | Self::SubjectOutsideProgram { .. }
      | Self::InactiveSubject(_)
      | Self::GroupOutsideProgram { .. } => ErrorKind::Validation,
      Self::SlotTaken { .. } => ErrorKind::Conflict,
      Self::StaleRevision { .. } => ErrorKind::PreconditionFailed,
      Self::TimedOut(_) => ErrorKind::Unavailable,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
