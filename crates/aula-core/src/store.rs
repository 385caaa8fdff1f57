//! The `SlotStore` trait.
//!
//! Implemented by storage backends (e.g. `aula-store-sqlite`). The
//! [`Allocator`](crate::Allocator) and the HTTP layer depend on this
//! abstraction, not on a concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Classify,
  assignment::{AssignmentSet, Claim, Teacher},
  catalog::{Group, NewGroup, NewSubject, NewUser, ProgramId, Subject, User},
};

/// Abstraction over the user store, the subject and group catalogs, and the
/// claim table.
///
/// Backends must guarantee that a slot is held by at most one teacher, and
/// that [`SlotStore::replace_assignments`] either applies a whole list or
/// nothing.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SlotStore: Send + Sync {
  type Error: std::error::Error
    + Classify
    + From<crate::Error>
    + Send
    + Sync
    + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Returns `None` if not found.
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Every teacher with its current claims, ordered by display name.
  fn list_teachers(
    &self,
  ) -> impl Future<Output = Result<Vec<Teacher>, Self::Error>> + Send + '_;

  /// Returns `None` if the id does not resolve to a teacher.
  fn get_teacher(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Teacher>, Self::Error>> + Send + '_;

  // ── Catalogs ──────────────────────────────────────────────────────────

  fn add_subject(
    &self,
    input: NewSubject,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  fn get_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  /// Active subjects whose program is exactly `program`.
  fn list_active_subjects<'a>(
    &'a self,
    program: &'a ProgramId,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + 'a;

  fn add_group(
    &self,
    input: NewGroup,
  ) -> impl Future<Output = Result<Group, Self::Error>> + Send + '_;

  fn get_group(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Group>, Self::Error>> + Send + '_;

  /// Every active group regardless of program tag.
  fn list_active_groups(
    &self,
  ) -> impl Future<Output = Result<Vec<Group>, Self::Error>> + Send + '_;

  // ── Claims ────────────────────────────────────────────────────────────

  /// Every claimed slot in `program`.
  fn claims_for_program<'a>(
    &'a self,
    program: &'a ProgramId,
  ) -> impl Future<Output = Result<Vec<Claim>, Self::Error>> + Send + 'a;

  /// Teachers holding at least one claim on `group_id`, optionally only
  /// counting claims in `program`. Each teacher appears once.
  fn teachers_for_group<'a>(
    &'a self,
    group_id: Uuid,
    program: Option<&'a ProgramId>,
  ) -> impl Future<Output = Result<Vec<Teacher>, Self::Error>> + Send + 'a;

  /// Replace a teacher's whole assignment list.
  ///
  /// Fails with [`crate::Error::UserNotFound`] or
  /// [`crate::Error::InvalidRole`] if the id is not a teacher,
  /// [`crate::Error::StaleRevision`] if `expected_revision` is set and does
  /// not match, and [`crate::Error::SlotTaken`] if any slot in the list is
  /// held by someone else. Newly claimed subjects are re-checked for
  /// [`crate::Error::InactiveSubject`] inside the same write. On failure
  /// nothing is written.
  fn replace_assignments<'a>(
    &'a self,
    teacher_id: Uuid,
    assignments: &'a AssignmentSet,
    expected_revision: Option<u64>,
  ) -> impl Future<Output = Result<Teacher, Self::Error>> + Send + 'a;

  /// Create a teacher account already holding `assignments`.
  ///
  /// The account always gets the teacher role. The insert and the claims
  /// form one write: if any slot is taken the account is not created either.
  fn register_teacher<'a>(
    &'a self,
    input: NewUser,
    assignments: &'a AssignmentSet,
  ) -> impl Future<Output = Result<Teacher, Self::Error>> + Send + 'a;
}
