//! [`Allocator`]: the read and write operations of the slot allocator,
//! driven against any [`SlotStore`].

use std::{future::Future, sync::Arc, time::Duration};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Classify, Error, ErrorKind,
  assignment::{AssignmentSet, Teacher, TeacherAssignment},
  availability::{self, AvailableSubject},
  catalog::{NewUser, ProgramId, Role, User},
  legacy::ProgramMatcher,
  store::SlotStore,
};

/// Resolves availability and applies assignment changes.
///
/// Cloning is cheap; the store and matcher are shared.
pub struct Allocator<S> {
  store:        Arc<S>,
  matcher:      Arc<ProgramMatcher>,
  read_timeout: Option<Duration>,
}

impl<S> Clone for Allocator<S> {
  fn clone(&self) -> Self {
    Self {
      store:        Arc::clone(&self.store),
      matcher:      Arc::clone(&self.matcher),
      read_timeout: self.read_timeout,
    }
  }
}

impl<S: SlotStore> Allocator<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      matcher: Arc::new(ProgramMatcher::default()),
      read_timeout: None,
    }
  }

  /// Replace the legacy program-tag rule.
  pub fn with_matcher(mut self, matcher: ProgramMatcher) -> Self {
    self.matcher = Arc::new(matcher);
    self
  }

  /// Bound every individual store read. A read that runs past `limit` fails
  /// the whole operation with [`Error::TimedOut`].
  pub fn with_read_timeout(mut self, limit: Duration) -> Self {
    self.read_timeout = Some(limit);
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn matcher(&self) -> &ProgramMatcher { &self.matcher }

  async fn read<T, F>(&self, what: &'static str, fut: F) -> Result<T, S::Error>
  where
    F: Future<Output = Result<T, S::Error>>,
  {
    match self.read_timeout {
      None => fut.await,
      Some(limit) => tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| S::Error::from(Error::TimedOut(what)))?,
    }
  }

  // ── Availability ──────────────────────────────────────────────────────

  /// The subjects of `program` that still have unclaimed groups, each with
  /// its free groups.
  ///
  /// Recomputed from the store on every call. The three reads run
  /// concurrently; if any of them fails the whole call fails.
  pub async fn resolve_available(
    &self,
    program: &ProgramId,
  ) -> Result<Vec<AvailableSubject>, S::Error> {
    if program.is_empty() {
      return Err(Error::EmptyProgramId.into());
    }

    let (subjects, groups, claims) = tokio::try_join!(
      self.read("subject catalog read", self.store.list_active_subjects(program)),
      self.read("group catalog read", self.store.list_active_groups()),
      self.read("claim read", self.store.claims_for_program(program)),
    )?;

    debug!(
      %program,
      subjects = subjects.len(),
      groups = groups.len(),
      claims = claims.len(),
      "resolving availability"
    );

    Ok(availability::resolve(
      program,
      subjects,
      groups,
      &claims,
      &self.matcher,
    ))
  }

  // ── Mutation ──────────────────────────────────────────────────────────

  /// Replace the whole assignment list of `teacher_id`.
  ///
  /// The list is validated for shape and against the catalogs before the
  /// store applies it as a single all-or-nothing write. An empty list clears
  /// every claim the teacher holds.
  pub async fn replace_assignments(
    &self,
    teacher_id: Uuid,
    assignments: Vec<TeacherAssignment>,
    expected_revision: Option<u64>,
  ) -> Result<Teacher, S::Error> {
    let set = AssignmentSet::new(assignments)?;
    self.require_teacher(teacher_id).await?;
    self.check_catalogs(&set).await?;
    self.write(teacher_id, &set, expected_revision).await
  }

  /// Self-registration: create a teacher account and claim a single
  /// (subject, groups) entry for it.
  ///
  /// The account and its claim are written together. A taken slot fails the
  /// registration with a conflict and leaves no account behind.
  pub async fn register_teacher(
    &self,
    input: NewUser,
    claim: TeacherAssignment,
  ) -> Result<Teacher, S::Error> {
    let set = AssignmentSet::new(vec![claim])?;
    self.check_catalogs(&set).await?;

    let input = NewUser {
      role: Role::Teacher,
      ..input
    };
    match self.store.register_teacher(input, &set).await {
      Ok(teacher) => {
        info!(
          teacher = %teacher.user_id,
          slots = set.slots().len(),
          "registered teacher"
        );
        Ok(teacher)
      }
      Err(e) => {
        if e.kind() == ErrorKind::Conflict {
          warn!(error = %e, "registration rejected");
        }
        Err(e)
      }
    }
  }

  async fn write(
    &self,
    teacher_id: Uuid,
    set: &AssignmentSet,
    expected_revision: Option<u64>,
  ) -> Result<Teacher, S::Error> {
    match self
      .store
      .replace_assignments(teacher_id, set, expected_revision)
      .await
    {
      Ok(teacher) => {
        info!(
          teacher = %teacher_id,
          revision = teacher.revision,
          slots = set.slots().len(),
          "assignments replaced"
        );
        Ok(teacher)
      }
      Err(e) => {
        if matches!(
          e.kind(),
          ErrorKind::Conflict | ErrorKind::PreconditionFailed
        ) {
          warn!(teacher = %teacher_id, error = %e, "assignment write rejected");
        }
        Err(e)
      }
    }
  }

  async fn require_teacher(&self, user_id: Uuid) -> Result<User, S::Error> {
    let user = self
      .read("user read", self.store.get_user(user_id))
      .await?
      .ok_or(Error::UserNotFound(user_id))?;
    if user.role != Role::Teacher {
      return Err(
        Error::InvalidRole {
          user_id,
          role: user.role,
        }
        .into(),
      );
    }
    Ok(user)
  }

  /// Every subject must exist, be active, and belong to its entry's
  /// program; every group must exist and belong to the program under the
  /// legacy tag rule.
  async fn check_catalogs(&self, set: &AssignmentSet) -> Result<(), S::Error> {
    for entry in set.entries() {
      let subject = self
        .read("subject read", self.store.get_subject(entry.subject_id))
        .await?
        .ok_or(Error::SubjectNotFound(entry.subject_id))?;
      if subject.program_id != entry.program_id {
        return Err(
          Error::SubjectOutsideProgram {
            subject_id: subject.subject_id,
            program_id: entry.program_id.clone(),
          }
          .into(),
        );
      }
      if !subject.active {
        return Err(Error::InactiveSubject(subject.subject_id).into());
      }

      for group_id in &entry.group_ids {
        let group = self
          .read("group read", self.store.get_group(*group_id))
          .await?
          .ok_or(Error::GroupNotFound(*group_id))?;
        if !self.matcher.belongs(&group.program_tag, &entry.program_id) {
          return Err(
            Error::GroupOutsideProgram {
              group_id:   *group_id,
              program_id: entry.program_id.clone(),
            }
            .into(),
          );
        }
      }
    }
    Ok(())
  }

  // ── Roster ────────────────────────────────────────────────────────────

  /// Teachers bound to `group_id`, optionally only through claims in
  /// `program`.
  pub async fn teachers_for_group(
    &self,
    group_id: Uuid,
    program: Option<&ProgramId>,
  ) -> Result<Vec<Teacher>, S::Error> {
    self
      .read("group read", self.store.get_group(group_id))
      .await?
      .ok_or(Error::GroupNotFound(group_id))?;
    self
      .read(
        "roster read",
        self.store.teachers_for_group(group_id, program),
      )
      .await
  }
}
