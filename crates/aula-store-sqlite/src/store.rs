//! [`SqliteStore`]: the SQLite implementation of [`SlotStore`].

use std::{collections::BTreeSet, path::Path};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use aula_core::{
  assignment::{AssignmentSet, Claim, ClaimDelta, Teacher},
  catalog::{
    Group, NewGroup, NewSubject, NewUser, ProgramId, Role, Subject, User,
  },
  store::SlotStore,
};

use crate::{
  Error, Result,
  encode::{
    GROUP_COLUMNS, RawClaim, RawGroup, RawSubject, RawTeacher, RawUser,
    SUBJECT_COLUMNS, USER_COLUMNS, decode_revision, decode_role, decode_uuid,
    encode_dt, encode_role, encode_shift, encode_uuid,
  },
  schema::SCHEMA,
};

/// `(program_id, subject_id, group_id)` as stored.
type SlotKey = (String, String, String);

const CLAIM_SELECT: &str = "
  SELECT c.program_id, c.subject_id, c.group_id, a.teacher_id
  FROM claims c
  JOIN assignments a ON a.assignment_id = c.assignment_id";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A slot store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row readers ─────────────────────────────────────────────────────────────
//
// Synchronous helpers run inside `Connection::call` closures so multi-step
// reads and the replace transaction see one consistent connection state.

fn read_user(
  conn: &rusqlite::Connection,
  user_id: &str,
) -> rusqlite::Result<Option<RawUser>> {
  conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
      rusqlite::params![user_id],
      RawUser::from_row,
    )
    .optional()
}

fn read_claims_of(
  conn: &rusqlite::Connection,
  teacher_id: &str,
) -> rusqlite::Result<Vec<RawClaim>> {
  let mut stmt = conn.prepare(&format!("{CLAIM_SELECT} WHERE a.teacher_id = ?1"))?;
  let rows = stmt
    .query_map(rusqlite::params![teacher_id], RawClaim::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// `None` if the user does not exist or is not a teacher.
fn read_teacher(
  conn: &rusqlite::Connection,
  user_id: &str,
) -> rusqlite::Result<Option<RawTeacher>> {
  let Some(user) = read_user(conn, user_id)? else {
    return Ok(None);
  };
  if user.role != encode_role(Role::Teacher) {
    return Ok(None);
  }
  let claims = read_claims_of(conn, user_id)?;
  Ok(Some(RawTeacher { user, claims }))
}

fn read_teachers(
  conn: &rusqlite::Connection,
  ids: &[String],
) -> rusqlite::Result<Vec<RawTeacher>> {
  let mut out = Vec::with_capacity(ids.len());
  for id in ids {
    if let Some(teacher) = read_teacher(conn, id)? {
      out.push(teacher);
    }
  }
  Ok(out)
}

fn holder_of(
  conn: &rusqlite::Connection,
  (program_id, subject_id, group_id): &SlotKey,
) -> rusqlite::Result<Option<String>> {
  conn
    .query_row(
      &format!(
        "{CLAIM_SELECT}
         WHERE c.program_id = ?1 AND c.subject_id = ?2 AND c.group_id = ?3"
      ),
      rusqlite::params![program_id, subject_id, group_id],
      |row| row.get(3),
    )
    .optional()
}

/// The assignment row for (teacher, program, subject), created if missing.
fn ensure_assignment(
  conn: &rusqlite::Connection,
  teacher_id: &str,
  program_id: &str,
  subject_id: &str,
  now: &str,
) -> rusqlite::Result<String> {
  let existing: Option<String> = conn
    .query_row(
      "SELECT assignment_id FROM assignments
       WHERE teacher_id = ?1 AND program_id = ?2 AND subject_id = ?3",
      rusqlite::params![teacher_id, program_id, subject_id],
      |row| row.get(0),
    )
    .optional()?;
  if let Some(id) = existing {
    return Ok(id);
  }

  let id = encode_uuid(Uuid::new_v4());
  conn.execute(
    "INSERT INTO assignments (assignment_id, teacher_id, program_id, subject_id, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![id, teacher_id, program_id, subject_id, now],
  )?;
  Ok(id)
}

fn into_teachers(raws: Vec<RawTeacher>) -> Result<Vec<Teacher>> {
  let mut teachers = raws
    .into_iter()
    .map(RawTeacher::into_teacher)
    .collect::<Result<Vec<_>>>()?;
  teachers.sort_by(|a, b| {
    (&a.display_name, a.user_id).cmp(&(&b.display_name, b.user_id))
  });
  Ok(teachers)
}

fn insert_user(conn: &rusqlite::Connection, user: &User) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO users (user_id, display_name, email, role, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![
      encode_uuid(user.user_id),
      user.display_name,
      user.email,
      encode_role(user.role),
      encode_dt(user.created_at),
    ],
  )?;
  Ok(())
}

/// Why a write transaction was rolled back.
enum Rejection {
  UnknownUser,
  WrongRole(String),
  Stale { actual: i64 },
  Taken { key: SlotKey, holder: String },
  InactiveSubject(String),
}

impl Rejection {
  fn into_error(self, teacher_id: Uuid, expected_revision: Option<u64>) -> Error {
    match self.into_core(teacher_id, expected_revision) {
      Ok(core) => core.into(),
      Err(e) => e,
    }
  }

  fn into_core(
    self,
    teacher_id: Uuid,
    expected_revision: Option<u64>,
  ) -> Result<aula_core::Error> {
    Ok(match self {
      Rejection::UnknownUser => aula_core::Error::UserNotFound(teacher_id),
      Rejection::WrongRole(role) => aula_core::Error::InvalidRole {
        user_id: teacher_id,
        role:    decode_role(&role)?,
      },
      Rejection::Stale { actual } => aula_core::Error::StaleRevision {
        teacher_id,
        expected: expected_revision.unwrap_or_default(),
        actual: decode_revision(actual)?,
      },
      Rejection::Taken { key, holder } => {
        let (program_id, subject_id, group_id) = key;
        let claim = RawClaim {
          program_id,
          subject_id,
          group_id,
          teacher_id: holder,
        }
        .into_claim()?;
        aula_core::Error::SlotTaken {
          slot:    claim.slot,
          held_by: claim.teacher_id,
        }
      }
      Rejection::InactiveSubject(subject_id) => {
        aula_core::Error::InactiveSubject(decode_uuid(&subject_id)?)
      }
    })
  }
}

/// A committed write: the teacher afterwards and the size of the delta
/// that was applied.
struct Replaced {
  teacher:  RawTeacher,
  claimed:  usize,
  released: usize,
}

/// Move `teacher_id`'s claims to exactly `desired` inside `tx`.
///
/// Checks every newly claimed slot for another holder and an inactive
/// subject before touching any row. Returns `(claimed, released)`.
fn apply_claims(
  tx: &rusqlite::Transaction<'_>,
  teacher_id: &str,
  desired: &BTreeSet<SlotKey>,
  now: &str,
) -> rusqlite::Result<std::result::Result<(usize, usize), Rejection>> {
  let current: BTreeSet<SlotKey> = read_claims_of(tx, teacher_id)?
    .into_iter()
    .map(|c| (c.program_id, c.subject_id, c.group_id))
    .collect();
  let delta = ClaimDelta::between(&current, desired);

  for key in &delta.claim {
    if let Some(holder) = holder_of(tx, key)?
      && holder != teacher_id
    {
      return Ok(Err(Rejection::Taken {
        key: key.clone(),
        holder,
      }));
    }
    let (_, subject_id, _) = key;
    let active: Option<bool> = tx
      .query_row(
        "SELECT active FROM subjects WHERE subject_id = ?1",
        rusqlite::params![subject_id],
        |row| row.get(0),
      )
      .optional()?;
    if active != Some(true) {
      return Ok(Err(Rejection::InactiveSubject(subject_id.clone())));
    }
  }

  for (program_id, subject_id, group_id) in &delta.release {
    tx.execute(
      "DELETE FROM claims
       WHERE program_id = ?1 AND subject_id = ?2 AND group_id = ?3",
      rusqlite::params![program_id, subject_id, group_id],
    )?;
  }
  for (program_id, subject_id, group_id) in &delta.claim {
    let assignment_id =
      ensure_assignment(tx, teacher_id, program_id, subject_id, now)?;
    tx.execute(
      "INSERT INTO claims (assignment_id, program_id, subject_id, group_id, claimed_at)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      rusqlite::params![assignment_id, program_id, subject_id, group_id, now],
    )?;
  }

  if !delta.is_empty() {
    tx.execute(
      "DELETE FROM assignments
       WHERE teacher_id = ?1
         AND NOT EXISTS (
           SELECT 1 FROM claims c
           WHERE c.assignment_id = assignments.assignment_id
         )",
      rusqlite::params![teacher_id],
    )?;
    tx.execute(
      "UPDATE users SET revision = revision + 1 WHERE user_id = ?1",
      rusqlite::params![teacher_id],
    )?;
  }

  Ok(Ok((delta.claim.len(), delta.release.len())))
}

fn slot_keys(assignments: &AssignmentSet) -> BTreeSet<SlotKey> {
  assignments
    .slots()
    .into_iter()
    .map(|s| {
      (
        s.program_id.as_str().to_owned(),
        encode_uuid(s.subject_id),
        encode_uuid(s.group_id),
      )
    })
    .collect()
}

// ─── SlotStore impl ──────────────────────────────────────────────────────────

impl SlotStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:      Uuid::new_v4(),
      display_name: input.display_name,
      email:        input.email,
      role:         input.role,
      created_at:   Utc::now(),
    };

    let row = user.clone();
    self
      .conn
      .call(move |conn| Ok(insert_user(conn, &row)?))
      .await?;

    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| Ok(read_user(conn, &id_str)?))
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn list_teachers(&self) -> Result<Vec<Teacher>> {
    let role_str = encode_role(Role::Teacher).to_owned();
    let raws: Vec<RawTeacher> = self
      .conn
      .call(move |conn| {
        let ids = {
          let mut stmt =
            conn.prepare("SELECT user_id FROM users WHERE role = ?1")?;
          let ids = stmt
            .query_map(rusqlite::params![role_str], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
          ids
        };
        Ok(read_teachers(conn, &ids)?)
      })
      .await?;
    into_teachers(raws)
  }

  async fn get_teacher(&self, id: Uuid) -> Result<Option<Teacher>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawTeacher> = self
      .conn
      .call(move |conn| Ok(read_teacher(conn, &id_str)?))
      .await?;
    raw.map(RawTeacher::into_teacher).transpose()
  }

  // ── Catalogs ──────────────────────────────────────────────────────────────

  async fn add_subject(&self, input: NewSubject) -> Result<Subject> {
    let subject = Subject {
      subject_id: Uuid::new_v4(),
      program_id: input.program_id,
      name:       input.name,
      term:       input.term,
      active:     input.active,
    };

    let id_str      = encode_uuid(subject.subject_id);
    let program_str = subject.program_id.as_str().to_owned();
    let name        = subject.name.clone();
    let term        = i64::from(subject.term);
    let active      = subject.active;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subjects (subject_id, program_id, name, term, active)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, program_str, name, term, active],
        )?;
        Ok(())
      })
      .await?;

    Ok(subject)
  }

  async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE subject_id = ?1"
              ),
              rusqlite::params![id_str],
              RawSubject::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawSubject::into_subject).transpose()
  }

  async fn list_active_subjects(
    &self,
    program: &ProgramId,
  ) -> Result<Vec<Subject>> {
    let program_str = program.as_str().to_owned();
    let raws: Vec<RawSubject> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBJECT_COLUMNS} FROM subjects
           WHERE program_id = ?1 AND active = 1
           ORDER BY term, name"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![program_str], RawSubject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  async fn add_group(&self, input: NewGroup) -> Result<Group> {
    let group = Group {
      group_id:    Uuid::new_v4(),
      program_tag: input.program_tag,
      name:        input.name,
      shift:       input.shift,
      cycle:       input.cycle,
      active:      input.active,
    };

    let id_str    = encode_uuid(group.group_id);
    let tag       = group.program_tag.clone();
    let name      = group.name.clone();
    let shift_str = encode_shift(group.shift).to_owned();
    let cycle     = group.cycle.clone();
    let active    = group.active;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO class_groups (group_id, program_tag, name, shift, cycle, active)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, tag, name, shift_str, cycle, active],
        )?;
        Ok(())
      })
      .await?;

    Ok(group)
  }

  async fn get_group(&self, id: Uuid) -> Result<Option<Group>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawGroup> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {GROUP_COLUMNS} FROM class_groups WHERE group_id = ?1"
              ),
              rusqlite::params![id_str],
              RawGroup::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawGroup::into_group).transpose()
  }

  async fn list_active_groups(&self) -> Result<Vec<Group>> {
    let raws: Vec<RawGroup> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {GROUP_COLUMNS} FROM class_groups WHERE active = 1 ORDER BY name"
        ))?;
        let rows = stmt
          .query_map([], RawGroup::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawGroup::into_group).collect()
  }

  // ── Claims ────────────────────────────────────────────────────────────────

  async fn claims_for_program(&self, program: &ProgramId) -> Result<Vec<Claim>> {
    let program_str = program.as_str().to_owned();
    let raws: Vec<RawClaim> = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare(&format!("{CLAIM_SELECT} WHERE c.program_id = ?1"))?;
        let rows = stmt
          .query_map(rusqlite::params![program_str], RawClaim::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawClaim::into_claim).collect()
  }

  async fn teachers_for_group(
    &self,
    group_id: Uuid,
    program:  Option<&ProgramId>,
  ) -> Result<Vec<Teacher>> {
    let group_str   = encode_uuid(group_id);
    let program_str = program.map(|p| p.as_str().to_owned());

    let raws: Vec<RawTeacher> = self
      .conn
      .call(move |conn| {
        let ids = {
          let mut stmt = conn.prepare(
            "SELECT DISTINCT a.teacher_id
             FROM claims c
             JOIN assignments a ON a.assignment_id = c.assignment_id
             WHERE c.group_id = ?1
               AND (?2 IS NULL OR c.program_id = ?2)",
          )?;
          let ids = stmt
            .query_map(rusqlite::params![group_str, program_str], |row| {
              row.get(0)
            })?
            .collect::<rusqlite::Result<Vec<String>>>()?;
          ids
        };
        Ok(read_teachers(conn, &ids)?)
      })
      .await?;
    into_teachers(raws)
  }

  async fn replace_assignments(
    &self,
    teacher_id:        Uuid,
    assignments:       &AssignmentSet,
    expected_revision: Option<u64>,
  ) -> Result<Teacher> {
    let teacher_str = encode_uuid(teacher_id);
    let now         = encode_dt(Utc::now());
    let desired     = slot_keys(assignments);

    let outcome: std::result::Result<Replaced, Rejection> = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front, so the holder checks
        // cannot go stale before the inserts land.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(user) = read_user(&tx, &teacher_str)? else {
          return Ok(Err(Rejection::UnknownUser));
        };
        if user.role != encode_role(Role::Teacher) {
          return Ok(Err(Rejection::WrongRole(user.role)));
        }
        if let Some(expected) = expected_revision
          && u64::try_from(user.revision).ok() != Some(expected)
        {
          return Ok(Err(Rejection::Stale {
            actual: user.revision,
          }));
        }

        let (claimed, released) =
          match apply_claims(&tx, &teacher_str, &desired, &now)? {
            Ok(counts) => counts,
            Err(rejection) => return Ok(Err(rejection)),
          };

        let Some(teacher) = read_teacher(&tx, &teacher_str)? else {
          return Ok(Err(Rejection::UnknownUser));
        };
        tx.commit()?;

        Ok(Ok(Replaced {
          teacher,
          claimed,
          released,
        }))
      })
      .await?;

    let replaced =
      outcome.map_err(|r| r.into_error(teacher_id, expected_revision))?;
    debug!(
      teacher = %teacher_id,
      claimed = replaced.claimed,
      released = replaced.released,
      "claim delta committed"
    );
    replaced.teacher.into_teacher()
  }

  async fn register_teacher(
    &self,
    input:       NewUser,
    assignments: &AssignmentSet,
  ) -> Result<Teacher> {
    let user = User {
      user_id:      Uuid::new_v4(),
      display_name: input.display_name,
      email:        input.email,
      role:         Role::Teacher,
      created_at:   Utc::now(),
    };
    let teacher_id  = user.user_id;
    let teacher_str = encode_uuid(teacher_id);
    let now         = encode_dt(user.created_at);
    let desired     = slot_keys(assignments);

    let outcome: std::result::Result<Replaced, Rejection> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        insert_user(&tx, &user)?;

        let (claimed, released) =
          match apply_claims(&tx, &teacher_str, &desired, &now)? {
            Ok(counts) => counts,
            Err(rejection) => return Ok(Err(rejection)),
          };

        let Some(teacher) = read_teacher(&tx, &teacher_str)? else {
          return Ok(Err(Rejection::UnknownUser));
        };
        tx.commit()?;

        Ok(Ok(Replaced {
          teacher,
          claimed,
          released,
        }))
      })
      .await?;

    let registered = outcome.map_err(|r| r.into_error(teacher_id, None))?;
    debug!(
      teacher = %teacher_id,
      claimed = registered.claimed,
      "teacher account created with claims"
    );
    registered.teacher.into_teacher()
  }
}
