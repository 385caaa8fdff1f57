//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! enums their lowercase names.

use aula_core::{
  assignment::{Claim, Slot, Teacher, assemble},
  catalog::{Group, ProgramId, Role, Shift, Subject, User},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Role ─────────────────────────────────────────────────────────────────────

pub fn encode_role(r: Role) -> &'static str { r.as_str() }

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "student" => Ok(Role::Student),
    "teacher" => Ok(Role::Teacher),
    "admin" => Ok(Role::Admin),
    other => Err(Error::Decode(format!("unknown role: {other:?}"))),
  }
}

// ─── Shift ────────────────────────────────────────────────────────────────────

pub fn encode_shift(s: Shift) -> &'static str {
  match s {
    Shift::Morning => "morning",
    Shift::Afternoon => "afternoon",
    Shift::Evening => "evening",
  }
}

pub fn decode_shift(s: &str) -> Result<Shift> {
  match s {
    "morning" => Ok(Shift::Morning),
    "afternoon" => Ok(Shift::Afternoon),
    "evening" => Ok(Shift::Evening),
    other => Err(Error::Decode(format!("unknown shift: {other:?}"))),
  }
}

// ─── Revision ─────────────────────────────────────────────────────────────────

pub fn decode_revision(n: i64) -> Result<u64> {
  u64::try_from(n).map_err(|_| Error::Decode(format!("negative revision: {n}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str =
  "user_id, display_name, email, role, created_at, revision";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:      String,
  pub display_name: String,
  pub email:        String,
  pub role:         String,
  pub created_at:   String,
  pub revision:     i64,
}

impl RawUser {
  /// Expects the columns in [`USER_COLUMNS`] order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:      row.get(0)?,
      display_name: row.get(1)?,
      email:        row.get(2)?,
      role:         row.get(3)?,
      created_at:   row.get(4)?,
      revision:     row.get(5)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:      decode_uuid(&self.user_id)?,
      display_name: self.display_name,
      email:        self.email,
      role:         decode_role(&self.role)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const SUBJECT_COLUMNS: &str = "subject_id, program_id, name, term, active";

/// Raw values read directly from a `subjects` row.
pub struct RawSubject {
  pub subject_id: String,
  pub program_id: String,
  pub name:       String,
  pub term:       i64,
  pub active:     bool,
}

impl RawSubject {
  /// Expects the columns in [`SUBJECT_COLUMNS`] order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id: row.get(0)?,
      program_id: row.get(1)?,
      name:       row.get(2)?,
      term:       row.get(3)?,
      active:     row.get(4)?,
    })
  }

  pub fn into_subject(self) -> Result<Subject> {
    let term = u8::try_from(self.term)
      .map_err(|_| Error::Decode(format!("term out of range: {}", self.term)))?;
    Ok(Subject {
      subject_id: decode_uuid(&self.subject_id)?,
      program_id: ProgramId::new(self.program_id),
      name: self.name,
      term,
      active: self.active,
    })
  }
}

pub const GROUP_COLUMNS: &str =
  "group_id, program_tag, name, shift, cycle, active";

/// Raw values read directly from a `class_groups` row.
pub struct RawGroup {
  pub group_id:    String,
  pub program_tag: String,
  pub name:        String,
  pub shift:       String,
  pub cycle:       String,
  pub active:      bool,
}

impl RawGroup {
  /// Expects the columns in [`GROUP_COLUMNS`] order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      group_id:    row.get(0)?,
      program_tag: row.get(1)?,
      name:        row.get(2)?,
      shift:       row.get(3)?,
      cycle:       row.get(4)?,
      active:      row.get(5)?,
    })
  }

  pub fn into_group(self) -> Result<Group> {
    Ok(Group {
      group_id:    decode_uuid(&self.group_id)?,
      program_tag: self.program_tag,
      name:        self.name,
      shift:       decode_shift(&self.shift)?,
      cycle:       self.cycle,
      active:      self.active,
    })
  }
}

/// Raw values of a `claims` row joined with its owning assignment.
pub struct RawClaim {
  pub program_id: String,
  pub subject_id: String,
  pub group_id:   String,
  pub teacher_id: String,
}

impl RawClaim {
  /// Expects `program_id, subject_id, group_id, teacher_id`.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      program_id: row.get(0)?,
      subject_id: row.get(1)?,
      group_id:   row.get(2)?,
      teacher_id: row.get(3)?,
    })
  }

  pub fn into_slot(self) -> Result<Slot> {
    Ok(Slot {
      program_id: ProgramId::new(self.program_id),
      subject_id: decode_uuid(&self.subject_id)?,
      group_id:   decode_uuid(&self.group_id)?,
    })
  }

  pub fn into_claim(self) -> Result<Claim> {
    let teacher_id = decode_uuid(&self.teacher_id)?;
    Ok(Claim {
      slot: self.into_slot()?,
      teacher_id,
    })
  }
}

/// A teacher's `users` row plus every claim it holds.
pub struct RawTeacher {
  pub user:   RawUser,
  pub claims: Vec<RawClaim>,
}

impl RawTeacher {
  pub fn into_teacher(self) -> Result<Teacher> {
    let slots = self
      .claims
      .into_iter()
      .map(RawClaim::into_slot)
      .collect::<Result<Vec<_>>>()?;
    Ok(Teacher {
      user_id:      decode_uuid(&self.user.user_id)?,
      display_name: self.user.display_name,
      email:        self.user.email,
      revision:     decode_revision(self.user.revision)?,
      assignments:  assemble(slots),
    })
  }
}
