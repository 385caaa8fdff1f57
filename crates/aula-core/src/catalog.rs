//! Catalog records owned by neighbouring subsystems: users, subjects and
//! groups. The allocator only reads them; the `New*` inputs exist so stores
//! can be seeded.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Program ─────────────────────────────────────────────────────────────────

/// Identifier of an academic program (e.g. `"ISW"`). Programs are not
/// records of their own; subjects and groups carry the id as a tag.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "String")]
pub struct ProgramId(String);

impl ProgramId {
  /// Surrounding whitespace is dropped.
  pub fn new(raw: impl Into<String>) -> Self {
    let raw = raw.into();
    Self(raw.trim().to_owned())
  }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn is_empty(&self) -> bool { self.as_str().is_empty() }
}

impl fmt::Display for ProgramId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl From<String> for ProgramId {
  fn from(s: String) -> Self { Self::new(s) }
}

impl From<&str> for ProgramId {
  fn from(s: &str) -> Self { Self::new(s) }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Student,
  Teacher,
  Admin,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Student => "student",
      Self::Teacher => "teacher",
      Self::Admin => "admin",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A platform account as seen by the allocator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:      Uuid,
  pub display_name: String,
  pub email:        String,
  pub role:         Role,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`crate::store::SlotStore::add_user`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
  pub display_name: String,
  pub email:        String,
  pub role:         Role,
}

// ─── Subjects ────────────────────────────────────────────────────────────────

/// A course offered by a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id: Uuid,
  pub program_id: ProgramId,
  pub name:       String,
  /// Sequence position of the subject within the program (cuatrimestre).
  pub term:       u8,
  pub active:     bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSubject {
  pub program_id: ProgramId,
  pub name:       String,
  pub term:       u8,
  #[serde(default = "active_by_default")]
  pub active:     bool,
}

// ─── Groups ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shift {
  Morning,
  Afternoon,
  Evening,
}

/// A cohort of students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
  pub group_id:    Uuid,
  /// Program tag exactly as recorded. Historical rows may hold an empty
  /// string or a placeholder; see [`crate::legacy`].
  pub program_tag: String,
  pub name:        String,
  pub shift:       Shift,
  /// Active-cycle tag, e.g. `"2024-3"`.
  pub cycle:       String,
  pub active:      bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGroup {
  #[serde(default)]
  pub program_tag: String,
  pub name:        String,
  pub shift:       Shift,
  pub cycle:       String,
  #[serde(default = "active_by_default")]
  pub active:      bool,
}

fn active_by_default() -> bool { true }
