//! Teacher assignments and the slots they claim.
//!
//! A [`TeacherAssignment`] binds a teacher to one subject and a set of groups
//! within a program. Each (program, subject, group) triple it covers is a
//! [`Slot`]; a slot is held by at most one teacher. Writes never patch an
//! assignment list in place. They replace it, and the store turns the
//! replacement into a [`ClaimDelta`] of per-slot claims and releases.

use std::{
  collections::{BTreeMap, BTreeSet},
  fmt,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, catalog::ProgramId};

// ─── Assignment ──────────────────────────────────────────────────────────────

/// One entry of a teacher's assignment list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherAssignment {
  pub program_id: ProgramId,
  pub subject_id: Uuid,
  /// Non-empty, no repeats.
  pub group_ids:  Vec<Uuid>,
}

impl TeacherAssignment {
  pub fn new(
    program_id: impl Into<ProgramId>,
    subject_id: Uuid,
    group_ids: impl IntoIterator<Item = Uuid>,
  ) -> Self {
    Self {
      program_id: program_id.into(),
      subject_id,
      group_ids: group_ids.into_iter().collect(),
    }
  }

  /// The slots this entry covers.
  pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
    self.group_ids.iter().map(move |group_id| Slot {
      program_id: self.program_id.clone(),
      subject_id: self.subject_id,
      group_id:   *group_id,
    })
  }
}

/// A teacher user together with its current claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
  pub user_id:      Uuid,
  pub display_name: String,
  pub email:        String,
  /// Bumped by every write that changes the teacher's claims.
  pub revision:     u64,
  pub assignments:  Vec<TeacherAssignment>,
}

// ─── Slot ────────────────────────────────────────────────────────────────────

/// The unit of exclusive claim.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Slot {
  pub program_id: ProgramId,
  pub subject_id: Uuid,
  pub group_id:   Uuid,
}

impl fmt::Display for Slot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({}, {}, {})", self.program_id, self.subject_id, self.group_id)
  }
}

/// A claimed slot and the teacher holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
  pub slot:       Slot,
  pub teacher_id: Uuid,
}

// ─── Validated list ──────────────────────────────────────────────────────────

/// A complete assignment list that passed shape validation.
///
/// Entries are sorted by (program, subject) and each entry's groups are
/// sorted, so two sets built from the same claims compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentSet {
  entries: Vec<TeacherAssignment>,
}

impl AssignmentSet {
  /// Validate a caller-supplied list.
  ///
  /// Rejects empty program ids, entries without groups, groups repeated
  /// within an entry, and two entries for the same (program, subject).
  pub fn new(entries: Vec<TeacherAssignment>) -> Result<Self> {
    let mut seen = BTreeSet::new();
    let mut validated = Vec::with_capacity(entries.len());

    for mut entry in entries {
      if entry.program_id.is_empty() {
        return Err(Error::EmptyProgramId);
      }
      if entry.group_ids.is_empty() {
        return Err(Error::EmptyGroupSet(entry.subject_id));
      }
      let mut groups = BTreeSet::new();
      for group_id in &entry.group_ids {
        if !groups.insert(*group_id) {
          return Err(Error::DuplicateGroup {
            subject_id: entry.subject_id,
            group_id:   *group_id,
          });
        }
      }
      if !seen.insert((entry.program_id.clone(), entry.subject_id)) {
        return Err(Error::DuplicateAssignment {
          program_id: entry.program_id,
          subject_id: entry.subject_id,
        });
      }
      entry.group_ids = groups.into_iter().collect();
      validated.push(entry);
    }

    validated.sort_by(|a, b| {
      (&a.program_id, a.subject_id).cmp(&(&b.program_id, b.subject_id))
    });
    Ok(Self { entries: validated })
  }

  pub fn empty() -> Self { Self::default() }

  pub fn entries(&self) -> &[TeacherAssignment] { &self.entries }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  /// Every slot covered by the list.
  pub fn slots(&self) -> BTreeSet<Slot> {
    self.entries.iter().flat_map(|e| e.slots()).collect()
  }
}

/// Rebuild an assignment list from individual slots, one entry per
/// (program, subject), in a stable order.
pub fn assemble(slots: impl IntoIterator<Item = Slot>) -> Vec<TeacherAssignment> {
  let mut by_subject: BTreeMap<(ProgramId, Uuid), BTreeSet<Uuid>> =
    BTreeMap::new();
  for slot in slots {
    by_subject
      .entry((slot.program_id, slot.subject_id))
      .or_default()
      .insert(slot.group_id);
  }
  by_subject
    .into_iter()
    .map(|((program_id, subject_id), groups)| TeacherAssignment {
      program_id,
      subject_id,
      group_ids: groups.into_iter().collect(),
    })
    .collect()
}

// ─── Delta ───────────────────────────────────────────────────────────────────

/// The per-slot work needed to move from one claim set to another.
///
/// Generic over the key so stores can diff their own encoded keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimDelta<K> {
  /// Slots in the desired set that are not currently held.
  pub claim:   Vec<K>,
  /// Slots currently held that the desired set drops.
  pub release: Vec<K>,
}

impl<K: Ord + Clone> ClaimDelta<K> {
  pub fn between(current: &BTreeSet<K>, desired: &BTreeSet<K>) -> Self {
    Self {
      claim:   desired.difference(current).cloned().collect(),
      release: current.difference(desired).cloned().collect(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.claim.is_empty() && self.release.is_empty()
  }
}
