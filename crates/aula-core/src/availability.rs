//! Pure availability computation.
//!
//! Availability is never stored. It is derived from three snapshots: the
//! program's active subjects, the active group catalog, and the slots already
//! claimed in the program.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  assignment::Claim,
  catalog::{Group, ProgramId, Subject},
  legacy::ProgramMatcher,
};

/// A subject with at least one group nobody has claimed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableSubject {
  pub subject:     Subject,
  /// Never empty.
  pub free_groups: Vec<Group>,
}

/// Compute the open (subject, group) combinations of `program`.
///
/// Inactive records and subjects of other programs are ignored, groups are
/// matched to the program through `matcher`, and claims outside `program`
/// do not count. Subjects whose groups are all claimed are left out.
///
/// Subjects come out ordered by (term, name, id) and groups by (name, id).
pub fn resolve(
  program: &ProgramId,
  subjects: Vec<Subject>,
  groups: Vec<Group>,
  claims: &[Claim],
  matcher: &ProgramMatcher,
) -> Vec<AvailableSubject> {
  let mut subjects: Vec<Subject> = subjects
    .into_iter()
    .filter(|s| s.active && &s.program_id == program)
    .collect();
  if subjects.is_empty() {
    return Vec::new();
  }
  subjects.sort_by(|a, b| {
    (a.term, &a.name, a.subject_id).cmp(&(b.term, &b.name, b.subject_id))
  });

  let mut groups: Vec<Group> = groups
    .into_iter()
    .filter(|g| g.active && matcher.belongs(&g.program_tag, program))
    .collect();
  groups.sort_by(|a, b| (&a.name, a.group_id).cmp(&(&b.name, b.group_id)));

  let mut claimed: BTreeMap<Uuid, BTreeSet<Uuid>> = BTreeMap::new();
  for claim in claims.iter().filter(|c| &c.slot.program_id == program) {
    claimed
      .entry(claim.slot.subject_id)
      .or_default()
      .insert(claim.slot.group_id);
  }

  subjects
    .into_iter()
    .filter_map(|subject| {
      let taken = claimed.get(&subject.subject_id);
      let free_groups: Vec<Group> = groups
        .iter()
        .filter(|g| taken.is_none_or(|t| !t.contains(&g.group_id)))
        .cloned()
        .collect();
      (!free_groups.is_empty()).then_some(AvailableSubject {
        subject,
        free_groups,
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{assignment::Slot, catalog::Shift};

  fn subject(program: &str, name: &str, term: u8) -> Subject {
    Subject {
      subject_id: Uuid::new_v4(),
      program_id: program.into(),
      name: name.into(),
      term,
      active: true,
    }
  }

  fn group(tag: &str, name: &str) -> Group {
    Group {
      group_id:    Uuid::new_v4(),
      program_tag: tag.into(),
      name:        name.into(),
      shift:       Shift::Morning,
      cycle:       "2024-3".into(),
      active:      true,
    }
  }

  fn claim(program: &str, s: &Subject, g: &Group) -> Claim {
    Claim {
      slot:       Slot {
        program_id: program.into(),
        subject_id: s.subject_id,
        group_id:   g.group_id,
      },
      teacher_id: Uuid::new_v4(),
    }
  }

  fn names(groups: &[Group]) -> Vec<&str> {
    groups.iter().map(|g| g.name.as_str()).collect()
  }

  #[test]
  fn unclaimed_program_lists_every_group_under_every_subject() {
    let p: ProgramId = "P1".into();
    let s = vec![subject("P1", "S1", 1), subject("P1", "S2", 1)];
    let g = vec![group("P1", "G1"), group("P1", "G2"), group("P1", "G3")];

    let out = resolve(&p, s, g, &[], &ProgramMatcher::default());
    assert_eq!(out.len(), 2);
    for avail in &out {
      assert_eq!(names(&avail.free_groups), ["G1", "G2", "G3"]);
    }
  }

  #[test]
  fn claimed_groups_are_never_free() {
    let p: ProgramId = "P1".into();
    let s1 = subject("P1", "S1", 1);
    let (g1, g2) = (group("P1", "G1"), group("P1", "G2"));
    let claims = [claim("P1", &s1, &g1)];

    let out = resolve(
      &p,
      vec![s1],
      vec![g1, g2],
      &claims,
      &ProgramMatcher::default(),
    );
    assert_eq!(names(&out[0].free_groups), ["G2"]);
  }

  #[test]
  fn fully_claimed_subject_is_omitted() {
    let p: ProgramId = "P1".into();
    let (s1, s2) = (subject("P1", "S1", 1), subject("P1", "S2", 2));
    let g1 = group("P1", "G1");
    let claims = [claim("P1", &s1, &g1)];

    let out = resolve(
      &p,
      vec![s1, s2.clone()],
      vec![g1],
      &claims,
      &ProgramMatcher::default(),
    );
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].subject, s2);
  }

  #[test]
  fn claims_in_other_programs_do_not_count() {
    let p: ProgramId = "P1".into();
    let s1 = subject("P1", "S1", 1);
    let g1 = group("", "G1");
    let claims = [claim("P2", &s1, &g1)];

    let out =
      resolve(&p, vec![s1], vec![g1], &claims, &ProgramMatcher::default());
    assert_eq!(names(&out[0].free_groups), ["G1"]);
  }

  #[test]
  fn untagged_groups_belong_to_every_program() {
    let m = ProgramMatcher::default();
    for program in ["P1", "P2", "anything"] {
      let p: ProgramId = program.into();
      let out = resolve(
        &p,
        vec![subject(program, "S", 1)],
        vec![group("", "G-empty"), group("legacy", "G-legacy"), group("P9", "G-other")],
        &[],
        &m,
      );
      assert_eq!(names(&out[0].free_groups), ["G-empty", "G-legacy"]);
    }
  }

  #[test]
  fn inactive_and_foreign_records_are_ignored() {
    let p: ProgramId = "P1".into();
    let mut retired = subject("P1", "Old", 1);
    retired.active = false;
    let foreign = subject("P2", "Foreign", 1);
    let mut closed = group("P1", "Closed");
    closed.active = false;

    let out = resolve(
      &p,
      vec![retired, foreign, subject("P1", "Live", 1)],
      vec![closed, group("P1", "Open")],
      &[],
      &ProgramMatcher::default(),
    );
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].subject.name, "Live");
    assert_eq!(names(&out[0].free_groups), ["Open"]);
  }

  #[test]
  fn no_groups_means_nothing_available() {
    let p: ProgramId = "P1".into();
    let out = resolve(
      &p,
      vec![subject("P1", "S1", 1)],
      vec![],
      &[],
      &ProgramMatcher::default(),
    );
    assert!(out.is_empty());
  }

  #[test]
  fn subjects_are_ordered_by_term_then_name() {
    let p: ProgramId = "P1".into();
    let out = resolve(
      &p,
      vec![subject("P1", "B", 2), subject("P1", "Z", 1), subject("P1", "A", 2)],
      vec![group("P1", "G1")],
      &[],
      &ProgramMatcher::default(),
    );
    let order: Vec<&str> = out.iter().map(|a| a.subject.name.as_str()).collect();
    assert_eq!(order, ["Z", "A", "B"]);
  }
}
