//! Program-tag reconciliation for historical group records.
//!
//! Older group rows were written without a program tag, or with a
//! placeholder. Until those rows are backfilled, such a group counts as part
//! of every program. The rule lives here and nowhere else.

use std::collections::BTreeSet;

use crate::catalog::ProgramId;

/// Placeholder tags found on historical group records.
pub const DEFAULT_LEGACY_TAGS: &[&str] =
  &["legacy", "none", "n/a", "sin-programa", "general"];

/// Decides whether a group's recorded program tag places it in a program.
#[derive(Debug, Clone)]
pub struct ProgramMatcher {
  placeholders: BTreeSet<String>,
}

impl ProgramMatcher {
  /// Build a matcher from a set of placeholder tags. Tags are compared
  /// trimmed and case-insensitively. An empty tag always matches.
  pub fn new<I, T>(placeholders: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
  {
    let placeholders = placeholders
      .into_iter()
      .map(|t| normalise(t.as_ref()))
      .filter(|t| !t.is_empty())
      .collect();
    Self { placeholders }
  }

  /// Only empty tags are treated as untagged.
  pub fn strict() -> Self {
    Self {
      placeholders: BTreeSet::new(),
    }
  }

  /// Whether `tag` is empty or one of the configured placeholders.
  pub fn is_untagged(&self, tag: &str) -> bool {
    let tag = normalise(tag);
    tag.is_empty() || self.placeholders.contains(&tag)
  }

  /// Whether a group recorded with `tag` belongs to `program`.
  pub fn belongs(&self, tag: &str, program: &ProgramId) -> bool {
    tag.trim() == program.as_str() || self.is_untagged(tag)
  }
}

impl Default for ProgramMatcher {
  fn default() -> Self { Self::new(DEFAULT_LEGACY_TAGS) }
}

fn normalise(tag: &str) -> String { tag.trim().to_lowercase() }
