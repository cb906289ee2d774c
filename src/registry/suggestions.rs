//! Near-miss path suggestions for unbound references.

use std::collections::BTreeSet;

use crate::types::ModelPath;

/// Suggests known paths that look like a misspelling of a requested one.
pub struct ModelPathSuggestionProvider {
  candidates: BTreeSet<ModelPath>,
  max_distance: usize,
  max_suggestions: Option<usize>,
}

impl ModelPathSuggestionProvider {
  pub fn new(
    candidates: impl IntoIterator<Item = ModelPath>,
    max_distance: usize,
    max_suggestions: Option<usize>,
  ) -> Self {
    Self {
      candidates: candidates.into_iter().collect(),
      max_distance,
      max_suggestions,
    }
  }

  /// Candidates within `min(max_distance, len / 2)` edits of `unavailable`,
  /// closest first, ties broken by path.
  pub fn suggest(&self, unavailable: &ModelPath) -> Vec<ModelPath> {
    let wanted = unavailable.to_string();
    let limit = self.max_distance.min(wanted.chars().count() / 2);
    let mut scored: Vec<(usize, &ModelPath)> = self
      .candidates
      .iter()
      .filter(|candidate| *candidate != unavailable)
      .map(|candidate| (strsim::levenshtein(&wanted, &candidate.to_string()), candidate))
      .filter(|(distance, _)| *distance <= limit)
      .collect();
    scored.sort();
    let take = self.max_suggestions.unwrap_or(usize::MAX);
    scored.into_iter().take(take).map(|(_, path)| path.clone()).collect()
  }
}
