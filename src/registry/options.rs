//! Registry tuning knobs.

/// Options for [super::ModelRegistry::with_options].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
  /// Largest edit distance at which a known path is suggested for an unbound one.
  pub max_suggestion_distance: usize,
  /// Cap on suggestions listed per unbound slot. `None` lists all.
  pub max_suggestions: Option<usize>,
}

impl Default for RegistryOptions {
  fn default() -> Self {
    Self {
      max_suggestion_distance: 4,
      max_suggestions: None,
    }
  }
}
