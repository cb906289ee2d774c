//! Mutation stages, in firing order.

use std::fmt;

use serde::Serialize;

/// Stage at which a mutator runs against its subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum MutationType {
  Defaults,
  Initialize,
  Mutate,
  Finalize,
  Validate,
}

impl MutationType {
  /// Stages that run before a node is self-closed, in firing order.
  pub const SELF_CLOSING: [MutationType; 4] = [
    MutationType::Defaults,
    MutationType::Initialize,
    MutationType::Mutate,
    MutationType::Finalize,
  ];
}

impl fmt::Display for MutationType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MutationType::Defaults => write!(f, "defaults"),
      MutationType::Initialize => write!(f, "initialize"),
      MutationType::Mutate => write!(f, "mutate"),
      MutationType::Finalize => write!(f, "finalize"),
      MutationType::Validate => write!(f, "validate"),
    }
  }
}
