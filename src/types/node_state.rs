//! Lifecycle state of a model node.

use std::fmt;

use serde::Serialize;

/// Lifecycle of a node. Ordered; a node's state never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ModelNodeState {
  /// A creator is registered but has not run.
  Known,
  /// The creator ran and the private data is populated.
  Created,
  /// Defaults, Initialize, Mutate and Finalize mutators ran.
  SelfClosed,
  /// All children are graph-closed and Validate mutators ran.
  GraphClosed,
}

impl fmt::Display for ModelNodeState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ModelNodeState::Known => write!(f, "known"),
      ModelNodeState::Created => write!(f, "created"),
      ModelNodeState::SelfClosed => write!(f, "self_closed"),
      ModelNodeState::GraphClosed => write!(f, "graph_closed"),
    }
  }
}
