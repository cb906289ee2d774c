//! Path-indexed tree of model nodes.

mod model_node;

use indexmap::IndexMap;
use std::rc::Rc;
use tracing::trace;

use crate::error::ModelError;
use crate::types::{ModelAdapter, ModelPath, ModelPromise, ModelRuleDescriptor};

pub use model_node::{ModelCreation, ModelNode};

/// Owns every known node, keyed by path in creation order.
#[derive(Default)]
pub struct ModelGraph {
  nodes: IndexMap<ModelPath, ModelNode>,
}

impl ModelGraph {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn find(&self, path: &ModelPath) -> Option<&ModelNode> {
    self.nodes.get(path)
  }

  pub fn find_mut(&mut self, path: &ModelPath) -> Option<&mut ModelNode> {
    self.nodes.get_mut(path)
  }

  pub fn contains(&self, path: &ModelPath) -> bool {
    self.nodes.contains_key(path)
  }

  /// Registers a top-level node.
  pub fn add_entry_point(
    &mut self,
    path: ModelPath,
    descriptor: ModelRuleDescriptor,
    promise: Rc<dyn ModelPromise>,
    adapter: Rc<dyn ModelAdapter>,
  ) -> Result<&ModelNode, ModelError> {
    if !path.is_top_level() {
      return Err(ModelError::NotTopLevel { path });
    }
    if let Some(existing) = self.nodes.get(&path) {
      return Err(ModelError::DuplicateLink {
        path,
        descriptor,
        existing: existing.descriptor().clone(),
      });
    }
    trace!(path = %path, "adding entry point");
    let node = ModelNode::new(path.clone(), descriptor, promise, adapter);
    Ok(self.nodes.entry(path).or_insert(node))
  }

  /// Attaches a pre-built child node under its (existing) parent.
  pub fn add(&mut self, node: ModelNode) -> Result<&ModelNode, ModelError> {
    let path = node.path().clone();
    let parent_path = path.parent().ok_or_else(|| ModelError::TopLevelLink { path: path.clone() })?;
    if let Some(existing) = self.nodes.get(&path) {
      return Err(ModelError::DuplicateLink {
        path,
        descriptor: node.descriptor().clone(),
        existing: existing.descriptor().clone(),
      });
    }
    let parent = self
      .nodes
      .get_mut(&parent_path)
      .ok_or(ModelError::NoNode { path: parent_path })?;
    parent.link(path.name(), path.clone());
    trace!(path = %path, "adding link");
    Ok(self.nodes.entry(path).or_insert(node))
  }

  /// Detaches `path` and its whole subtree. Returns the removed paths.
  pub fn remove(&mut self, path: &ModelPath) -> Vec<ModelPath> {
    if !self.nodes.contains_key(path) {
      return Vec::new();
    }
    if let Some(parent) = path.parent().and_then(|p| self.nodes.get_mut(&p)) {
      parent.unlink(path.name());
    }
    let removed: Vec<ModelPath> = self
      .nodes
      .keys()
      .filter(|p| p.is_within(path))
      .cloned()
      .collect();
    for p in &removed {
      self.nodes.shift_remove(p);
    }
    trace!(path = %path, count = removed.len(), "removed subtree");
    removed
  }

  /// Snapshot of every known node, in creation order.
  pub fn flatten(&self) -> IndexMap<ModelPath, ModelCreation> {
    self
      .nodes
      .iter()
      .map(|(path, node)| (path.clone(), node.creation()))
      .collect()
  }

  pub fn paths(&self) -> impl Iterator<Item = &ModelPath> {
    self.nodes.keys()
  }
}
