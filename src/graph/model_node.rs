//! A single entry of the model graph.

use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

use crate::types::{
  ModelAdapter, ModelNodeState, ModelPath, ModelPromise, ModelRuleDescriptor, PrivateData,
};

/// A model graph entry: identity, lifecycle state, promise, adapter, child
/// links and private data.
pub struct ModelNode {
  path: ModelPath,
  descriptor: ModelRuleDescriptor,
  state: ModelNodeState,
  promise: Rc<dyn ModelPromise>,
  adapter: Rc<dyn ModelAdapter>,
  /// Child name -> child path, in the order children were added.
  links: IndexMap<String, ModelPath>,
  private_data: PrivateData,
}

impl ModelNode {
  pub fn new(
    path: ModelPath,
    descriptor: ModelRuleDescriptor,
    promise: Rc<dyn ModelPromise>,
    adapter: Rc<dyn ModelAdapter>,
  ) -> Self {
    Self {
      path,
      descriptor,
      state: ModelNodeState::Known,
      promise,
      adapter,
      links: IndexMap::new(),
      private_data: PrivateData::default(),
    }
  }

  pub fn path(&self) -> &ModelPath {
    &self.path
  }

  pub fn descriptor(&self) -> &ModelRuleDescriptor {
    &self.descriptor
  }

  pub fn state(&self) -> ModelNodeState {
    self.state
  }

  /// Advances the lifecycle. Never moves backwards.
  pub(crate) fn advance(&mut self, state: ModelNodeState) {
    debug_assert!(state >= self.state, "{} cannot move from {} to {}", self.path, self.state, state);
    self.state = self.state.max(state);
  }

  pub fn promise(&self) -> &Rc<dyn ModelPromise> {
    &self.promise
  }

  pub fn adapter(&self) -> &Rc<dyn ModelAdapter> {
    &self.adapter
  }

  pub fn has_link(&self, name: &str) -> bool {
    self.links.contains_key(name)
  }

  pub fn get_link(&self, name: &str) -> Option<&ModelPath> {
    self.links.get(name)
  }

  pub fn links(&self) -> impl Iterator<Item = &ModelPath> {
    self.links.values()
  }

  pub fn link_names(&self) -> impl Iterator<Item = &str> {
    self.links.keys().map(String::as_str)
  }

  pub(crate) fn link(&mut self, name: &str, path: ModelPath) {
    self.links.insert(name.to_string(), path);
  }

  pub(crate) fn unlink(&mut self, name: &str) {
    self.links.shift_remove(name);
  }

  pub fn private_data(&self) -> &PrivateData {
    &self.private_data
  }

  pub(crate) fn private_data_mut(&mut self) -> &mut PrivateData {
    &mut self.private_data
  }

  /// What listeners are told about this node.
  pub fn creation(&self) -> ModelCreation {
    ModelCreation {
      path: self.path.clone(),
      descriptor: self.descriptor.clone(),
      promise: self.promise.clone(),
    }
  }
}

impl fmt::Debug for ModelNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ModelNode")
      .field("path", &self.path)
      .field("descriptor", &self.descriptor)
      .field("state", &self.state)
      .field("links", &self.links.keys().collect::<Vec<_>>())
      .field("private_data", &self.private_data)
      .finish()
  }
}

/// A node as announced to creation listeners.
#[derive(Clone)]
pub struct ModelCreation {
  path: ModelPath,
  descriptor: ModelRuleDescriptor,
  promise: Rc<dyn ModelPromise>,
}

impl ModelCreation {
  pub fn path(&self) -> &ModelPath {
    &self.path
  }

  pub fn descriptor(&self) -> &ModelRuleDescriptor {
    &self.descriptor
  }

  pub fn promise(&self) -> &dyn ModelPromise {
    self.promise.as_ref()
  }
}

impl fmt::Debug for ModelCreation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ModelCreation")
      .field("path", &self.path)
      .field("descriptor", &self.descriptor)
      .finish()
  }
}
