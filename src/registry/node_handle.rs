//! Per-node handle handed to rules while they run.

use std::rc::Rc;

use super::ModelRegistry;
use crate::error::ModelError;
use crate::rules::{ModelCreator, ModelMutator};
use crate::types::{
  Inputs, ModelAdapter, ModelNodeState, ModelPath, ModelPromise, ModelRuleDescriptor, ModelType,
  ModelView, MutationType,
};

/// Capability surface of a single node: projection, link traversal, adding
/// and removing children, mutating children, and private data access.
///
/// Mutations through this handle are confined to the node's direct children.
pub struct MutableModelNode<'a> {
  registry: &'a mut ModelRegistry,
  path: ModelPath,
}

impl<'a> MutableModelNode<'a> {
  pub(crate) fn new(registry: &'a mut ModelRegistry, path: ModelPath) -> Self {
    Self { registry, path }
  }

  pub fn path(&self) -> &ModelPath {
    &self.path
  }

  pub fn state(&self) -> Result<ModelNodeState, ModelError> {
    Ok(self.registry.require_node(&self.path)?.state())
  }

  pub fn descriptor(&self) -> Result<ModelRuleDescriptor, ModelError> {
    Ok(self.registry.require_node(&self.path)?.descriptor().clone())
  }

  pub fn promise(&self) -> Result<Rc<dyn ModelPromise>, ModelError> {
    Ok(self.registry.require_node(&self.path)?.promise().clone())
  }

  pub fn adapter(&self) -> Result<Rc<dyn ModelAdapter>, ModelError> {
    Ok(self.registry.require_node(&self.path)?.adapter().clone())
  }

  /// Read-only view of this node as `ty`, if the adapter can produce one.
  pub fn as_read_only(
    &self,
    ty: &ModelType,
    descriptor: Option<&ModelRuleDescriptor>,
  ) -> Result<Option<Box<dyn ModelView>>, ModelError> {
    let node = self.registry.require_node(&self.path)?;
    Ok(node.adapter().as_read_only(ty, node.private_data(), descriptor))
  }

  /// Writable view of this node as `ty`, if the adapter can produce one.
  /// The caller is responsible for closing it.
  pub fn as_writable(
    &self,
    ty: &ModelType,
    descriptor: &ModelRuleDescriptor,
    inputs: &Inputs,
  ) -> Result<Option<Box<dyn ModelView>>, ModelError> {
    let node = self.registry.require_node(&self.path)?;
    Ok(node.adapter().as_writable(ty, node.private_data(), descriptor, inputs))
  }

  pub fn has_link(&self, name: &str) -> bool {
    self
      .registry
      .graph
      .find(&self.path)
      .is_some_and(|node| node.has_link(name))
  }

  pub fn link_names(&self) -> Vec<String> {
    self
      .registry
      .graph
      .find(&self.path)
      .map(|node| node.link_names().map(str::to_string).collect())
      .unwrap_or_default()
  }

  /// Handle to the child `name`, without closing it.
  pub fn link(&mut self, name: &str) -> Option<MutableModelNode<'_>> {
    let child = self.registry.graph.find(&self.path)?.get_link(name)?.clone();
    if !self.registry.graph.contains(&child) {
      return None;
    }
    Some(MutableModelNode::new(self.registry, child))
  }

  /// Number of children whose promise is writable as `ty`.
  pub fn link_count(&self, ty: &ModelType) -> usize {
    let graph = &self.registry.graph;
    graph
      .find(&self.path)
      .map(|node| {
        node
          .links()
          .filter_map(|child| graph.find(child))
          .filter(|child| child.promise().can_be_viewed_as_writable(ty))
          .count()
      })
      .unwrap_or(0)
  }

  /// Registers a mutator whose subject is a direct child of this node.
  pub fn mutate_link(
    &mut self,
    stage: MutationType,
    mutator: impl ModelMutator + 'static,
  ) -> Result<(), ModelError> {
    let is_child = mutator
      .subject()
      .path()
      .and_then(ModelPath::parent)
      .is_some_and(|parent| parent == self.path);
    if !is_child {
      return Err(ModelError::LinkSubjectNotChild {
        parent: self.path.clone(),
        descriptor: mutator.descriptor().clone(),
      });
    }
    self.registry.mutate(stage, mutator)
  }

  /// Registers a type-only mutator against every direct child writable as
  /// its subject type, including children added later.
  pub fn mutate_all_links(
    &mut self,
    stage: MutationType,
    mutator: impl ModelMutator + 'static,
  ) -> Result<(), ModelError> {
    if mutator.subject().path().is_some() {
      return Err(ModelError::LinkSubjectHasPath {
        parent: self.path.clone(),
        descriptor: mutator.descriptor().clone(),
      });
    }
    self
      .registry
      .register_all_links(self.path.clone(), stage, Rc::new(mutator))
  }

  /// Adds a child created lazily by `creator`, whose path must be a direct
  /// child of this node. The child is `Known` on return.
  pub fn add_link(
    &mut self,
    creator: impl ModelCreator + 'static,
  ) -> Result<MutableModelNode<'_>, ModelError> {
    let path = creator.path().clone();
    if path.parent().as_ref() != Some(&self.path) {
      return Err(ModelError::LinkNotChild {
        parent: self.path.clone(),
        path,
        descriptor: creator.descriptor().clone(),
      });
    }
    self.registry.add_known(Box::new(creator))?;
    Ok(MutableModelNode::new(self.registry, path))
  }

  /// Adds a pre-built child that is `Created` immediately. Its private data
  /// is expected to be set through the returned handle.
  pub fn add_eager_link(
    &mut self,
    name: &str,
    descriptor: impl Into<ModelRuleDescriptor>,
    promise: Rc<dyn ModelPromise>,
    adapter: Rc<dyn ModelAdapter>,
  ) -> Result<MutableModelNode<'_>, ModelError> {
    let path = self.path.child(name);
    self
      .registry
      .add_eager(path.clone(), descriptor.into(), promise, adapter)?;
    Ok(MutableModelNode::new(self.registry, path))
  }

  pub fn remove_link(&mut self, name: &str) -> Result<(), ModelError> {
    let child = self.path.child(name);
    self.registry.remove(&child)
  }

  /// Runs this node's creator now if it has not run yet.
  pub fn ensure_created(&mut self) -> Result<(), ModelError> {
    self.registry.maybe_create(&self.path)
  }

  /// The private data as `T`. `Ok(None)` when nothing is stored yet.
  pub fn private_data<T: Clone + 'static>(&self) -> Result<Option<T>, ModelError> {
    let data = self.registry.require_node(&self.path)?.private_data();
    match data.model_type() {
      None => Ok(None),
      Some(actual) if actual.is::<T>() => Ok(data.get::<T>()),
      Some(actual) => Err(ModelError::PrivateDataType {
        path: self.path.clone(),
        expected: ModelType::of::<T>(),
        actual,
      }),
    }
  }

  pub fn set_private_data<T: 'static>(&mut self, value: T) -> Result<(), ModelError> {
    let node = self
      .registry
      .graph
      .find_mut(&self.path)
      .ok_or_else(|| ModelError::NoNode {
        path: self.path.clone(),
      })?;
    node.private_data_mut().set(value);
    Ok(())
  }
}
