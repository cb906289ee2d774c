//! Closure-backed creators.

use std::rc::Rc;

use super::ModelCreator;
use crate::collection::{CollectionBuilderAdapter, DefaultNamedCollection};
use crate::error::RuleError;
use crate::registry::MutableModelNode;
use crate::types::{
  Inputs, InstanceModelAdapter, ModelAdapter, ModelPath, ModelPromise, ModelReference,
  ModelRuleDescriptor, SimpleModelPromise,
};

type CreateAction = dyn Fn(&mut MutableModelNode<'_>, &Inputs) -> Result<(), RuleError>;

/// A creator whose body is a closure.
pub struct FnModelCreator {
  path: ModelPath,
  descriptor: ModelRuleDescriptor,
  promise: Rc<dyn ModelPromise>,
  adapter: Rc<dyn ModelAdapter>,
  inputs: Vec<ModelReference>,
  action: Box<CreateAction>,
}

impl ModelCreator for FnModelCreator {
  fn path(&self) -> &ModelPath {
    &self.path
  }

  fn descriptor(&self) -> &ModelRuleDescriptor {
    &self.descriptor
  }

  fn promise(&self) -> Rc<dyn ModelPromise> {
    self.promise.clone()
  }

  fn adapter(&self) -> Rc<dyn ModelAdapter> {
    self.adapter.clone()
  }

  fn inputs(&self) -> &[ModelReference] {
    &self.inputs
  }

  fn create(&self, node: &mut MutableModelNode<'_>, inputs: &Inputs) -> Result<(), RuleError> {
    (self.action)(node, inputs)
  }
}

/// Entry points for building creators.
pub struct ModelCreators;

impl ModelCreators {
  /// Creator at `path` with an explicit promise and adapter.
  pub fn of(
    path: ModelPath,
    descriptor: impl Into<ModelRuleDescriptor>,
    promise: Rc<dyn ModelPromise>,
    adapter: Rc<dyn ModelAdapter>,
  ) -> ModelCreatorBuilder {
    ModelCreatorBuilder {
      path,
      descriptor: descriptor.into(),
      promise,
      adapter,
      inputs: Vec::new(),
    }
  }

  /// Creator for a node whose private data is a `T`, viewable as `T`.
  pub fn instance<T: Clone + 'static>(
    path: ModelPath,
    descriptor: impl Into<ModelRuleDescriptor>,
  ) -> ModelCreatorBuilder {
    Self::of(
      path,
      descriptor,
      Rc::new(SimpleModelPromise::of::<T>()),
      Rc::new(InstanceModelAdapter::<T>::new()),
    )
  }

  /// Creator for a collection node viewable as `CollectionBuilder<T>`, backed
  /// by `collection`.
  pub fn collection<T: 'static>(
    path: ModelPath,
    descriptor: impl Into<ModelRuleDescriptor>,
    collection: DefaultNamedCollection<T>,
  ) -> FnModelCreator {
    Self::of(
      path,
      descriptor,
      CollectionBuilderAdapter::<T>::promise(),
      Rc::new(CollectionBuilderAdapter::<T>::new()),
    )
    .build(move |node, _| {
      node.set_private_data(collection.clone())?;
      Ok(())
    })
  }
}

/// Accumulates inputs for a creator, then takes its body.
pub struct ModelCreatorBuilder {
  path: ModelPath,
  descriptor: ModelRuleDescriptor,
  promise: Rc<dyn ModelPromise>,
  adapter: Rc<dyn ModelAdapter>,
  inputs: Vec<ModelReference>,
}

impl ModelCreatorBuilder {
  pub fn input(mut self, reference: ModelReference) -> Self {
    self.inputs.push(reference);
    self
  }

  pub fn inputs(mut self, references: impl IntoIterator<Item = ModelReference>) -> Self {
    self.inputs.extend(references);
    self
  }

  pub fn build<F>(self, action: F) -> FnModelCreator
  where
    F: Fn(&mut MutableModelNode<'_>, &Inputs) -> Result<(), RuleError> + 'static,
  {
    FnModelCreator {
      path: self.path,
      descriptor: self.descriptor,
      promise: self.promise,
      adapter: self.adapter,
      inputs: self.inputs,
      action: Box::new(action),
    }
  }

  /// Body that stores the value returned by `factory` as the node's private data.
  pub fn value<T, F>(self, factory: F) -> FnModelCreator
  where
    T: 'static,
    F: Fn(&Inputs) -> Result<T, RuleError> + 'static,
  {
    self.build(move |node, inputs| {
      let value = factory(inputs)?;
      node.set_private_data(value)?;
      Ok(())
    })
  }
}
