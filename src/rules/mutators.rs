//! Closure-backed mutators.

use std::any::Any;
use std::marker::PhantomData;

use super::ModelMutator;
use crate::error::{ModelError, RuleError};
use crate::registry::MutableModelNode;
use crate::types::{Inputs, ModelPath, ModelReference, ModelRuleDescriptor, ModelType};

type MutateAction = dyn Fn(&mut MutableModelNode<'_>, &dyn Any, &Inputs) -> Result<(), RuleError>;

fn erase<F>(action: F) -> Box<MutateAction>
where
  F: Fn(&mut MutableModelNode<'_>, &dyn Any, &Inputs) -> Result<(), RuleError> + 'static,
{
  Box::new(action)
}

/// A mutator whose body is a closure over the typed subject.
pub struct FnModelMutator {
  subject: ModelReference,
  descriptor: ModelRuleDescriptor,
  inputs: Vec<ModelReference>,
  action: Box<MutateAction>,
}

impl ModelMutator for FnModelMutator {
  fn subject(&self) -> &ModelReference {
    &self.subject
  }

  fn descriptor(&self) -> &ModelRuleDescriptor {
    &self.descriptor
  }

  fn inputs(&self) -> &[ModelReference] {
    &self.inputs
  }

  fn mutate(
    &self,
    node: &mut MutableModelNode<'_>,
    subject: &dyn Any,
    inputs: &Inputs,
  ) -> Result<(), RuleError> {
    (self.action)(node, subject, inputs)
  }
}

/// Entry points for building mutators.
pub struct ModelMutators;

impl ModelMutators {
  /// Mutator of the node at `path`, viewed as `T`.
  pub fn path<T: 'static>(
    path: ModelPath,
    descriptor: impl Into<ModelRuleDescriptor>,
  ) -> ModelMutatorBuilder<T> {
    ModelMutatorBuilder::new(ModelReference::of::<T>(path), descriptor.into())
  }

  /// Mutator of whichever node is viewable as `T` (type-only subject).
  pub fn by_type<T: 'static>(descriptor: impl Into<ModelRuleDescriptor>) -> ModelMutatorBuilder<T> {
    ModelMutatorBuilder::new(ModelReference::of_type::<T>(), descriptor.into())
  }
}

/// Accumulates inputs for a mutator, then takes its body.
pub struct ModelMutatorBuilder<T> {
  subject: ModelReference,
  descriptor: ModelRuleDescriptor,
  inputs: Vec<ModelReference>,
  _subject: PhantomData<fn(&T)>,
}

impl<T: 'static> ModelMutatorBuilder<T> {
  fn new(subject: ModelReference, descriptor: ModelRuleDescriptor) -> Self {
    Self {
      subject,
      descriptor,
      inputs: Vec::new(),
      _subject: PhantomData,
    }
  }

  pub fn input(mut self, reference: ModelReference) -> Self {
    self.inputs.push(reference);
    self
  }

  pub fn inputs(mut self, references: impl IntoIterator<Item = ModelReference>) -> Self {
    self.inputs.extend(references);
    self
  }

  pub fn build<F>(self, action: F) -> FnModelMutator
  where
    F: Fn(&mut MutableModelNode<'_>, &T, &Inputs) -> Result<(), RuleError> + 'static,
  {
    FnModelMutator {
      subject: self.subject,
      descriptor: self.descriptor,
      inputs: self.inputs,
      action: erase(move |node, subject, inputs| {
        let subject = subject
          .downcast_ref::<T>()
          .ok_or_else(|| ModelError::IncompatibleView {
            path: node.path().clone(),
            ty: ModelType::of::<T>(),
            operation: "mutate",
          })?;
        action(node, subject, inputs)
      }),
    }
  }
}
