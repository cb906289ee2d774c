//! Creation and mutation rules, plus closure-backed builders for them.

mod creators;
#[cfg(test)]
mod creators_test;
mod mutators;

use std::any::Any;
use std::rc::Rc;

use crate::error::RuleError;
use crate::registry::MutableModelNode;
use crate::types::{Inputs, ModelAdapter, ModelPath, ModelPromise, ModelReference, ModelRuleDescriptor};

pub use creators::{FnModelCreator, ModelCreatorBuilder, ModelCreators};
pub use mutators::{FnModelMutator, ModelMutatorBuilder, ModelMutators};

/// Rule that first populates a node's backing value.
pub trait ModelCreator {
  fn path(&self) -> &ModelPath;

  fn descriptor(&self) -> &ModelRuleDescriptor;

  fn promise(&self) -> Rc<dyn ModelPromise>;

  fn adapter(&self) -> Rc<dyn ModelAdapter>;

  fn inputs(&self) -> &[ModelReference];

  /// Populates the node (usually via `set_private_data`).
  fn create(&self, node: &mut MutableModelNode<'_>, inputs: &Inputs) -> Result<(), RuleError>;
}

/// Rule that alters a node's backing value at one mutation stage.
pub trait ModelMutator {
  fn subject(&self) -> &ModelReference;

  fn descriptor(&self) -> &ModelRuleDescriptor;

  fn inputs(&self) -> &[ModelReference];

  /// `subject` is the instance of the writable view of the subject node.
  fn mutate(
    &self,
    node: &mut MutableModelNode<'_>,
    subject: &dyn Any,
    inputs: &Inputs,
  ) -> Result<(), RuleError>;
}
