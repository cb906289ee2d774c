//! Resolved input views handed to rule bodies.

use std::any::Any;

use super::{ModelBinding, ModelView};

/// One resolved input: its binding plus a read-only view of the bound node.
pub struct ModelRuleInput {
  binding: ModelBinding,
  view: Box<dyn ModelView>,
}

impl ModelRuleInput {
  pub fn new(binding: ModelBinding, view: Box<dyn ModelView>) -> Self {
    Self { binding, view }
  }

  pub fn binding(&self) -> &ModelBinding {
    &self.binding
  }

  pub fn instance(&self) -> &dyn Any {
    self.view.instance()
  }
}

/// Ordered inputs of a rule, in the order its references were declared.
#[derive(Default)]
pub struct Inputs {
  inputs: Vec<ModelRuleInput>,
}

impl Inputs {
  pub fn new(inputs: Vec<ModelRuleInput>) -> Self {
    Self { inputs }
  }

  pub fn len(&self) -> usize {
    self.inputs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inputs.is_empty()
  }

  /// The input at `index` viewed as `T`.
  pub fn get<T: 'static>(&self, index: usize) -> Option<&T> {
    self.inputs.get(index)?.instance().downcast_ref::<T>()
  }

  pub fn binding(&self, index: usize) -> Option<&ModelBinding> {
    self.inputs.get(index).map(ModelRuleInput::binding)
  }

  pub fn iter(&self) -> impl Iterator<Item = &ModelRuleInput> {
    self.inputs.iter()
  }
}
