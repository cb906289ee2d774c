//! Typed, closeable projections of a node's value.

use std::any::Any;

use super::ModelType;

/// A typed projection of a node's live value.
///
/// Views handed to mutators are closed by the registry as soon as the rule
/// returns; a closed view rejects further mutation.
pub trait ModelView {
  fn model_type(&self) -> ModelType;

  /// The projected value; downcast to the view's type.
  fn instance(&self) -> &dyn Any;

  fn close(&mut self) {}
}

/// View over a plain value. Closing is a no-op.
#[derive(Debug, Clone)]
pub struct InstanceModelView<T> {
  ty: ModelType,
  instance: T,
}

impl<T: 'static> InstanceModelView<T> {
  pub fn of(instance: T) -> Self {
    Self {
      ty: ModelType::of::<T>(),
      instance,
    }
  }
}

impl<T: 'static> ModelView for InstanceModelView<T> {
  fn model_type(&self) -> ModelType {
    self.ty
  }

  fn instance(&self) -> &dyn Any {
    &self.instance
  }
}
