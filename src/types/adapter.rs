//! Adapters produce typed views of a node's private data.

use std::marker::PhantomData;

use super::{
  Inputs, InstanceModelView, ModelRuleDescriptor, ModelType, ModelView, PrivateData,
};

/// Produces read-only or writable views of a node's private data.
///
/// Returns `None` when the requested type cannot be produced.
pub trait ModelAdapter {
  fn as_read_only(
    &self,
    ty: &ModelType,
    data: &PrivateData,
    descriptor: Option<&ModelRuleDescriptor>,
  ) -> Option<Box<dyn ModelView>>;

  fn as_writable(
    &self,
    ty: &ModelType,
    data: &PrivateData,
    descriptor: &ModelRuleDescriptor,
    inputs: &Inputs,
  ) -> Option<Box<dyn ModelView>>;
}

/// Views a private value of type `T` as `T`.
///
/// `T` is usually a shared handle (e.g. `Rc<RefCell<_>>`), so read-only and
/// writable views see the same live object.
#[derive(Debug)]
pub struct InstanceModelAdapter<T> {
  _marker: PhantomData<fn() -> T>,
}

impl<T: Clone + 'static> InstanceModelAdapter<T> {
  pub fn new() -> Self {
    Self {
      _marker: PhantomData,
    }
  }

  fn view(&self, ty: &ModelType, data: &PrivateData) -> Option<Box<dyn ModelView>> {
    if !ty.is::<T>() {
      return None;
    }
    let instance = data.get::<T>()?;
    Some(Box::new(InstanceModelView::of(instance)))
  }
}

impl<T: Clone + 'static> Default for InstanceModelAdapter<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Clone + 'static> ModelAdapter for InstanceModelAdapter<T> {
  fn as_read_only(
    &self,
    ty: &ModelType,
    data: &PrivateData,
    _descriptor: Option<&ModelRuleDescriptor>,
  ) -> Option<Box<dyn ModelView>> {
    self.view(ty, data)
  }

  fn as_writable(
    &self,
    ty: &ModelType,
    data: &PrivateData,
    _descriptor: &ModelRuleDescriptor,
    _inputs: &Inputs,
  ) -> Option<Box<dyn ModelView>> {
    self.view(ty, data)
  }
}
