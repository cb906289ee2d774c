//! Opaque, type-tagged slot holding a node's backing object.

use std::any::Any;
use std::fmt;

use super::ModelType;

/// Backing object of a node, stashed by its creator and read by its adapter.
#[derive(Default)]
pub struct PrivateData {
  slot: Option<(ModelType, Box<dyn Any>)>,
}

impl PrivateData {
  pub fn is_empty(&self) -> bool {
    self.slot.is_none()
  }

  /// Type of the stored value, if any.
  pub fn model_type(&self) -> Option<ModelType> {
    self.slot.as_ref().map(|(ty, _)| *ty)
  }

  pub fn get_ref<T: 'static>(&self) -> Option<&T> {
    self
      .slot
      .as_ref()
      .and_then(|(_, value)| value.downcast_ref::<T>())
  }

  /// Clone of the stored value if it is a `T`.
  pub fn get<T: Clone + 'static>(&self) -> Option<T> {
    self.get_ref::<T>().cloned()
  }

  pub fn set<T: 'static>(&mut self, value: T) {
    self.slot = Some((ModelType::of::<T>(), Box::new(value)));
  }
}

impl fmt::Debug for PrivateData {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.slot {
      Some((ty, _)) => write!(f, "PrivateData({})", ty),
      None => write!(f, "PrivateData(<empty>)"),
    }
  }
}
