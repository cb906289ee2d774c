//! What a node's eventual value can be viewed as.

use super::ModelType;

/// Declares which types a node can be viewed as, before its value exists.
pub trait ModelPromise {
  fn can_be_viewed_as_read_only(&self, ty: &ModelType) -> bool;

  fn can_be_viewed_as_writable(&self, ty: &ModelType) -> bool;

  /// Names of the read-only view types, for diagnostics.
  fn read_only_type_descriptions(&self) -> Vec<String>;

  /// Names of the writable view types, for diagnostics.
  fn writable_type_descriptions(&self) -> Vec<String>;
}

/// Promise backed by explicit lists of read-only and writable types.
#[derive(Debug, Clone, Default)]
pub struct SimpleModelPromise {
  read_only: Vec<ModelType>,
  writable: Vec<ModelType>,
}

impl SimpleModelPromise {
  pub fn new() -> Self {
    Self::default()
  }

  /// Promise for a value viewable (read-only and writable) as `T`.
  pub fn of<T: ?Sized + 'static>() -> Self {
    Self::new().read_only_as(ModelType::of::<T>()).writable_as(ModelType::of::<T>())
  }

  pub fn read_only_as(mut self, ty: ModelType) -> Self {
    if !self.read_only.contains(&ty) {
      self.read_only.push(ty);
    }
    self
  }

  pub fn writable_as(mut self, ty: ModelType) -> Self {
    if !self.writable.contains(&ty) {
      self.writable.push(ty);
    }
    self
  }
}

impl ModelPromise for SimpleModelPromise {
  fn can_be_viewed_as_read_only(&self, ty: &ModelType) -> bool {
    self.read_only.contains(ty)
  }

  fn can_be_viewed_as_writable(&self, ty: &ModelType) -> bool {
    self.writable.contains(ty)
  }

  fn read_only_type_descriptions(&self) -> Vec<String> {
    self.read_only.iter().map(ToString::to_string).collect()
  }

  fn writable_type_descriptions(&self) -> Vec<String> {
    self.writable.iter().map(ToString::to_string).collect()
  }
}
