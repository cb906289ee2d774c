//! References from rules to model elements, and their resolved bindings.

use std::fmt;

use super::{ModelPath, ModelType};

/// What a rule wants to read or mutate: an optional path plus a required type.
///
/// A reference without a path binds by type: the registry looks for the single
/// top-level node whose promise is compatible with the type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelReference {
  path: Option<ModelPath>,
  ty: ModelType,
}

impl ModelReference {
  pub fn new(path: Option<ModelPath>, ty: ModelType) -> Self {
    Self { path, ty }
  }

  /// Reference to `path`, viewed as `T`.
  pub fn of<T: ?Sized + 'static>(path: ModelPath) -> Self {
    Self::new(Some(path), ModelType::of::<T>())
  }

  /// Type-only reference to a `T`.
  pub fn of_type<T: ?Sized + 'static>() -> Self {
    Self::new(None, ModelType::of::<T>())
  }

  pub fn path(&self) -> Option<&ModelPath> {
    self.path.as_ref()
  }

  pub fn model_type(&self) -> &ModelType {
    &self.ty
  }

  /// Same type, pinned to `path`.
  pub fn at(&self, path: ModelPath) -> Self {
    Self::new(Some(path), self.ty)
  }
}

impl fmt::Display for ModelReference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.path {
      Some(path) => write!(f, "{} ({})", path, self.ty),
      None => write!(f, "<unspecified> ({})", self.ty),
    }
  }
}

/// A reference resolved to a concrete path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelBinding {
  reference: ModelReference,
  path: ModelPath,
}

impl ModelBinding {
  pub fn new(reference: ModelReference, path: ModelPath) -> Self {
    Self { reference, path }
  }

  pub fn reference(&self) -> &ModelReference {
    &self.reference
  }

  pub fn path(&self) -> &ModelPath {
    &self.path
  }

  pub fn model_type(&self) -> &ModelType {
    self.reference.model_type()
  }
}
