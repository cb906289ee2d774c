//! Runtime type token for model views.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};

/// Identifies the type a node is viewed as. Equality is by `TypeId`.
#[derive(Clone, Copy)]
pub struct ModelType {
  id: TypeId,
  name: &'static str,
}

impl ModelType {
  pub fn of<T: ?Sized + 'static>() -> Self {
    Self {
      id: TypeId::of::<T>(),
      name: type_name::<T>(),
    }
  }

  pub fn is<T: ?Sized + 'static>(&self) -> bool {
    self.id == TypeId::of::<T>()
  }

  pub fn type_id(&self) -> TypeId {
    self.id
  }

  pub fn name(&self) -> &'static str {
    self.name
  }
}

impl PartialEq for ModelType {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for ModelType {}

impl Hash for ModelType {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.id.hash(state);
  }
}

impl fmt::Debug for ModelType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "ModelType({})", self.name)
  }
}

impl fmt::Display for ModelType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name)
  }
}

impl Serialize for ModelType {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.name)
  }
}
