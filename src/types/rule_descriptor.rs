//! Human-readable identity of a model rule, used in diagnostics.

use std::fmt;
use std::rc::Rc;

use serde::{Serialize, Serializer};

/// Describes a rule (e.g. `plugin.tasks(CollectionBuilder)`). Cheap to clone.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ModelRuleDescriptor(Rc<str>);

impl ModelRuleDescriptor {
  pub fn new(description: impl AsRef<str>) -> Self {
    Self(Rc::from(description.as_ref()))
  }

  /// Descriptor for a rule derived from this one, rendered `parent > child`.
  pub fn nested(&self, child: impl fmt::Display) -> Self {
    Self::new(format!("{} > {}", self.0, child))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ModelRuleDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl fmt::Debug for ModelRuleDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}", &*self.0)
  }
}

impl From<&str> for ModelRuleDescriptor {
  fn from(description: &str) -> Self {
    Self::new(description)
  }
}

impl From<String> for ModelRuleDescriptor {
  fn from(description: String) -> Self {
    Self::new(description)
  }
}

impl Serialize for ModelRuleDescriptor {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0)
  }
}
