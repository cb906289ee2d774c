//! Named, dynamically extensible collections of model elements, and the
//! closeable builder view rules use to configure them.
//!
//! Element "subtypes" are modelled as [ModelType] tags: every element has a
//! common Rust type `T` plus the tag it was created with, and typed rules
//! only see elements carrying their tag.

mod builder;
mod default_collection;
mod view;

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{ModelError, RuleError};
use crate::types::ModelType;

pub use builder::{CollectionBuilder, CollectionCallArg};
pub use default_collection::DefaultNamedCollection;
pub use view::{CollectionBuilderAdapter, CollectionBuilderModelView};

/// Configuration action applied to an element. May fail.
pub type Configurator<T> = Rc<dyn Fn(&mut T) -> Result<(), RuleError>>;

/// Wraps a closure as a [Configurator].
pub fn configurator<T, F>(action: F) -> Configurator<T>
where
  F: Fn(&mut T) -> Result<(), RuleError> + 'static,
{
  Rc::new(action)
}

/// Contract of the collection a [CollectionBuilder] decorates.
pub trait NamedCollection<T> {
  /// The same collection restricted to elements tagged `ty`.
  fn with_type(&self, ty: ModelType) -> Rc<dyn NamedCollection<T>>;

  fn size(&self) -> usize;

  /// The element named `name`, realizing it if needed. `Ok(None)` if absent.
  fn get(&self, name: &str) -> Result<Option<Rc<RefCell<T>>>, ModelError>;

  /// Element names in creation order.
  fn names(&self) -> Vec<String>;

  /// Declares an element. `ty` of `None` means the default element type.
  fn create(
    &self,
    name: &str,
    ty: Option<ModelType>,
    action: Option<Configurator<T>>,
  ) -> Result<(), ModelError>;

  /// Configures the element named `name`, now or once it exists.
  fn named(&self, name: &str, action: Configurator<T>) -> Result<(), ModelError>;

  /// Runs before any other configuration of matching elements.
  fn before_each(&self, ty: Option<ModelType>, action: Configurator<T>) -> Result<(), ModelError>;

  fn all(&self, action: Configurator<T>) -> Result<(), ModelError>;

  fn with_type_each(&self, ty: ModelType, action: Configurator<T>) -> Result<(), ModelError>;

  /// Runs after every other configuration of matching elements.
  fn finalize_all(&self, ty: Option<ModelType>, action: Configurator<T>) -> Result<(), ModelError>;
}
