//! Closeable decorator handed to rules that configure a collection.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::{Configurator, NamedCollection, configurator};
use crate::error::{ModelError, RuleError};
use crate::types::{ModelRuleDescriptor, ModelType};

/// Shared by a builder and every typed projection of it.
struct ViewGuard {
  closed: Cell<bool>,
  ty: ModelType,
  descriptor: Option<ModelRuleDescriptor>,
}

/// Forwards to an underlying [NamedCollection] while its owning rule runs.
///
/// Once closed, every mutating call fails with [ModelError::ViewClosed].
/// Reads (`size`, `get`, `names`, `with_type`, `property`) keep working.
pub struct CollectionBuilder<T> {
  raw: Rc<dyn NamedCollection<T>>,
  guard: Rc<ViewGuard>,
}

impl<T> Clone for CollectionBuilder<T> {
  fn clone(&self) -> Self {
    Self {
      raw: self.raw.clone(),
      guard: self.guard.clone(),
    }
  }
}

/// One argument of a name-based call (see [CollectionBuilder::invoke]).
pub enum CollectionCallArg<T> {
  Type(ModelType),
  Configure(Configurator<T>),
  /// Anything else; never matches a call shape.
  Value(String),
}

impl<T> CollectionCallArg<T> {
  pub fn configure<F>(action: F) -> Self
  where
    F: Fn(&mut T) -> Result<(), RuleError> + 'static,
  {
    Self::Configure(configurator(action))
  }

  fn shape(&self) -> &'static str {
    match self {
      Self::Type(_) => "type",
      Self::Configure(_) => "configurator",
      Self::Value(_) => "value",
    }
  }
}

impl<T: 'static> CollectionBuilder<T> {
  /// Open builder over `raw`. `descriptor` names the rule owning it.
  pub fn new(raw: Rc<dyn NamedCollection<T>>, descriptor: Option<ModelRuleDescriptor>) -> Self {
    Self {
      raw,
      guard: Rc::new(ViewGuard {
        closed: Cell::new(false),
        ty: ModelType::of::<CollectionBuilder<T>>(),
        descriptor,
      }),
    }
  }

  /// Builder that rejects mutation from the start.
  pub fn read_only(raw: Rc<dyn NamedCollection<T>>) -> Self {
    let builder = Self::new(raw, None);
    builder.close();
    builder
  }

  pub fn is_closed(&self) -> bool {
    self.guard.closed.get()
  }

  /// Closes this builder and every projection sharing its guard.
  pub(crate) fn close(&self) {
    self.guard.closed.set(true);
  }

  fn assert_not_closed(&self) -> Result<(), ModelError> {
    if self.is_closed() {
      return Err(ModelError::ViewClosed {
        ty: self.guard.ty,
        descriptor: self.guard.descriptor.clone(),
      });
    }
    Ok(())
  }

  pub fn size(&self) -> usize {
    self.raw.size()
  }

  pub fn get(&self, name: &str) -> Result<Option<Rc<RefCell<T>>>, ModelError> {
    self.raw.get(name)
  }

  pub fn names(&self) -> Vec<String> {
    self.raw.names()
  }

  /// Projection onto elements tagged `ty`. Closes together with `self`.
  pub fn with_type(&self, ty: ModelType) -> CollectionBuilder<T> {
    Self {
      raw: self.raw.with_type(ty),
      guard: self.guard.clone(),
    }
  }

  pub fn create(&self, name: &str) -> Result<(), ModelError> {
    self.assert_not_closed()?;
    self.raw.create(name, None, None)
  }

  pub fn create_with<F>(&self, name: &str, action: F) -> Result<(), ModelError>
  where
    F: Fn(&mut T) -> Result<(), RuleError> + 'static,
  {
    self.assert_not_closed()?;
    self.raw.create(name, None, Some(configurator(action)))
  }

  pub fn create_typed(&self, name: &str, ty: ModelType) -> Result<(), ModelError> {
    self.assert_not_closed()?;
    self.raw.create(name, Some(ty), None)
  }

  pub fn create_typed_with<F>(&self, name: &str, ty: ModelType, action: F) -> Result<(), ModelError>
  where
    F: Fn(&mut T) -> Result<(), RuleError> + 'static,
  {
    self.assert_not_closed()?;
    self.raw.create(name, Some(ty), Some(configurator(action)))
  }

  pub fn named<F>(&self, name: &str, action: F) -> Result<(), ModelError>
  where
    F: Fn(&mut T) -> Result<(), RuleError> + 'static,
  {
    self.assert_not_closed()?;
    self.raw.named(name, configurator(action))
  }

  pub fn before_each<F>(&self, action: F) -> Result<(), ModelError>
  where
    F: Fn(&mut T) -> Result<(), RuleError> + 'static,
  {
    self.assert_not_closed()?;
    self.raw.before_each(None, configurator(action))
  }

  pub fn before_each_typed<F>(&self, ty: ModelType, action: F) -> Result<(), ModelError>
  where
    F: Fn(&mut T) -> Result<(), RuleError> + 'static,
  {
    self.assert_not_closed()?;
    self.raw.before_each(Some(ty), configurator(action))
  }

  pub fn all<F>(&self, action: F) -> Result<(), ModelError>
  where
    F: Fn(&mut T) -> Result<(), RuleError> + 'static,
  {
    self.assert_not_closed()?;
    self.raw.all(configurator(action))
  }

  pub fn with_type_each<F>(&self, ty: ModelType, action: F) -> Result<(), ModelError>
  where
    F: Fn(&mut T) -> Result<(), RuleError> + 'static,
  {
    self.assert_not_closed()?;
    self.raw.with_type_each(ty, configurator(action))
  }

  pub fn finalize_all<F>(&self, action: F) -> Result<(), ModelError>
  where
    F: Fn(&mut T) -> Result<(), RuleError> + 'static,
  {
    self.assert_not_closed()?;
    self.raw.finalize_all(None, configurator(action))
  }

  pub fn finalize_all_typed<F>(&self, ty: ModelType, action: F) -> Result<(), ModelError>
  where
    F: Fn(&mut T) -> Result<(), RuleError> + 'static,
  {
    self.assert_not_closed()?;
    self.raw.finalize_all(Some(ty), configurator(action))
  }

  /// Attribute-style lookup: the element named `name`, which must exist.
  pub fn property(&self, name: &str) -> Result<Rc<RefCell<T>>, ModelError> {
    self.get(name)?.ok_or_else(|| ModelError::UnknownElement {
      name: name.to_string(),
      element_type: ModelType::of::<T>(),
    })
  }

  /// Name-based call dispatch:
  ///
  /// - `name(Type)` creates `name` with that type;
  /// - `name(Type, configure)` creates it with that type and action;
  /// - `name(configure)` configures the existing or future element `name`.
  ///
  /// Any other argument shape fails with [ModelError::UnrecognizedCall].
  pub fn invoke(&self, name: &str, args: &[CollectionCallArg<T>]) -> Result<(), ModelError> {
    match args {
      [CollectionCallArg::Type(ty)] => self.create_typed(name, *ty),
      [CollectionCallArg::Type(ty), CollectionCallArg::Configure(action)] => {
        self.assert_not_closed()?;
        self.raw.create(name, Some(*ty), Some(action.clone()))
      }
      [CollectionCallArg::Configure(action)] => {
        self.assert_not_closed()?;
        self.raw.named(name, action.clone())
      }
      other => Err(ModelError::UnrecognizedCall {
        name: name.to_string(),
        shape: other
          .iter()
          .map(CollectionCallArg::shape)
          .collect::<Vec<_>>()
          .join(", "),
      }),
    }
  }
}

impl<T: 'static> fmt::Debug for CollectionBuilder<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CollectionBuilder")
      .field("elements", &self.names())
      .field("closed", &self.is_closed())
      .finish()
  }
}
