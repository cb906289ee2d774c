//! Model views and adapter exposing a collection node as a [CollectionBuilder].

use std::any::Any;
use std::marker::PhantomData;
use std::rc::Rc;

use super::{CollectionBuilder, DefaultNamedCollection, NamedCollection};
use crate::types::{
  Inputs, ModelAdapter, ModelPromise, ModelRuleDescriptor, ModelType, ModelView, PrivateData,
  SimpleModelPromise,
};

/// View of a collection node; closing it closes the builder it hands out.
pub struct CollectionBuilderModelView<T> {
  instance: CollectionBuilder<T>,
}

impl<T: 'static> CollectionBuilderModelView<T> {
  pub fn new(instance: CollectionBuilder<T>) -> Self {
    Self { instance }
  }

  pub fn builder(&self) -> &CollectionBuilder<T> {
    &self.instance
  }
}

impl<T: 'static> ModelView for CollectionBuilderModelView<T> {
  fn model_type(&self) -> ModelType {
    ModelType::of::<CollectionBuilder<T>>()
  }

  fn instance(&self) -> &dyn Any {
    &self.instance
  }

  fn close(&mut self) {
    self.instance.close();
  }
}

/// Adapter for nodes whose private data is a collection of `T`, stored either
/// as an `Rc<dyn NamedCollection<T>>` or a [DefaultNamedCollection].
///
/// Writable views are open until the registry closes them after the owning
/// rule returns. Read-only views are closed from the start.
pub struct CollectionBuilderAdapter<T> {
  _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> CollectionBuilderAdapter<T> {
  pub fn new() -> Self {
    Self {
      _marker: PhantomData,
    }
  }

  /// Promise of a node served by this adapter.
  pub fn promise() -> Rc<dyn ModelPromise> {
    let ty = ModelType::of::<CollectionBuilder<T>>();
    Rc::new(SimpleModelPromise::new().read_only_as(ty).writable_as(ty))
  }

  fn raw(ty: &ModelType, data: &PrivateData) -> Option<Rc<dyn NamedCollection<T>>> {
    if !ty.is::<CollectionBuilder<T>>() {
      return None;
    }
    data.get::<Rc<dyn NamedCollection<T>>>().or_else(|| {
      data
        .get::<DefaultNamedCollection<T>>()
        .map(|collection| Rc::new(collection) as Rc<dyn NamedCollection<T>>)
    })
  }
}

impl<T: 'static> Default for CollectionBuilderAdapter<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: 'static> ModelAdapter for CollectionBuilderAdapter<T> {
  fn as_read_only(
    &self,
    ty: &ModelType,
    data: &PrivateData,
    _descriptor: Option<&ModelRuleDescriptor>,
  ) -> Option<Box<dyn ModelView>> {
    let raw = Self::raw(ty, data)?;
    Some(Box::new(CollectionBuilderModelView::new(CollectionBuilder::read_only(raw))))
  }

  fn as_writable(
    &self,
    ty: &ModelType,
    data: &PrivateData,
    descriptor: &ModelRuleDescriptor,
    _inputs: &Inputs,
  ) -> Option<Box<dyn ModelView>> {
    let raw = Self::raw(ty, data)?;
    let builder = CollectionBuilder::new(raw, Some(descriptor.clone()));
    Some(Box::new(CollectionBuilderModelView::new(builder)))
  }
}
