//! Creation listeners: observers told about every node as it becomes known.

use std::rc::Rc;

use super::binder::{BinderId, BinderSlot};
use crate::error::ModelError;
use crate::graph::ModelCreation;
use crate::rules::ModelMutator;
use crate::types::{ModelPath, ModelPromise, ModelReference, ModelRuleDescriptor, MutationType};

/// Observer notified whenever a node becomes known.
///
/// On registration the listener is first replayed every node already known,
/// in creation order.
pub trait ModelCreationListener {
  /// Returns `Ok(true)` to stop listening.
  fn on_create(&mut self, creation: &ModelCreation) -> Result<bool, ModelError>;
}

impl<F> ModelCreationListener for F
where
  F: FnMut(&ModelCreation) -> Result<bool, ModelError>,
{
  fn on_create(&mut self, creation: &ModelCreation) -> Result<bool, ModelError> {
    self(creation)
  }
}

/// What a binder listener wants done after seeing a creation.
#[derive(Debug, PartialEq)]
pub(crate) enum BinderEvent {
  Ignore,
  /// Bind the slot to `path`; `done` unregisters the listener.
  Bind { path: ModelPath, done: bool },
}

/// Resolves one slot of a binder.
///
/// An explicit-path reference binds only to that path and stops listening. A
/// type-only reference binds to the first compatible top-level node and keeps
/// listening so that a second compatible candidate is reported as ambiguous.
pub(crate) struct BinderCreationListener {
  pub(crate) binder: BinderId,
  pub(crate) slot: BinderSlot,
  descriptor: ModelRuleDescriptor,
  reference: ModelReference,
  writable: bool,
  bound_to: Option<(ModelPath, ModelRuleDescriptor)>,
}

impl BinderCreationListener {
  pub(crate) fn new(
    binder: BinderId,
    slot: BinderSlot,
    descriptor: ModelRuleDescriptor,
    reference: ModelReference,
    writable: bool,
  ) -> Self {
    Self {
      binder,
      slot,
      descriptor,
      reference,
      writable,
      bound_to: None,
    }
  }

  fn is_type_compatible(&self, promise: &dyn ModelPromise) -> bool {
    let ty = self.reference.model_type();
    if self.writable {
      promise.can_be_viewed_as_writable(ty)
    } else {
      promise.can_be_viewed_as_read_only(ty)
    }
  }

  /// Resolves `creation` against this slot, remembering a type-only match.
  pub(crate) fn on_create(&mut self, creation: &ModelCreation) -> Result<BinderEvent, ModelError> {
    let event = self.check(creation)?;
    if let BinderEvent::Bind { path, done: false } = &event {
      self.bound_to = Some((path.clone(), creation.descriptor().clone()));
    }
    Ok(event)
  }

  /// What [Self::on_create] would do with `creation`, without recording it.
  pub(crate) fn check(&self, creation: &ModelCreation) -> Result<BinderEvent, ModelError> {
    let path = creation.path();
    if let Some((first, first_creator)) = &self.bound_to {
      if path.is_top_level() && path != first && self.is_type_compatible(creation.promise()) {
        return Err(ModelError::AmbiguousBinding {
          descriptor: self.descriptor.clone(),
          reference: self.reference.clone(),
          first: first.clone(),
          first_creator: first_creator.clone(),
          second: path.clone(),
          second_creator: creation.descriptor().clone(),
        });
      }
      return Ok(BinderEvent::Ignore);
    }

    match self.reference.path() {
      None if path.is_top_level() && self.is_type_compatible(creation.promise()) => {
        Ok(BinderEvent::Bind {
          path: path.clone(),
          done: false,
        })
      }
      Some(expected) if expected == path => {
        if self.is_type_compatible(creation.promise()) {
          Ok(BinderEvent::Bind {
            path: path.clone(),
            done: true,
          })
        } else {
          let promise = creation.promise();
          Err(ModelError::IncompatibleReference {
            descriptor: self.descriptor.clone(),
            reference: self.reference.clone(),
            path: path.clone(),
            creator: creation.descriptor().clone(),
            writable: self.writable,
            read_only_types: promise.read_only_type_descriptions(),
            writable_types: promise.writable_type_descriptions(),
          })
        }
      }
      _ => Ok(BinderEvent::Ignore),
    }
  }
}

/// Binds a mutator against every direct child of `parent` whose promise is
/// writable as the mutator's subject type, present and future.
pub(crate) struct AllLinksListener {
  parent: ModelPath,
  pub(crate) stage: MutationType,
  pub(crate) mutator: Rc<dyn ModelMutator>,
}

impl AllLinksListener {
  pub(crate) fn new(parent: ModelPath, stage: MutationType, mutator: Rc<dyn ModelMutator>) -> Self {
    Self {
      parent,
      stage,
      mutator,
    }
  }

  /// The subject reference pinned to `creation`, if it is a matching child.
  pub(crate) fn subject_for(&self, creation: &ModelCreation) -> Option<ModelReference> {
    let subject = self.mutator.subject();
    let is_child = creation.path().parent().as_ref() == Some(&self.parent);
    if is_child && creation.promise().can_be_viewed_as_writable(subject.model_type()) {
      Some(subject.at(creation.path().clone()))
    } else {
      None
    }
  }
}

pub(crate) enum RegisteredListener {
  Binder(BinderCreationListener),
  AllLinks(AllLinksListener),
  External(Box<dyn ModelCreationListener>),
}
