//! Tracks resolution of a rule's references to concrete paths.

use std::rc::Rc;

use crate::rules::{ModelCreator, ModelMutator};
use crate::types::{ModelBinding, ModelPath, ModelReference, ModelRuleDescriptor, MutationType};

/// Identifies a pending binder inside the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct BinderId(pub(crate) u64);

/// A reference slot of a binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinderSlot {
  Subject,
  Input(usize),
}

/// The rule a binder stores once every slot is resolved.
pub(crate) enum BinderTarget {
  Creator(Box<dyn ModelCreator>),
  Mutator {
    stage: MutationType,
    mutator: Rc<dyn ModelMutator>,
  },
}

/// Subject (mutators only) and input references of a rule, with the path each
/// resolved to so far.
pub(crate) struct RuleBinder {
  descriptor: ModelRuleDescriptor,
  subject_reference: Option<ModelReference>,
  input_references: Vec<ModelReference>,
  subject_binding: Option<ModelPath>,
  input_bindings: Vec<Option<ModelPath>>,
  target: BinderTarget,
}

impl RuleBinder {
  pub(crate) fn for_creator(creator: Box<dyn ModelCreator>) -> Self {
    let input_references = creator.inputs().to_vec();
    Self {
      descriptor: creator.descriptor().clone(),
      subject_reference: None,
      input_bindings: vec![None; input_references.len()],
      input_references,
      subject_binding: None,
      target: BinderTarget::Creator(creator),
    }
  }

  /// `subject` overrides the mutator's own subject reference (used to pin
  /// type-only mutators to a concrete child).
  pub(crate) fn for_mutator(
    subject: ModelReference,
    stage: MutationType,
    mutator: Rc<dyn ModelMutator>,
  ) -> Self {
    let input_references = mutator.inputs().to_vec();
    Self {
      descriptor: mutator.descriptor().clone(),
      subject_reference: Some(subject),
      input_bindings: vec![None; input_references.len()],
      input_references,
      subject_binding: None,
      target: BinderTarget::Mutator { stage, mutator },
    }
  }

  pub(crate) fn descriptor(&self) -> &ModelRuleDescriptor {
    &self.descriptor
  }

  pub(crate) fn subject_reference(&self) -> Option<&ModelReference> {
    self.subject_reference.as_ref()
  }

  pub(crate) fn subject_binding(&self) -> Option<&ModelPath> {
    self.subject_binding.as_ref()
  }

  pub(crate) fn input_references(&self) -> &[ModelReference] {
    &self.input_references
  }

  pub(crate) fn input_binding(&self, index: usize) -> Option<&ModelPath> {
    self.input_bindings.get(index).and_then(Option::as_ref)
  }

  pub(crate) fn is_bound(&self) -> bool {
    (self.subject_reference.is_none() || self.subject_binding.is_some())
      && self.input_bindings.iter().all(Option::is_some)
  }

  /// Every slot with its reference and whether it needs a writable view.
  /// Subject first, then inputs in declaration order.
  pub(crate) fn slots(&self) -> Vec<(BinderSlot, ModelReference, bool)> {
    let subject = self
      .subject_reference
      .iter()
      .map(|r| (BinderSlot::Subject, r.clone(), true));
    let inputs = self
      .input_references
      .iter()
      .enumerate()
      .map(|(i, r)| (BinderSlot::Input(i), r.clone(), false));
    subject.chain(inputs).collect()
  }

  pub(crate) fn bind(&mut self, slot: BinderSlot, path: ModelPath) {
    match slot {
      BinderSlot::Subject => self.subject_binding = Some(path),
      BinderSlot::Input(i) => {
        if let Some(binding) = self.input_bindings.get_mut(i) {
          *binding = Some(path);
        }
      }
    }
  }

  /// Requested paths of the references that have not bound yet.
  pub(crate) fn unbound_paths(&self) -> impl Iterator<Item = &ModelPath> {
    let subject = self
      .subject_reference
      .iter()
      .filter(|_| self.subject_binding.is_none())
      .filter_map(ModelReference::path);
    let inputs = self
      .input_references
      .iter()
      .zip(&self.input_bindings)
      .filter(|(_, bound)| bound.is_none())
      .filter_map(|(r, _)| r.path());
    subject.chain(inputs)
  }

  /// Converts a fully bound binder into the rule the registry stores.
  pub(crate) fn into_bound(self) -> Option<BoundRule> {
    let inputs = self
      .input_references
      .into_iter()
      .zip(self.input_bindings)
      .map(|(reference, path)| path.map(|p| ModelBinding::new(reference, p)))
      .collect::<Option<Vec<_>>>()?;
    match self.target {
      BinderTarget::Creator(creator) => Some(BoundRule::Creator(BoundModelCreator { creator, inputs })),
      BinderTarget::Mutator { stage, mutator } => {
        let subject = ModelBinding::new(self.subject_reference?, self.subject_binding?);
        Some(BoundRule::Mutator {
          stage,
          mutator: BoundModelMutator {
            mutator,
            subject,
            inputs,
          },
        })
      }
    }
  }
}

/// A creator with its resolved inputs.
pub(crate) struct BoundModelCreator {
  pub(crate) creator: Box<dyn ModelCreator>,
  pub(crate) inputs: Vec<ModelBinding>,
}

/// A mutator with its resolved subject and inputs.
pub(crate) struct BoundModelMutator {
  pub(crate) mutator: Rc<dyn ModelMutator>,
  pub(crate) subject: ModelBinding,
  pub(crate) inputs: Vec<ModelBinding>,
}

impl BoundModelMutator {
  pub(crate) fn input_paths(&self) -> impl Iterator<Item = &ModelPath> {
    self.inputs.iter().map(ModelBinding::path)
  }
}

pub(crate) enum BoundRule {
  Creator(BoundModelCreator),
  Mutator {
    stage: MutationType,
    mutator: BoundModelMutator,
  },
}
