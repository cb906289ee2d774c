//! Errors raised by the model registry and its views.

use thiserror::Error;

use crate::types::{ModelPath, ModelReference, ModelRuleDescriptor, ModelType, UnboundRulesReport};

/// Error returned from a rule body (creator, mutator or configurator).
pub type RuleError = Box<dyn std::error::Error>;

fn duplicate_suffix(created: &bool) -> &'static str {
  if *created {
    "is already registered (and the model element has been created)"
  } else {
    "is already registered to create a model element at this path"
  }
}

fn writable_word(writable: &bool) -> &'static str {
  if *writable { "mutated" } else { "read" }
}

fn rule_suffix(descriptor: &Option<ModelRuleDescriptor>) -> String {
  match descriptor {
    Some(d) => format!(" given to rule '{}'", d),
    None => " (read-only view)".to_string(),
  }
}

/// Failures of the model graph. All are fatal to the operation that raised them.
#[derive(Debug, Error)]
pub enum ModelError {
  #[error("Creator at path {path} not supported, must be top level")]
  NotTopLevel { path: ModelPath },

  #[error("Cannot add top-level path '{path}' as a link; register it as an entry point")]
  TopLevelLink { path: ModelPath },

  #[error(
    "Cannot register model creation rule '{descriptor}' for path '{path}' as the rule '{existing}' {}",
    duplicate_suffix(.created)
  )]
  DuplicateModel {
    path: ModelPath,
    descriptor: ModelRuleDescriptor,
    existing: ModelRuleDescriptor,
    created: bool,
  },

  #[error("Cannot create '{path}' using creation rule '{descriptor}' as it was already created by '{existing}'")]
  DuplicateLink {
    path: ModelPath,
    descriptor: ModelRuleDescriptor,
    existing: ModelRuleDescriptor,
  },

  #[error(
    "Type-only model reference of type '{}' is ambiguous as it matches both '{first}' (created by '{first_creator}') and '{second}' (created by '{second_creator}') for rule '{descriptor}'",
    .reference.model_type()
  )]
  AmbiguousBinding {
    descriptor: ModelRuleDescriptor,
    reference: ModelReference,
    first: ModelPath,
    first_creator: ModelRuleDescriptor,
    second: ModelPath,
    second_creator: ModelRuleDescriptor,
  },

  #[error(
    "Model reference to element '{path}' with type '{}' is invalid due to incompatible types for rule '{descriptor}': the element created by '{creator}' can not be {} as that type (can be read as: [{}], can be mutated as: [{}])",
    .reference.model_type(),
    writable_word(.writable),
    .read_only_types.join(", "),
    .writable_types.join(", ")
  )]
  IncompatibleReference {
    descriptor: ModelRuleDescriptor,
    reference: ModelReference,
    path: ModelPath,
    creator: ModelRuleDescriptor,
    writable: bool,
    read_only_types: Vec<String>,
    writable_types: Vec<String>,
  },

  #[error("Exception thrown while executing model rule: {descriptor}")]
  RuleExecution {
    descriptor: ModelRuleDescriptor,
    #[source]
    source: RuleError,
  },

  #[error("No model node at '{path}'")]
  NoNode { path: ModelPath },

  #[error("Don't know how to create model element at '{path}'")]
  NoCreator { path: ModelPath },

  #[error("Model node '{path}' is not compatible with requested {ty} (operation: {operation})")]
  IncompatibleView {
    path: ModelPath,
    ty: ModelType,
    operation: &'static str,
  },

  #[error("Cannot project model element {path} to writable type '{ty}' for rule {descriptor}")]
  NotWritable {
    path: ModelPath,
    ty: ModelType,
    descriptor: ModelRuleDescriptor,
  },

  #[error("Tried to remove model {path} but it is depended on by other model elements")]
  DependedOn { path: ModelPath },

  #[error("Mutator reference must have path to child of '{parent}' (rule '{descriptor}')")]
  LinkSubjectNotChild {
    parent: ModelPath,
    descriptor: ModelRuleDescriptor,
  },

  #[error("Cannot add link '{path}' to '{parent}' (rule '{descriptor}'): not a direct child")]
  LinkNotChild {
    parent: ModelPath,
    path: ModelPath,
    descriptor: ModelRuleDescriptor,
  },

  #[error("Mutator reference must have no path when mutating all links of '{parent}' (rule '{descriptor}')")]
  LinkSubjectHasPath {
    parent: ModelPath,
    descriptor: ModelRuleDescriptor,
  },

  #[error("Attempt to mutate closed view of model of type '{ty}'{}", rule_suffix(.descriptor))]
  ViewClosed {
    ty: ModelType,
    descriptor: Option<ModelRuleDescriptor>,
  },

  #[error("Private data of '{path}' is of type '{actual}', requested '{expected}'")]
  PrivateDataType {
    path: ModelPath,
    expected: ModelType,
    actual: ModelType,
  },

  #[error("Could not find element '{name}' in collection of {element_type}")]
  UnknownElement {
    name: String,
    element_type: ModelType,
  },

  #[error("Cannot create element '{name}': element already exists")]
  DuplicateElement { name: String },

  #[error("Cannot create element '{name}': no type given and the collection has no default type")]
  NoDefaultElementType { name: String },

  #[error("Cannot create element '{name}' of type '{ty}': no factory registered for that type")]
  UnknownElementType { name: String, ty: ModelType },

  #[error("Cannot create element '{name}' of type '{ty}' through a view of '{view_type}' elements")]
  ElementTypeOutsideView {
    name: String,
    ty: ModelType,
    view_type: ModelType,
  },

  #[error("No signature of method '{name}' is applicable for argument shape ({shape})")]
  UnrecognizedCall { name: String, shape: String },

  #[error("{0}")]
  UnboundRules(UnboundRulesReport),
}

impl ModelError {
  /// For `RuleExecution`, the innermost model error raised inside the rule, if any.
  pub fn rule_cause(&self) -> Option<&ModelError> {
    match self {
      ModelError::RuleExecution { source, .. } => {
        let inner = source.downcast_ref::<ModelError>()?;
        inner.rule_cause().or(Some(inner))
      }
      _ => None,
    }
  }
}
