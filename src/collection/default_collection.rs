//! In-memory named collection with lazily realized elements.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;

use super::{Configurator, NamedCollection};
use crate::error::ModelError;
use crate::types::{ModelRuleDescriptor, ModelType};

type Factory<T> = Rc<dyn Fn(&str) -> T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
  BeforeEach,
  Configure,
  FinalizeAll,
}

struct Rule<T> {
  phase: Phase,
  /// Every listed tag must equal the element's tag.
  types: Vec<ModelType>,
  name: Option<String>,
  action: Configurator<T>,
}

impl<T> Rule<T> {
  fn matches(&self, name: &str, ty: ModelType) -> bool {
    self.types.iter().all(|t| *t == ty) && self.name.as_deref().is_none_or(|n| n == name)
  }
}

struct Element<T> {
  ty: ModelType,
  creation: Option<Configurator<T>>,
  instance: Option<Rc<RefCell<T>>>,
}

struct State<T> {
  descriptor: ModelRuleDescriptor,
  default_type: Option<ModelType>,
  factories: HashMap<ModelType, Factory<T>>,
  elements: IndexMap<String, Element<T>>,
  rules: Vec<Rule<T>>,
}

/// Named collection whose elements are built by per-type factories the first
/// time they are read.
///
/// Realizing an element runs, in order: the factory, `before_each` rules, the
/// action given to `create`, `all`/`with_type_each`/`named` rules in
/// registration order, then `finalize_all` rules. A rule registered after an
/// element was realized, or while it is being realized, is applied to it
/// straight away.
///
/// Clones share state.
pub struct DefaultNamedCollection<T> {
  state: Rc<RefCell<State<T>>>,
  filter: Option<ModelType>,
}

impl<T> Clone for DefaultNamedCollection<T> {
  fn clone(&self) -> Self {
    Self {
      state: self.state.clone(),
      filter: self.filter,
    }
  }
}

impl<T: 'static> DefaultNamedCollection<T> {
  /// Empty collection; failures of its configuration actions are reported
  /// against rules nested under `descriptor`.
  pub fn new(descriptor: impl Into<ModelRuleDescriptor>) -> Self {
    Self {
      state: Rc::new(RefCell::new(State {
        descriptor: descriptor.into(),
        default_type: None,
        factories: HashMap::new(),
        elements: IndexMap::new(),
        rules: Vec::new(),
      })),
      filter: None,
    }
  }

  /// Collection with a single element type used by untyped `create` calls.
  pub fn with_default(
    descriptor: impl Into<ModelRuleDescriptor>,
    ty: ModelType,
    factory: impl Fn(&str) -> T + 'static,
  ) -> Self {
    let collection = Self::new(descriptor);
    collection.register_factory(ty, factory);
    collection
  }

  /// Registers how elements tagged `ty` are built. The first registered type
  /// becomes the default type.
  pub fn register_factory(&self, ty: ModelType, factory: impl Fn(&str) -> T + 'static) {
    let mut state = self.state.borrow_mut();
    state.factories.insert(ty, Rc::new(factory));
    state.default_type.get_or_insert(ty);
  }

  pub fn set_default_type(&self, ty: ModelType) {
    self.state.borrow_mut().default_type = Some(ty);
  }

  pub fn default_type(&self) -> Option<ModelType> {
    self.filter.or(self.state.borrow().default_type)
  }

  /// Tag of the element named `name`, if visible through this collection.
  pub fn element_type(&self, name: &str) -> Option<ModelType> {
    let state = self.state.borrow();
    state
      .elements
      .get(name)
      .map(|element| element.ty)
      .filter(|ty| self.is_visible(*ty))
  }

  /// Whether `name` has already been built.
  pub fn is_realized(&self, name: &str) -> bool {
    let state = self.state.borrow();
    state
      .elements
      .get(name)
      .is_some_and(|element| element.instance.is_some())
  }

  fn is_visible(&self, ty: ModelType) -> bool {
    self.filter.is_none_or(|filter| filter == ty)
  }

  fn rule_types(&self, ty: Option<ModelType>) -> Vec<ModelType> {
    self.filter.into_iter().chain(ty).collect()
  }

  fn add_rule(&self, rule: Rule<T>) -> Result<(), ModelError> {
    let realized: Vec<(String, Rc<RefCell<T>>)> = {
      let state = self.state.borrow();
      state
        .elements
        .iter()
        .filter(|(name, element)| rule.matches(name, element.ty))
        .filter_map(|(name, element)| Some((name.clone(), element.instance.clone()?)))
        .collect()
    };
    let action = rule.action.clone();
    self.state.borrow_mut().rules.push(rule);
    for (name, instance) in realized {
      self.apply(&name, &instance, std::slice::from_ref(&action))?;
    }
    Ok(())
  }

  fn apply(
    &self,
    name: &str,
    instance: &Rc<RefCell<T>>,
    actions: &[Configurator<T>],
  ) -> Result<(), ModelError> {
    let descriptor = self.state.borrow().descriptor.nested(name);
    let mut value = instance.borrow_mut();
    for action in actions {
      action(&mut value).map_err(|source| ModelError::RuleExecution {
        descriptor: descriptor.clone(),
        source,
      })?;
    }
    Ok(())
  }

  fn realize(&self, name: &str) -> Result<Option<Rc<RefCell<T>>>, ModelError> {
    let (ty, factory, actions, mut seen) = {
      let state = self.state.borrow();
      let Some(element) = state.elements.get(name) else {
        return Ok(None);
      };
      if !self.is_visible(element.ty) {
        return Ok(None);
      }
      if let Some(instance) = &element.instance {
        return Ok(Some(instance.clone()));
      }
      let ty = element.ty;
      let factory = state.factories.get(&ty).cloned();
      let phase = |phase: Phase| {
        state
          .rules
          .iter()
          .filter(move |rule| rule.phase == phase && rule.matches(name, ty))
          .map(|rule| rule.action.clone())
      };
      let actions: Vec<Configurator<T>> = phase(Phase::BeforeEach)
        .chain(element.creation.clone())
        .chain(phase(Phase::Configure))
        .chain(phase(Phase::FinalizeAll))
        .collect();
      (ty, factory, actions, state.rules.len())
    };
    let factory = factory.ok_or_else(|| ModelError::UnknownElementType {
      name: name.to_string(),
      ty,
    })?;
    trace!(name, ty = %ty, "realizing element");
    let instance = Rc::new(RefCell::new(factory(name)));
    self.apply(name, &instance, &actions)?;
    // Rules registered by the actions above still apply to this element.
    loop {
      let (late, total) = {
        let state = self.state.borrow();
        let late: Vec<Configurator<T>> = state.rules[seen..]
          .iter()
          .filter(|rule| rule.matches(name, ty))
          .map(|rule| rule.action.clone())
          .collect();
        (late, state.rules.len())
      };
      if late.is_empty() {
        break;
      }
      seen = total;
      self.apply(name, &instance, &late)?;
    }
    if let Some(element) = self.state.borrow_mut().elements.get_mut(name) {
      element.instance = Some(instance.clone());
    }
    Ok(Some(instance))
  }
}

impl<T: 'static> NamedCollection<T> for DefaultNamedCollection<T> {
  fn with_type(&self, ty: ModelType) -> Rc<dyn NamedCollection<T>> {
    Rc::new(Self {
      state: self.state.clone(),
      filter: Some(ty),
    })
  }

  fn size(&self) -> usize {
    let state = self.state.borrow();
    state
      .elements
      .values()
      .filter(|element| self.is_visible(element.ty))
      .count()
  }

  fn get(&self, name: &str) -> Result<Option<Rc<RefCell<T>>>, ModelError> {
    self.realize(name)
  }

  fn names(&self) -> Vec<String> {
    let state = self.state.borrow();
    state
      .elements
      .iter()
      .filter(|(_, element)| self.is_visible(element.ty))
      .map(|(name, _)| name.clone())
      .collect()
  }

  fn create(
    &self,
    name: &str,
    ty: Option<ModelType>,
    action: Option<Configurator<T>>,
  ) -> Result<(), ModelError> {
    let mut state = self.state.borrow_mut();
    if state.elements.contains_key(name) {
      return Err(ModelError::DuplicateElement {
        name: name.to_string(),
      });
    }
    let ty = ty
      .or(self.filter)
      .or(state.default_type)
      .ok_or_else(|| ModelError::NoDefaultElementType {
        name: name.to_string(),
      })?;
    if let Some(view_type) = self.filter.filter(|filter| *filter != ty) {
      return Err(ModelError::ElementTypeOutsideView {
        name: name.to_string(),
        ty,
        view_type,
      });
    }
    if !state.factories.contains_key(&ty) {
      return Err(ModelError::UnknownElementType {
        name: name.to_string(),
        ty,
      });
    }
    trace!(name, ty = %ty, "declaring element");
    state.elements.insert(
      name.to_string(),
      Element {
        ty,
        creation: action,
        instance: None,
      },
    );
    Ok(())
  }

  fn named(&self, name: &str, action: Configurator<T>) -> Result<(), ModelError> {
    self.add_rule(Rule {
      phase: Phase::Configure,
      types: self.rule_types(None),
      name: Some(name.to_string()),
      action,
    })
  }

  fn before_each(&self, ty: Option<ModelType>, action: Configurator<T>) -> Result<(), ModelError> {
    self.add_rule(Rule {
      phase: Phase::BeforeEach,
      types: self.rule_types(ty),
      name: None,
      action,
    })
  }

  fn all(&self, action: Configurator<T>) -> Result<(), ModelError> {
    self.add_rule(Rule {
      phase: Phase::Configure,
      types: self.rule_types(None),
      name: None,
      action,
    })
  }

  fn with_type_each(&self, ty: ModelType, action: Configurator<T>) -> Result<(), ModelError> {
    self.add_rule(Rule {
      phase: Phase::Configure,
      types: self.rule_types(Some(ty)),
      name: None,
      action,
    })
  }

  fn finalize_all(&self, ty: Option<ModelType>, action: Configurator<T>) -> Result<(), ModelError> {
    self.add_rule(Rule {
      phase: Phase::FinalizeAll,
      types: self.rule_types(ty),
      name: None,
      action,
    })
  }
}

impl<T> fmt::Debug for DefaultNamedCollection<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state.borrow();
    let names: Vec<&String> = state
      .elements
      .iter()
      .filter(|(_, element)| self.filter.is_none_or(|filter| filter == element.ty))
      .map(|(name, _)| name)
      .collect();
    f.debug_struct("DefaultNamedCollection")
      .field("descriptor", &state.descriptor)
      .field("filter", &self.filter)
      .field("elements", &names)
      .finish()
  }
}
