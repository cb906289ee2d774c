//! The rule-driven registry: binds rules to nodes as they become known and
//! closes nodes lazily, on demand.
//!
//! A node is registered `Known` with its creator. Reading it (`get`, `find`,
//! `node`, or as another rule's input) drives it through
//! `Created -> SelfClosed -> GraphClosed`, running its creator, then its queued
//! mutators stage by stage, then closing its children and running `Validate`
//! mutators.

mod binder;
mod listener;
mod node_handle;
mod options;
#[cfg(test)]
mod registry_test;
mod suggestions;

use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, instrument, trace};

use crate::error::ModelError;
use crate::graph::{ModelCreation, ModelGraph, ModelNode};
use crate::rules::{ModelCreator, ModelMutator};
use crate::types::{
  Inputs, ModelAdapter, ModelBinding, ModelNodeState, ModelPath, ModelPromise, ModelReference,
  ModelRuleDescriptor, ModelRuleInput, ModelType, ModelView, MutationType, UnboundRule,
  UnboundRuleInput, UnboundRulesReport,
};

use binder::{BinderId, BinderSlot, BoundModelCreator, BoundModelMutator, BoundRule, RuleBinder};
use listener::{AllLinksListener, BinderCreationListener, BinderEvent, RegisteredListener};

pub use listener::ModelCreationListener;
pub use node_handle::MutableModelNode;
pub use options::RegistryOptions;
pub use suggestions::ModelPathSuggestionProvider;

/// Queue key for bound mutators: subject path plus stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MutationKey {
  path: ModelPath,
  stage: MutationType,
}

impl MutationKey {
  fn new(path: ModelPath, stage: MutationType) -> Self {
    Self { path, stage }
  }
}

/// Owns the model graph and every rule registered against it.
pub struct ModelRegistry {
  options: RegistryOptions,
  graph: ModelGraph,
  /// Bound creators whose node has not been created yet.
  creators: IndexMap<ModelPath, BoundModelCreator>,
  /// Bound mutators waiting for their subject to reach their stage.
  mutators: HashMap<MutationKey, Vec<BoundModelMutator>>,
  /// Input paths of every mutator already fired, per subject.
  used_mutators: HashMap<ModelPath, Vec<Vec<ModelPath>>>,
  /// Rules with at least one unresolved reference.
  binders: IndexMap<BinderId, RuleBinder>,
  next_binder: u64,
  /// Binder whose listeners are being replayed; it is not stored as bound
  /// until every slot has seen the whole graph.
  registering: Option<BinderId>,
  listeners: Vec<RegisteredListener>,
}

impl Default for ModelRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl ModelRegistry {
  pub fn new() -> Self {
    Self::with_options(RegistryOptions::default())
  }

  pub fn with_options(options: RegistryOptions) -> Self {
    Self {
      options,
      graph: ModelGraph::new(),
      creators: IndexMap::new(),
      mutators: HashMap::new(),
      used_mutators: HashMap::new(),
      binders: IndexMap::new(),
      next_binder: 0,
      registering: None,
      listeners: Vec::new(),
    }
  }

  pub fn options(&self) -> &RegistryOptions {
    &self.options
  }

  /// Read access to the graph. Does not close anything.
  pub fn graph(&self) -> &ModelGraph {
    &self.graph
  }

  /// Registers a creator for a top-level node. The node becomes `Known`
  /// immediately; the creator runs when the node is first read.
  #[instrument(level = "trace", skip_all, fields(path = %creator.path()))]
  pub fn create(&mut self, creator: impl ModelCreator + 'static) -> Result<(), ModelError> {
    let path = creator.path().clone();
    if !path.is_top_level() {
      return Err(ModelError::NotTopLevel { path });
    }
    if let Some(existing) = self.graph.find(&path) {
      return Err(ModelError::DuplicateModel {
        descriptor: creator.descriptor().clone(),
        existing: existing.descriptor().clone(),
        created: existing.state() > ModelNodeState::Known,
        path,
      });
    }
    self.add_known(Box::new(creator))
  }

  /// Registers a mutator to run at `stage` against its subject once the
  /// subject and all inputs are bound.
  #[instrument(level = "trace", skip_all, fields(rule = %mutator.descriptor(), stage = %stage))]
  pub fn mutate(
    &mut self,
    stage: MutationType,
    mutator: impl ModelMutator + 'static,
  ) -> Result<(), ModelError> {
    let mutator: Rc<dyn ModelMutator> = Rc::new(mutator);
    let subject = mutator.subject().clone();
    self.bind(RuleBinder::for_mutator(subject, stage, mutator))
  }

  /// Closes the node at `path` and returns its value viewed as `T`.
  /// Fails with [ModelError::NoNode] when nothing is registered at `path`.
  pub fn get<T: Clone + 'static>(&mut self, path: &ModelPath) -> Result<T, ModelError> {
    self.require(path)?;
    self.instance(path, "get")
  }

  /// Like [Self::get], but an unknown path yields `Ok(None)`.
  pub fn find<T: Clone + 'static>(&mut self, path: &ModelPath) -> Result<Option<T>, ModelError> {
    if !self.graph.contains(path) {
      return Ok(None);
    }
    self.require(path)?;
    self.instance(path, "find").map(Some)
  }

  /// Closes the node at `path` and hands out a mutable handle to it.
  pub fn node(&mut self, path: &ModelPath) -> Result<MutableModelNode<'_>, ModelError> {
    self.require(path)?;
    Ok(MutableModelNode::new(self, path.clone()))
  }

  /// Current lifecycle state of `path`, without closing it.
  pub fn state(&self, path: &ModelPath) -> Option<ModelNodeState> {
    self.graph.find(path).map(ModelNode::state)
  }

  /// Removes `path` and its subtree, with their pending creators and mutators.
  ///
  /// Fails while a bound mutator, queued or already fired, takes `path` as
  /// an input.
  #[instrument(level = "trace", skip_all, fields(path = %path))]
  pub fn remove(&mut self, path: &ModelPath) -> Result<(), ModelError> {
    if self.is_depended_on(path) {
      return Err(ModelError::DependedOn { path: path.clone() });
    }
    self.discard(path);
    debug!(path = %path, "removed");
    Ok(())
  }

  /// Registers an observer of node creation. It is replayed every node known
  /// so far before being kept for future ones.
  pub fn register_listener(
    &mut self,
    listener: impl ModelCreationListener + 'static,
  ) -> Result<(), ModelError> {
    self.register(RegisteredListener::External(Box::new(listener)))
  }

  /// Fails with an [UnboundRulesReport] if any rule still has unresolved
  /// references.
  ///
  /// Before giving up, creation of registered root nodes is forced for every
  /// unbound nested reference under them, since their creators may add the
  /// missing children.
  #[instrument(level = "trace", skip_all)]
  pub fn validate(&mut self) -> Result<(), ModelError> {
    while let Some(root) = self.forceable_root() {
      debug!(path = %root, "forcing creation to bind nested references");
      self.require(&root)?;
    }
    if self.binders.is_empty() {
      return Ok(());
    }
    Err(ModelError::UnboundRules(self.unbound_rules_report()))
  }

  fn forceable_root(&self) -> Option<ModelPath> {
    self
      .binders
      .values()
      .flat_map(|binder| binder.unbound_paths())
      .filter_map(ModelPath::root_parent)
      .find(|root| self.creators.contains_key(root))
  }

  fn unbound_rules_report(&self) -> UnboundRulesReport {
    let provider = ModelPathSuggestionProvider::new(
      self.graph.paths().chain(self.creators.keys()).cloned(),
      self.options.max_suggestion_distance,
      self.options.max_suggestions,
    );
    let slot = |reference: &ModelReference, bound: Option<&ModelPath>| {
      let suggestions = match (bound, reference.path()) {
        (None, Some(path)) => provider.suggest(path),
        _ => Vec::new(),
      };
      UnboundRuleInput {
        path: bound.or(reference.path()).cloned(),
        ty: *reference.model_type(),
        bound: bound.is_some(),
        suggestions,
      }
    };
    let rules = self
      .binders
      .values()
      .map(|binder| UnboundRule {
        descriptor: binder.descriptor().clone(),
        mutable: binder
          .subject_reference()
          .map(|reference| slot(reference, binder.subject_binding()))
          .into_iter()
          .collect(),
        immutable: binder
          .input_references()
          .iter()
          .enumerate()
          .map(|(i, reference)| slot(reference, binder.input_binding(i)))
          .collect(),
      })
      .collect();
    UnboundRulesReport::new(rules)
  }

  fn is_depended_on(&self, path: &ModelPath) -> bool {
    let queued = self
      .mutators
      .values()
      .flatten()
      .any(|mutator| mutator.input_paths().any(|p| p == path));
    queued
      || self
        .used_mutators
        .values()
        .flatten()
        .any(|inputs| inputs.contains(path))
  }

  /// Drops `path`, its subtree and every rule pending against them.
  fn discard(&mut self, path: &ModelPath) {
    self.creators.shift_remove(path);
    for removed in self.graph.remove(path) {
      self.creators.shift_remove(&removed);
      self.used_mutators.remove(&removed);
    }
    self.mutators.retain(|key, _| !key.path.is_within(path));
  }

  // -- registration ---------------------------------------------------------

  /// Adds a creator's node as `Known`, announces it, then binds the creator.
  /// The node is dropped again if either step fails.
  fn add_known(&mut self, creator: Box<dyn ModelCreator>) -> Result<(), ModelError> {
    let path = creator.path().clone();
    let descriptor = creator.descriptor().clone();
    let creation = if path.is_top_level() {
      self
        .graph
        .add_entry_point(path, descriptor, creator.promise(), creator.adapter())?
        .creation()
    } else {
      let node = ModelNode::new(path, descriptor, creator.promise(), creator.adapter());
      self.graph.add(node)?.creation()
    };
    let result = self
      .notify_created(&creation)
      .and_then(|()| self.bind(RuleBinder::for_creator(creator)));
    if result.is_err() {
      self.discard(creation.path());
    }
    result
  }

  /// Adds a child node that is `Created` as soon as it is announced.
  fn add_eager(
    &mut self,
    path: ModelPath,
    descriptor: ModelRuleDescriptor,
    promise: Rc<dyn ModelPromise>,
    adapter: Rc<dyn ModelAdapter>,
  ) -> Result<(), ModelError> {
    let node = ModelNode::new(path.clone(), descriptor, promise, adapter);
    let creation = self.graph.add(node)?.creation();
    if let Err(err) = self.notify_created(&creation) {
      self.discard(&path);
      return Err(err);
    }
    self.advance(&path, ModelNodeState::Created);
    Ok(())
  }

  /// Registers a listener per unresolved slot. A binding conflict found while
  /// replaying the graph rejects the whole rule: nothing of it stays queued
  /// or pending.
  fn bind(&mut self, binder: RuleBinder) -> Result<(), ModelError> {
    if binder.is_bound() {
      return self.on_bound(binder);
    }
    let id = BinderId(self.next_binder);
    self.next_binder += 1;
    let descriptor = binder.descriptor().clone();
    let slots = binder.slots();
    self.binders.insert(id, binder);
    let outer = self.registering.replace(id);
    let registered = slots.into_iter().try_for_each(|(slot, reference, writable)| {
      let listener = BinderCreationListener::new(id, slot, descriptor.clone(), reference, writable);
      self.register(RegisteredListener::Binder(listener))
    });
    self.registering = outer;
    if let Err(err) = registered {
      trace!(rule = %descriptor, "rule rejected");
      self.binders.shift_remove(&id);
      self
        .listeners
        .retain(|listener| !matches!(listener, RegisteredListener::Binder(b) if b.binder == id));
      return Err(err);
    }
    match self.binders.get(&id) {
      Some(binder) if binder.is_bound() => match self.binders.shift_remove(&id) {
        Some(binder) => self.on_bound(binder),
        None => Ok(()),
      },
      _ => Ok(()),
    }
  }

  fn bind_slot(&mut self, id: BinderId, slot: BinderSlot, path: ModelPath) -> Result<(), ModelError> {
    let Some(binder) = self.binders.get_mut(&id) else {
      return Ok(());
    };
    trace!(rule = %binder.descriptor(), path = %path, "bound reference");
    binder.bind(slot, path);
    if !binder.is_bound() || self.registering == Some(id) {
      return Ok(());
    }
    match self.binders.shift_remove(&id) {
      Some(binder) => self.on_bound(binder),
      None => Ok(()),
    }
  }

  fn on_bound(&mut self, binder: RuleBinder) -> Result<(), ModelError> {
    trace!(rule = %binder.descriptor(), "rule bound");
    match binder.into_bound() {
      Some(BoundRule::Creator(creator)) => {
        self.creators.insert(creator.creator.path().clone(), creator);
      }
      Some(BoundRule::Mutator { stage, mutator }) => {
        let key = MutationKey::new(mutator.subject.path().clone(), stage);
        self.mutators.entry(key).or_default().push(mutator);
      }
      None => {}
    }
    Ok(())
  }

  // -- listeners ------------------------------------------------------------

  /// Replays known nodes to `listener`, then keeps it unless it asked to stop.
  fn register(&mut self, mut listener: RegisteredListener) -> Result<(), ModelError> {
    let creations: Vec<ModelCreation> = self.graph.flatten().into_values().collect();
    for creation in &creations {
      if self.dispatch(&mut listener, creation)? {
        return Ok(());
      }
    }
    self.listeners.push(listener);
    Ok(())
  }

  /// Notifies a snapshot of the listeners. Listeners registered meanwhile
  /// already saw `creation` through replay and are appended afterwards.
  ///
  /// Binding conflicts are checked against every binder listener before any
  /// listener is notified, so a rejected creation binds nothing.
  fn notify_created(&mut self, creation: &ModelCreation) -> Result<(), ModelError> {
    for listener in &self.listeners {
      if let RegisteredListener::Binder(binder) = listener {
        binder.check(creation)?;
      }
    }
    let snapshot = mem::take(&mut self.listeners);
    let mut kept = Vec::with_capacity(snapshot.len());
    let mut result = Ok(());
    let mut remaining = snapshot.into_iter();
    for mut listener in remaining.by_ref() {
      match self.dispatch(&mut listener, creation) {
        Ok(true) => {}
        Ok(false) => kept.push(listener),
        Err(err) => {
          kept.push(listener);
          result = Err(err);
          break;
        }
      }
    }
    kept.extend(remaining);
    let added = mem::replace(&mut self.listeners, kept);
    self.listeners.extend(added);
    result
  }

  /// Returns whether the listener is done.
  fn dispatch(
    &mut self,
    listener: &mut RegisteredListener,
    creation: &ModelCreation,
  ) -> Result<bool, ModelError> {
    match listener {
      RegisteredListener::Binder(binder) => match binder.on_create(creation)? {
        BinderEvent::Ignore => Ok(false),
        BinderEvent::Bind { path, done } => {
          self.bind_slot(binder.binder, binder.slot, path)?;
          Ok(done)
        }
      },
      RegisteredListener::AllLinks(all) => {
        if let Some(subject) = all.subject_for(creation) {
          self.bind(RuleBinder::for_mutator(subject, all.stage, all.mutator.clone()))?;
        }
        Ok(false)
      }
      RegisteredListener::External(external) => external.on_create(creation),
    }
  }

  // -- closing --------------------------------------------------------------

  fn require_node(&self, path: &ModelPath) -> Result<&ModelNode, ModelError> {
    self
      .graph
      .find(path)
      .ok_or_else(|| ModelError::NoNode { path: path.clone() })
  }

  /// Closes `path`, failing if it is unknown.
  fn require(&mut self, path: &ModelPath) -> Result<(), ModelError> {
    self.require_node(path)?;
    self.close(path)
  }

  fn advance(&mut self, path: &ModelPath, state: ModelNodeState) {
    if let Some(node) = self.graph.find_mut(path) {
      node.advance(state);
    }
  }

  fn close(&mut self, path: &ModelPath) -> Result<(), ModelError> {
    if self.require_node(path)?.state() == ModelNodeState::GraphClosed {
      return Ok(());
    }
    debug!(path = %path, "closing");
    self.maybe_create(path)?;
    self.maybe_mutate(path)?;
    self.maybe_close_linked(path)?;
    debug!(path = %path, "finished closing");
    Ok(())
  }

  /// `Known -> Created`: runs the node's bound creator. The creator is
  /// consumed even if it fails.
  fn maybe_create(&mut self, path: &ModelPath) -> Result<(), ModelError> {
    if self.require_node(path)?.state() != ModelNodeState::Known {
      return Ok(());
    }
    let bound = self
      .creators
      .shift_remove(path)
      .ok_or_else(|| ModelError::NoCreator { path: path.clone() })?;
    let descriptor = bound.creator.descriptor().clone();
    let inputs = self.to_inputs(&bound.inputs, &descriptor)?;
    debug!(path = %path, rule = %descriptor, "creating");
    let mut node = MutableModelNode::new(self, path.clone());
    bound
      .creator
      .create(&mut node, &inputs)
      .map_err(|source| ModelError::RuleExecution { descriptor, source })?;
    self.advance(path, ModelNodeState::Created);
    Ok(())
  }

  /// `Created -> SelfClosed`: fires the four self-closing stages in order.
  fn maybe_mutate(&mut self, path: &ModelPath) -> Result<(), ModelError> {
    if self.require_node(path)?.state() != ModelNodeState::Created {
      return Ok(());
    }
    for stage in MutationType::SELF_CLOSING {
      self.fire_mutations(path, stage)?;
    }
    self.advance(path, ModelNodeState::SelfClosed);
    Ok(())
  }

  /// `SelfClosed -> GraphClosed`: closes every child, then fires `Validate`.
  fn maybe_close_linked(&mut self, path: &ModelPath) -> Result<(), ModelError> {
    let node = self.require_node(path)?;
    if node.state() != ModelNodeState::SelfClosed {
      return Ok(());
    }
    let children: Vec<ModelPath> = node.links().cloned().collect();
    for child in &children {
      if self.graph.contains(child) {
        self.close(child)?;
      }
    }
    self.fire_mutations(path, MutationType::Validate)?;
    self.advance(path, ModelNodeState::GraphClosed);
    Ok(())
  }

  /// Takes every mutator queued for `(path, stage)` and fires them in
  /// registration order, recording their inputs as used.
  ///
  /// A failing mutator goes back to the head of the queue with everything
  /// after it, so the next close retries from there.
  fn fire_mutations(&mut self, path: &ModelPath, stage: MutationType) -> Result<(), ModelError> {
    let key = MutationKey::new(path.clone(), stage);
    let mut queued = self.mutators.remove(&key).unwrap_or_default().into_iter();
    while let Some(bound) = queued.next() {
      if let Err(err) = self.fire_mutation(path, &bound) {
        let mut unfired = vec![bound];
        unfired.extend(queued);
        let entry = self.mutators.entry(key).or_default();
        unfired.append(entry);
        *entry = unfired;
        return Err(err);
      }
      let inputs = bound.input_paths().cloned().collect();
      self.used_mutators.entry(path.clone()).or_default().push(inputs);
    }
    Ok(())
  }

  fn fire_mutation(&mut self, path: &ModelPath, bound: &BoundModelMutator) -> Result<(), ModelError> {
    let descriptor = bound.mutator.descriptor().clone();
    let inputs = self.to_inputs(&bound.inputs, &descriptor)?;
    debug!(path = %path, rule = %descriptor, "mutating");
    let mut view = self.writable_view(&bound.subject, &descriptor, &inputs)?;
    let result = {
      let mut node = MutableModelNode::new(self, path.clone());
      bound.mutator.mutate(&mut node, view.instance(), &inputs)
    };
    view.close();
    result.map_err(|source| ModelError::RuleExecution { descriptor, source })
  }

  /// Closes every input node and collects a read-only view of each.
  fn to_inputs(
    &mut self,
    bindings: &[ModelBinding],
    descriptor: &ModelRuleDescriptor,
  ) -> Result<Inputs, ModelError> {
    let mut inputs = Vec::with_capacity(bindings.len());
    for binding in bindings {
      self.require(binding.path())?;
      let view = self.read_only_view(binding.path(), binding.model_type(), Some(descriptor), "toInputs")?;
      inputs.push(ModelRuleInput::new(binding.clone(), view));
    }
    Ok(Inputs::new(inputs))
  }

  fn read_only_view(
    &self,
    path: &ModelPath,
    ty: &ModelType,
    descriptor: Option<&ModelRuleDescriptor>,
    operation: &'static str,
  ) -> Result<Box<dyn ModelView>, ModelError> {
    let node = self.require_node(path)?;
    node
      .adapter()
      .as_read_only(ty, node.private_data(), descriptor)
      .ok_or_else(|| ModelError::IncompatibleView {
        path: path.clone(),
        ty: *ty,
        operation,
      })
  }

  fn writable_view(
    &self,
    subject: &ModelBinding,
    descriptor: &ModelRuleDescriptor,
    inputs: &Inputs,
  ) -> Result<Box<dyn ModelView>, ModelError> {
    let node = self.require_node(subject.path())?;
    node
      .adapter()
      .as_writable(subject.model_type(), node.private_data(), descriptor, inputs)
      .ok_or_else(|| ModelError::NotWritable {
        path: subject.path().clone(),
        ty: *subject.model_type(),
        descriptor: descriptor.clone(),
      })
  }

  fn instance<T: Clone + 'static>(
    &self,
    path: &ModelPath,
    operation: &'static str,
  ) -> Result<T, ModelError> {
    let ty = ModelType::of::<T>();
    let view = self.read_only_view(path, &ty, None, operation)?;
    view
      .instance()
      .downcast_ref::<T>()
      .cloned()
      .ok_or_else(|| ModelError::IncompatibleView {
        path: path.clone(),
        ty,
        operation,
      })
  }

  fn register_all_links(
    &mut self,
    parent: ModelPath,
    stage: MutationType,
    mutator: Rc<dyn ModelMutator>,
  ) -> Result<(), ModelError> {
    self.register(RegisteredListener::AllLinks(AllLinksListener::new(parent, stage, mutator)))
  }
}
