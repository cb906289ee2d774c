//! Tests for `ModelRegistry`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use proptest::prelude::*;

use super::{ModelRegistry, RegistryOptions};
use crate::error::ModelError;
use crate::graph::ModelCreation;
use crate::rules::{FnModelCreator, FnModelMutator, ModelCreators, ModelMutators};
use crate::types::{ModelNodeState, ModelPath, ModelReference, MutationType};

type Items = Rc<RefCell<Vec<String>>>;

fn path(p: &str) -> ModelPath {
  ModelPath::path(p)
}

fn items_creator(p: &'static str) -> FnModelCreator {
  ModelCreators::instance::<Items>(path(p), format!("create {}", p)).value(|_| Ok(Items::default()))
}

fn counting_creator(p: &'static str, count: &Rc<Cell<usize>>) -> FnModelCreator {
  let count = count.clone();
  ModelCreators::instance::<Items>(path(p), format!("create {}", p)).value(move |_| {
    count.set(count.get() + 1);
    Ok(Items::default())
  })
}

fn push(p: &str, descriptor: &str, entry: &'static str) -> FnModelMutator {
  ModelMutators::path::<Items>(path(p), descriptor).build(move |_, items, _| {
    items.borrow_mut().push(entry.to_string());
    Ok(())
  })
}

fn push_by_type(descriptor: &str, entry: &'static str) -> FnModelMutator {
  ModelMutators::by_type::<Items>(descriptor).build(move |_, items, _| {
    items.borrow_mut().push(entry.to_string());
    Ok(())
  })
}

fn entries(registry: &mut ModelRegistry, p: &str) -> Vec<String> {
  registry.get::<Items>(&path(p)).unwrap().borrow().clone()
}

#[test]
fn created_node_starts_known() {
  let mut r = ModelRegistry::new();
  r.create(items_creator("a")).unwrap();
  assert_eq!(r.state(&path("a")), Some(ModelNodeState::Known));
  assert_eq!(r.state(&path("b")), None);
}

#[test]
fn get_runs_creator_exactly_once() {
  let count = Rc::new(Cell::new(0));
  let mut r = ModelRegistry::new();
  r.create(counting_creator("a", &count)).unwrap();
  assert_eq!(count.get(), 0);
  let first = r.get::<Items>(&path("a")).unwrap();
  let second = r.get::<Items>(&path("a")).unwrap();
  assert_eq!(count.get(), 1);
  assert!(Rc::ptr_eq(&first, &second));
  assert_eq!(r.state(&path("a")), Some(ModelNodeState::GraphClosed));
}

#[test]
fn stages_fire_in_fixed_order() {
  let mut r = ModelRegistry::new();
  r.create(items_creator("a")).unwrap();
  r.mutate(MutationType::Validate, push("a", "v", "validate")).unwrap();
  r.mutate(MutationType::Finalize, push("a", "f", "finalize")).unwrap();
  r.mutate(MutationType::Mutate, push("a", "m", "mutate")).unwrap();
  r.mutate(MutationType::Initialize, push("a", "i", "initialize")).unwrap();
  r.mutate(MutationType::Defaults, push("a", "d", "defaults")).unwrap();
  assert_eq!(
    entries(&mut r, "a"),
    vec!["defaults", "initialize", "mutate", "finalize", "validate"]
  );
  // closing again fires nothing
  assert_eq!(entries(&mut r, "a").len(), 5);
}

#[test]
fn same_stage_fires_in_registration_order() {
  let mut r = ModelRegistry::new();
  r.create(items_creator("a")).unwrap();
  r.mutate(MutationType::Mutate, push("a", "1", "first")).unwrap();
  r.mutate(MutationType::Mutate, push("a", "2", "second")).unwrap();
  r.mutate(MutationType::Mutate, push("a", "3", "third")).unwrap();
  assert_eq!(entries(&mut r, "a"), vec!["first", "second", "third"]);
}

#[test]
fn mutator_registered_before_creator_binds_later() {
  let mut r = ModelRegistry::new();
  r.mutate(MutationType::Defaults, push("a", "early", "early")).unwrap();
  r.create(items_creator("a")).unwrap();
  assert_eq!(entries(&mut r, "a"), vec!["early"]);
}

#[test]
fn duplicate_creator_fails_and_keeps_first() {
  let count = Rc::new(Cell::new(0));
  let mut r = ModelRegistry::new();
  r.create(counting_creator("a", &count)).unwrap();
  let err = r.create(items_creator("a")).unwrap_err();
  match &err {
    ModelError::DuplicateModel {
      existing, created, ..
    } => {
      assert_eq!(existing.as_str(), "create a");
      assert!(!created);
    }
    other => panic!("unexpected error: {other}"),
  }
  assert!(err.to_string().contains("is already registered to create a model element"));

  r.get::<Items>(&path("a")).unwrap();
  assert_eq!(count.get(), 1);
  let err = r.create(items_creator("a")).unwrap_err();
  assert!(matches!(err, ModelError::DuplicateModel { created: true, .. }));
  assert!(err.to_string().contains("the model element has been created"));
}

#[test]
fn create_requires_top_level_path() {
  let mut r = ModelRegistry::new();
  let creator = ModelCreators::instance::<u32>(path("a.b"), "nested").value(|_| Ok(1));
  let err = r.create(creator).unwrap_err();
  assert!(matches!(err, ModelError::NotTopLevel { .. }));
  assert_eq!(err.to_string(), "Creator at path a.b not supported, must be top level");
}

#[test]
fn get_unknown_path_fails_but_find_is_empty() {
  let mut r = ModelRegistry::new();
  let err = r.get::<u32>(&path("missing")).unwrap_err();
  assert!(matches!(err, ModelError::NoNode { .. }));
  assert_eq!(r.find::<u32>(&path("missing")).unwrap(), None);
}

#[test]
fn find_with_wrong_type_fails() {
  let mut r = ModelRegistry::new();
  r.create(ModelCreators::instance::<u32>(path("n"), "n").value(|_| Ok(7)))
    .unwrap();
  assert_eq!(r.find::<u32>(&path("n")).unwrap(), Some(7));
  let err = r.find::<String>(&path("n")).unwrap_err();
  assert!(matches!(err, ModelError::IncompatibleView { operation: "find", .. }));
}

#[test]
fn creator_receives_closed_inputs() {
  let mut r = ModelRegistry::new();
  r.create(
    ModelCreators::instance::<u32>(path("sum"), "sum")
      .input(ModelReference::of::<u32>(path("a")))
      .input(ModelReference::of::<u32>(path("b")))
      .value(|inputs| {
        let a = inputs.get::<u32>(0).copied().unwrap_or_default();
        let b = inputs.get::<u32>(1).copied().unwrap_or_default();
        Ok(a + b)
      }),
  )
  .unwrap();
  r.create(ModelCreators::instance::<u32>(path("a"), "a").value(|_| Ok(2)))
    .unwrap();
  r.create(ModelCreators::instance::<u32>(path("b"), "b").value(|_| Ok(3)))
    .unwrap();
  assert_eq!(r.get::<u32>(&path("sum")).unwrap(), 5);
  assert_eq!(r.state(&path("a")), Some(ModelNodeState::GraphClosed));
  assert_eq!(r.state(&path("b")), Some(ModelNodeState::GraphClosed));
}

#[test]
fn mutator_inputs_are_read_only_views() {
  let mut r = ModelRegistry::new();
  r.create(items_creator("target")).unwrap();
  r.create(ModelCreators::instance::<u32>(path("n"), "n").value(|_| Ok(42)))
    .unwrap();
  r.mutate(
    MutationType::Mutate,
    ModelMutators::path::<Items>(path("target"), "copy n")
      .input(ModelReference::of::<u32>(path("n")))
      .build(|_, items, inputs| {
        let n = inputs.get::<u32>(0).copied().unwrap_or_default();
        items.borrow_mut().push(n.to_string());
        Ok(())
      }),
  )
  .unwrap();
  assert_eq!(entries(&mut r, "target"), vec!["42"]);
}

#[test]
fn type_only_subject_binds_unique_candidate() {
  let mut r = ModelRegistry::new();
  r.create(items_creator("a")).unwrap();
  r.create(ModelCreators::instance::<u32>(path("n"), "n").value(|_| Ok(1)))
    .unwrap();
  r.mutate(MutationType::Mutate, push_by_type("by type", "typed"))
    .unwrap();
  r.validate().unwrap();
  assert_eq!(entries(&mut r, "a"), vec!["typed"]);
}

#[test]
fn type_only_subject_with_two_candidates_is_ambiguous() {
  let mut r = ModelRegistry::new();
  r.create(items_creator("a")).unwrap();
  r.create(items_creator("b")).unwrap();
  let err = r
    .mutate(MutationType::Mutate, push_by_type("by type", "typed"))
    .unwrap_err();
  match &err {
    ModelError::AmbiguousBinding {
      first,
      second,
      descriptor,
      ..
    } => {
      assert_eq!(first, &path("a"));
      assert_eq!(second, &path("b"));
      assert_eq!(descriptor.as_str(), "by type");
    }
    other => panic!("unexpected error: {other}"),
  }
  let message = err.to_string();
  assert!(message.contains("'a'") && message.contains("'b'"));
}

#[test]
fn ambiguity_is_caught_when_second_candidate_arrives() {
  let mut r = ModelRegistry::new();
  r.mutate(MutationType::Mutate, push_by_type("by type", "typed"))
    .unwrap();
  r.create(items_creator("a")).unwrap();
  let err = r.create(items_creator("b")).unwrap_err();
  assert!(matches!(err, ModelError::AmbiguousBinding { .. }));
}

#[test]
fn ambiguous_type_only_mutator_is_not_queued() {
  let mut r = ModelRegistry::new();
  r.create(items_creator("a")).unwrap();
  r.create(items_creator("b")).unwrap();
  let err = r
    .mutate(MutationType::Mutate, push_by_type("by type", "typed"))
    .unwrap_err();
  assert!(matches!(err, ModelError::AmbiguousBinding { .. }));
  // a third candidate no longer trips the rejected rule
  r.create(items_creator("c")).unwrap();
  r.validate().unwrap();
  assert!(entries(&mut r, "a").is_empty());
  assert!(entries(&mut r, "b").is_empty());
  assert!(entries(&mut r, "c").is_empty());
}

#[test]
fn incompatible_input_leaves_no_pending_rule() {
  let mut r = ModelRegistry::new();
  r.create(items_creator("a")).unwrap();
  let err = r
    .mutate(
      MutationType::Mutate,
      ModelMutators::path::<Items>(path("a"), "reads a as text")
        .input(ModelReference::of::<String>(path("a")))
        .build(|_, items, _| {
          items.borrow_mut().push("read".to_string());
          Ok(())
        }),
    )
    .unwrap_err();
  assert!(matches!(err, ModelError::IncompatibleReference { .. }));
  r.validate().unwrap();
  assert!(entries(&mut r, "a").is_empty());
}

#[test]
fn rejected_creation_leaves_no_node() {
  let fired = Rc::new(Cell::new(0));
  let counter = fired.clone();
  let mut r = ModelRegistry::new();
  r.mutate(
    MutationType::Mutate,
    ModelMutators::path::<String>(path("a"), "count a").build(move |_, _, _| {
      counter.set(counter.get() + 1);
      Ok(())
    }),
  )
  .unwrap();
  let err = r.create(items_creator("a")).unwrap_err();
  assert!(matches!(err, ModelError::IncompatibleReference { .. }));
  assert_eq!(r.state(&path("a")), None);
  assert!(r.find::<Items>(&path("a")).unwrap().is_none());

  r.create(ModelCreators::instance::<String>(path("a"), "text a").value(|_| Ok("x".to_string())))
    .unwrap();
  assert_eq!(r.get::<String>(&path("a")).unwrap(), "x");
  assert_eq!(fired.get(), 1);
  r.validate().unwrap();
}

#[test]
fn unmatched_type_only_reference_fails_validation() {
  let mut r = ModelRegistry::new();
  r.mutate(MutationType::Mutate, push_by_type("lonely", "x"))
    .unwrap();
  let err = r.validate().unwrap_err();
  let ModelError::UnboundRules(report) = &err else {
    panic!("unexpected error: {err}");
  };
  assert_eq!(report.rules.len(), 1);
  let rule = &report.rules[0];
  assert_eq!(rule.descriptor.as_str(), "lonely");
  assert_eq!(rule.mutable.len(), 1);
  assert_eq!(rule.mutable[0].path, None);
  assert!(!rule.mutable[0].bound);
  assert!(err.to_string().starts_with("The following model rules are unbound:"));
}

#[test]
fn unbound_report_suggests_near_paths() {
  let mut r = ModelRegistry::new();
  r.create(items_creator("items")).unwrap();
  r.mutate(MutationType::Mutate, push("itmes", "typo", "x"))
    .unwrap();
  let err = r.validate().unwrap_err();
  let ModelError::UnboundRules(report) = err else {
    panic!("expected unbound rules");
  };
  assert_eq!(report.rules[0].mutable[0].suggestions, vec![path("items")]);
}

#[test]
fn suggestions_respect_options() {
  let mut r = ModelRegistry::with_options(RegistryOptions {
    max_suggestion_distance: 0,
    max_suggestions: None,
  });
  r.create(items_creator("items")).unwrap();
  r.mutate(MutationType::Mutate, push("itmes", "typo", "x"))
    .unwrap();
  let Err(ModelError::UnboundRules(report)) = r.validate() else {
    panic!("expected unbound rules");
  };
  assert!(report.rules[0].mutable[0].suggestions.is_empty());
}

#[test]
fn partially_bound_rule_reports_bound_slots() {
  let mut r = ModelRegistry::new();
  r.create(items_creator("a")).unwrap();
  r.mutate(
    MutationType::Mutate,
    ModelMutators::path::<Items>(path("a"), "needs n")
      .input(ModelReference::of::<u32>(path("n")))
      .build(|_, _, _| Ok(())),
  )
  .unwrap();
  let Err(ModelError::UnboundRules(report)) = r.validate() else {
    panic!("expected unbound rules");
  };
  let rule = &report.rules[0];
  assert!(rule.mutable[0].bound);
  assert_eq!(rule.mutable[0].path, Some(path("a")));
  assert!(!rule.immutable[0].bound);
  assert_eq!(rule.immutable[0].path, Some(path("n")));
}

#[test]
fn validate_forces_parent_creation_for_nested_references() {
  let mut r = ModelRegistry::new();
  r.create(
    ModelCreators::instance::<Items>(path("root"), "root").build(|node, _| {
      node.set_private_data(Items::default())?;
      node.add_link(
        ModelCreators::instance::<Items>(path("root.child"), "child").value(|_| Ok(Items::default())),
      )?;
      Ok(())
    }),
  )
  .unwrap();
  r.mutate(MutationType::Mutate, push("root.child", "nested", "configured"))
    .unwrap();
  assert_eq!(r.state(&path("root")), Some(ModelNodeState::Known));
  r.validate().unwrap();
  assert_eq!(r.state(&path("root")), Some(ModelNodeState::GraphClosed));
  assert_eq!(entries(&mut r, "root.child"), vec!["configured"]);
}

#[test]
fn validate_without_pending_rules_is_a_no_op() {
  let mut r = ModelRegistry::new();
  r.create(items_creator("a")).unwrap();
  r.validate().unwrap();
  assert_eq!(r.state(&path("a")), Some(ModelNodeState::Known));
}

#[test]
fn creator_failure_is_wrapped_and_node_stays_known() {
  let mut r = ModelRegistry::new();
  r.create(
    ModelCreators::instance::<u32>(path("bad"), "broken creator")
      .value(|_| Err::<u32, _>("boom".into())),
  )
  .unwrap();
  let err = r.get::<u32>(&path("bad")).unwrap_err();
  match &err {
    ModelError::RuleExecution { descriptor, source } => {
      assert_eq!(descriptor.as_str(), "broken creator");
      assert_eq!(source.to_string(), "boom");
    }
    other => panic!("unexpected error: {other}"),
  }
  assert_eq!(r.state(&path("bad")), Some(ModelNodeState::Known));
  // the creator is consumed by the failed attempt
  assert!(matches!(
    r.get::<u32>(&path("bad")).unwrap_err(),
    ModelError::NoCreator { .. }
  ));
}

#[test]
fn mutator_failure_stops_before_self_closed() {
  let mut r = ModelRegistry::new();
  r.create(items_creator("a")).unwrap();
  r.mutate(
    MutationType::Initialize,
    ModelMutators::path::<Items>(path("a"), "broken mutator").build(|_, _, _| Err("nope".into())),
  )
  .unwrap();
  r.mutate(MutationType::Finalize, push("a", "later", "later"))
    .unwrap();
  let err = r.get::<Items>(&path("a")).unwrap_err();
  assert!(matches!(err, ModelError::RuleExecution { .. }));
  assert_eq!(r.state(&path("a")), Some(ModelNodeState::Created));
  // the broken mutator is still first in line
  assert!(r.get::<Items>(&path("a")).is_err());
  assert_eq!(r.state(&path("a")), Some(ModelNodeState::Created));
}

#[test]
fn failed_mutator_is_retried_with_the_rest_of_its_stage() {
  let attempts = Rc::new(Cell::new(0));
  let counter = attempts.clone();
  let defaults = Rc::new(Cell::new(0));
  let seen = defaults.clone();
  let mut r = ModelRegistry::new();
  r.create(items_creator("a")).unwrap();
  r.mutate(
    MutationType::Defaults,
    ModelMutators::path::<Items>(path("a"), "defaults").build(move |_, _, _| {
      seen.set(seen.get() + 1);
      Ok(())
    }),
  )
  .unwrap();
  r.mutate(
    MutationType::Mutate,
    ModelMutators::path::<Items>(path("a"), "flaky").build(move |_, items, _| {
      counter.set(counter.get() + 1);
      if counter.get() == 1 {
        return Err("not yet".into());
      }
      items.borrow_mut().push("retried".to_string());
      Ok(())
    }),
  )
  .unwrap();
  r.mutate(MutationType::Mutate, push("a", "second", "second"))
    .unwrap();
  r.mutate(MutationType::Finalize, push("a", "finalize", "finalize"))
    .unwrap();

  let err = r.get::<Items>(&path("a")).unwrap_err();
  assert!(matches!(err, ModelError::RuleExecution { .. }));
  assert_eq!(r.state(&path("a")), Some(ModelNodeState::Created));

  assert_eq!(entries(&mut r, "a"), vec!["retried", "second", "finalize"]);
  assert_eq!(r.state(&path("a")), Some(ModelNodeState::GraphClosed));
  assert_eq!(attempts.get(), 2);
  assert_eq!(defaults.get(), 1);
}

#[test]
fn rule_cause_unwraps_model_errors_raised_inside_rules() {
  let mut r = ModelRegistry::new();
  r.create(
    ModelCreators::instance::<u32>(path("outer"), "outer")
      .input(ModelReference::of::<u32>(path("inner")))
      .value(|inputs| Ok(inputs.get::<u32>(0).copied().unwrap_or_default())),
  )
  .unwrap();
  r.create(
    ModelCreators::instance::<u32>(path("inner"), "inner").build(|node, _| {
      // the creator has already been taken, so this cannot succeed
      node.ensure_created()?;
      Ok(())
    }),
  )
  .unwrap();
  let err = r.get::<u32>(&path("outer")).unwrap_err();
  let ModelError::RuleExecution { descriptor, .. } = &err else {
    panic!("unexpected error: {err}");
  };
  assert_eq!(descriptor.as_str(), "inner");
  assert!(matches!(err.rule_cause(), Some(ModelError::NoCreator { .. })));
}

#[test]
fn remove_rejects_node_used_as_input() {
  let mut r = ModelRegistry::new();
  r.create(items_creator("a")).unwrap();
  r.create(ModelCreators::instance::<u32>(path("n"), "n").value(|_| Ok(1)))
    .unwrap();
  r.mutate(
    MutationType::Mutate,
    ModelMutators::path::<Items>(path("a"), "reads n")
      .input(ModelReference::of::<u32>(path("n")))
      .build(|_, _, _| Ok(())),
  )
  .unwrap();

  // queued mutator
  let err = r.remove(&path("n")).unwrap_err();
  assert!(matches!(err, ModelError::DependedOn { .. }));

  // fired mutator
  r.get::<Items>(&path("a")).unwrap();
  assert!(r.remove(&path("n")).is_err());

  // once the dependent subject is gone so is the record
  r.remove(&path("a")).unwrap();
  r.remove(&path("n")).unwrap();
  assert_eq!(r.find::<u32>(&path("n")).unwrap(), None);
  assert_eq!(r.find::<Items>(&path("a")).unwrap(), None);
}

#[test]
fn remove_drops_subtree_and_pending_rules() {
  let mut r = ModelRegistry::new();
  r.create(items_creator("a")).unwrap();
  r.mutate(MutationType::Mutate, push("a", "m", "x")).unwrap();
  r.remove(&path("a")).unwrap();
  assert_eq!(r.state(&path("a")), None);
  r.create(items_creator("a")).unwrap();
  assert!(entries(&mut r, "a").is_empty());
}

#[test]
fn listener_is_replayed_then_notified() {
  let seen: Rc<RefCell<Vec<ModelPath>>> = Rc::default();
  let mut r = ModelRegistry::new();
  r.create(items_creator("a")).unwrap();
  let sink = seen.clone();
  r.register_listener(move |creation: &ModelCreation| -> Result<bool, ModelError> {
    sink.borrow_mut().push(creation.path().clone());
    Ok(false)
  })
  .unwrap();
  r.create(items_creator("b")).unwrap();
  assert_eq!(*seen.borrow(), vec![path("a"), path("b")]);
}

#[test]
fn listener_returning_true_is_dropped() {
  let seen = Rc::new(Cell::new(0));
  let mut r = ModelRegistry::new();
  let sink = seen.clone();
  r.register_listener(move |_: &ModelCreation| -> Result<bool, ModelError> {
    sink.set(sink.get() + 1);
    Ok(true)
  })
  .unwrap();
  r.create(items_creator("a")).unwrap();
  r.create(items_creator("b")).unwrap();
  assert_eq!(seen.get(), 1);
}

#[test]
fn listener_error_propagates_to_create() {
  let mut r = ModelRegistry::new();
  r.register_listener(|creation: &ModelCreation| -> Result<bool, ModelError> {
    if creation.path().name() == "forbidden" {
      Err(ModelError::NoNode { path: creation.path().clone() })
    } else {
      Ok(false)
    }
  })
  .unwrap();
  r.create(items_creator("fine")).unwrap();
  assert!(r.create(items_creator("forbidden")).is_err());
  assert_eq!(r.state(&path("forbidden")), None);
  assert!(r.find::<Items>(&path("forbidden")).unwrap().is_none());
  assert!(entries(&mut r, "fine").is_empty());
}

#[test]
fn node_handle_closes_node() {
  let mut r = ModelRegistry::new();
  r.create(items_creator("a")).unwrap();
  let node = r.node(&path("a")).unwrap();
  assert_eq!(node.state().unwrap(), ModelNodeState::GraphClosed);
  assert!(r.node(&path("zzz")).is_err());
}

const STAGES: [MutationType; 5] = [
  MutationType::Defaults,
  MutationType::Initialize,
  MutationType::Mutate,
  MutationType::Finalize,
  MutationType::Validate,
];

proptest! {
  #[test]
  fn firing_order_is_by_stage_then_registration(order in proptest::collection::vec(0usize..5, 1..12)) {
    let mut r = ModelRegistry::new();
    r.create(items_creator("a")).unwrap();
    for (i, stage_index) in order.iter().enumerate() {
      let stage = STAGES[*stage_index];
      let label = format!("{}:{}", stage_index, i);
      r.mutate(
        stage,
        ModelMutators::path::<Items>(path("a"), label.as_str()).build(move |_, items, _| {
          items.borrow_mut().push(label.clone());
          Ok(())
        }),
      )
      .unwrap();
    }
    let fired = entries(&mut r, "a");
    let mut expected: Vec<(usize, usize)> = order.iter().copied().enumerate().map(|(i, s)| (s, i)).collect();
    expected.sort();
    let expected: Vec<String> = expected.into_iter().map(|(s, i)| format!("{}:{}", s, i)).collect();
    prop_assert_eq!(fired, expected);
  }
}
