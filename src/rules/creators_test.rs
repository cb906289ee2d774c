//! Tests for the closure-backed creators and mutators.

use std::cell::RefCell;
use std::rc::Rc;

use super::{ModelCreator, ModelCreators, ModelMutator, ModelMutators};
use crate::collection::{CollectionBuilder, DefaultNamedCollection, NamedCollection};
use crate::error::ModelError;
use crate::registry::ModelRegistry;
use crate::types::{ModelPath, ModelReference, ModelType, MutationType};

fn path(p: &str) -> ModelPath {
  ModelPath::path(p)
}

#[test]
fn builder_exposes_rule_metadata() {
  let creator = ModelCreators::instance::<u32>(path("count"), "count rule")
    .input(ModelReference::of::<String>(path("label")))
    .inputs([ModelReference::of_type::<u64>()])
    .value(|_| Ok(0u32));
  assert_eq!(creator.path(), &path("count"));
  assert_eq!(creator.descriptor().as_str(), "count rule");
  assert_eq!(creator.inputs().len(), 2);
  assert!(creator.inputs()[1].path().is_none());
  assert!(creator.promise().can_be_viewed_as_writable(&ModelType::of::<u32>()));
  assert!(!creator.promise().can_be_viewed_as_read_only(&ModelType::of::<String>()));

  let mutator = ModelMutators::by_type::<u32>("bump")
    .input(ModelReference::of::<String>(path("label")))
    .build(|_, _, _| Ok(()));
  assert!(mutator.subject().path().is_none());
  assert_eq!(mutator.subject().model_type(), &ModelType::of::<u32>());
  assert_eq!(mutator.descriptor().as_str(), "bump");
  assert_eq!(mutator.inputs().len(), 1);
}

#[test]
fn value_creator_reads_its_inputs() {
  let mut r = ModelRegistry::new();
  r.create(ModelCreators::instance::<String>(path("label"), "label").value(|_| Ok("hi".to_string())))
    .unwrap();
  r.create(
    ModelCreators::instance::<String>(path("greeting"), "greeting")
      .input(ModelReference::of::<String>(path("label")))
      .value(|inputs| {
        let label = inputs.get::<String>(0).ok_or("missing label")?;
        Ok(format!("{label}, world"))
      }),
  )
  .unwrap();
  assert_eq!(r.get::<String>(&path("greeting")).unwrap(), "hi, world");
}

#[test]
fn mutator_with_wrong_subject_type_is_rejected_at_binding() {
  let mut r = ModelRegistry::new();
  r.create(ModelCreators::instance::<u32>(path("n"), "n").value(|_| Ok(1u32)))
    .unwrap();
  let err = r
    .mutate(
      MutationType::Mutate,
      ModelMutators::path::<String>(path("n"), "wrong").build(|_, _, _| Ok(())),
    )
    .unwrap_err();
  assert!(matches!(err, ModelError::IncompatibleReference { .. }));
}

#[test]
fn collection_creator_hands_out_builders() {
  let collection = DefaultNamedCollection::with_default("tasks", ModelType::of::<String>(), |name| {
    format!("task {name}")
  });
  let mut r = ModelRegistry::new();
  r.create(ModelCreators::collection(path("tasks"), "tasks", collection.clone()))
    .unwrap();
  r.mutate(
    MutationType::Defaults,
    ModelMutators::path::<CollectionBuilder<String>>(path("tasks"), "add build").build(
      |_, tasks, _| {
        tasks.create("build")?;
        Ok(())
      },
    ),
  )
  .unwrap();

  let tasks = r.get::<CollectionBuilder<String>>(&path("tasks")).unwrap();
  assert!(tasks.is_closed());
  assert_eq!(tasks.size(), 1);
  assert_eq!(*tasks.property("build").unwrap().borrow(), "task build");
  assert!(matches!(
    tasks.create("late").unwrap_err(),
    ModelError::ViewClosed { .. }
  ));
  assert_eq!(collection.names(), vec!["build"]);
}

#[test]
fn creator_body_can_fail() {
  let mut r = ModelRegistry::new();
  r.create(
    ModelCreators::instance::<Rc<RefCell<u8>>>(path("broken"), "broken")
      .build(|_, _| Err("nothing to build".into())),
  )
  .unwrap();
  let err = r.get::<Rc<RefCell<u8>>>(&path("broken")).unwrap_err();
  assert_eq!(
    err.to_string(),
    "Exception thrown while executing model rule: broken"
  );
}
