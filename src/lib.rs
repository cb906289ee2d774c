//! # streamweave-model
//!
//! A rule-driven, lazily evaluated configuration graph for build models.
//!
//! ## Architecture
//!
//! Rules are registered against a [ModelRegistry] and bound to nodes as the
//! nodes become known:
//!
//! - a creator ([rules::ModelCreator]) registers a node `Known` and later
//!   populates its private data;
//! - a mutator ([rules::ModelMutator]) is queued under its subject for one
//!   [MutationType] stage once its subject and inputs are bound.
//!
//! Nothing runs until a node is read. Reading closes it through
//! `Known -> Created -> SelfClosed -> GraphClosed`. Rules that never bind are
//! reported by [ModelRegistry::validate].
//!
//! The `collection` module layers a closeable [collection::CollectionBuilder]
//! view over named element collections.

pub mod collection;
pub mod error;
pub mod graph;
pub mod registry;
pub mod rules;
pub mod types;

pub use collection::{CollectionBuilder, DefaultNamedCollection};
pub use error::{ModelError, RuleError};
pub use registry::{ModelCreationListener, ModelRegistry, MutableModelNode, RegistryOptions};
pub use rules::{ModelCreators, ModelMutators};
pub use types::{ModelNodeState, ModelPath, ModelReference, ModelRuleDescriptor, ModelType, MutationType};
