//! Value types of the model graph: paths, type tokens, references, promises,
//! views and adapters.

mod adapter;
mod inputs;
mod model_path;
mod model_reference;
mod model_type;
mod mutation_type;
mod node_state;
mod private_data;
mod promise;
mod rule_descriptor;
mod unbound_rule;
mod view;

pub use adapter::{InstanceModelAdapter, ModelAdapter};
pub use inputs::{Inputs, ModelRuleInput};
pub use model_path::ModelPath;
pub use model_reference::{ModelBinding, ModelReference};
pub use model_type::ModelType;
pub use mutation_type::MutationType;
pub use node_state::ModelNodeState;
pub use private_data::PrivateData;
pub use promise::{ModelPromise, SimpleModelPromise};
pub use rule_descriptor::ModelRuleDescriptor;
pub use unbound_rule::{UnboundRule, UnboundRuleInput, UnboundRulesReport};
pub use view::{InstanceModelView, ModelView};
