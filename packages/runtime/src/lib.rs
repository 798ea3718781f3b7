//! Reactivity core for data-bound pages.
//!
//! A page holds named string variables. Rendered nodes declare which
//! variables they depend on and how to react; every write re-applies exactly
//! those effects to the render surface, cloning list templates and placing
//! external children along the way.

pub mod action;
pub mod dependency;
pub mod dispatcher;
pub mod error;
pub mod external;
pub mod handlers;
pub mod instance;
pub mod list;
pub mod memory_surface;
pub mod node_key;
pub mod options;
pub mod propagator;
pub mod resolver;
pub mod runtime;
pub mod store;
pub mod style;
pub mod surface;
pub mod value;


#[cfg(test)]
mod tests_dispatch;

#[cfg(test)]
mod tests_lists;

#[cfg(test)]
mod tests_external;

pub use action::{Action, ActionDescriptor, ActionParameter, ValueKind};
pub use dependency::{Condition, Dependency, StyleParameter, StyleValue};
pub use dispatcher::{ActionOutcome, InteractionReport};
pub use error::{ActionError, HandlerError, RuntimeError, RuntimeResult, SurfaceError};
pub use external::{ExternalChildRegistration, ExternalChildren};
pub use handlers::{HandlerCall, HandlerRegistry};
pub use instance::Instance;
pub use memory_surface::{MemorySurface, NodeRef, SurfaceNode};
pub use node_key::{InstanceId, NodeKey};
pub use options::RuntimeOptions;
pub use propagator::{PropagationReport, SkipReason, WriteOutcome};
pub use runtime::{InsertPosition, Runtime};
pub use store::{Variable, VariableStore};
pub use style::{CssStyleEffector, StyleEffector};
pub use surface::{LayoutMode, RenderSurface};
pub use value::WriteValue;
