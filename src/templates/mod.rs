//! Object templates: registry, placement binding and interaction execution.
pub mod binder;
pub mod interaction;
pub mod registry;

pub use binder::{BoundMap, BoundObject, PublicObject, RuntimeRecord, bind_objects};
pub use interaction::{InteractionEvent, InteractionOutcome, Player, execute_interaction};
pub use registry::{ObjectRegistry, TemplateSet};
