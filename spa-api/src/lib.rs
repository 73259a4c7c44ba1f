pub mod action;
pub mod dispatcher;
pub mod params;
pub mod registry;
pub mod version;

pub use action::{action_fn, Action, ActionContext, ActionFuture, ActionResponse, BodyProducer, Params};
pub use dispatcher::{dispatch, routes, ApiState};
pub use registry::{ActionRegistry, ActionRegistryBuilder, RegistryError};
pub use version::GetVersion;

/// Registry with the built-in actions.
pub fn default_registry() -> Result<ActionRegistry, RegistryError> {
    ActionRegistry::builder().register(GetVersion).build()
}
