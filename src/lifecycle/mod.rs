//! Start/stop orchestration of the listener and the outbound client

pub mod manager;
pub mod state;
pub mod validation;

#[cfg(test)]
mod tests;

pub use manager::{NOT_RUNNING_MESSAGE, STARTED_MESSAGE, ServerLifecycleManager};
pub use state::LifecycleState;
pub use validation::{
    CLIENT_PORT_RANGE, EndpointSettings, SERVER_PORT_RANGE, ValidationError, validate,
    validate_client_target,
};
