//! Local HTTP listener
//!
//! Binds a single `http://{address}:{port}/` prefix, accepts requests of any
//! method on any path, and answers each one with a timestamped echo of its
//! body. Every request is processed on its own task under a timeout scope
//! derived from the run's cancellation scope.

pub mod config;
pub mod notifier;
pub mod processor;
pub mod protocol;
pub mod scope;
pub mod server;


pub use config::ListenerConfig;
pub use notifier::{ChannelNotifier, NoopNotifier, RequestNotifier};
pub use processor::{OutcomeStatus, RequestOutcome, RequestProcessor, TIMEOUT_MESSAGE};
pub use protocol::{EchoResponse, HttpProtocolError, IncomingRequest, RequestHead};
pub use scope::{CancellationScope, ScopeExit};
pub use server::{ListenerEndpoint, ListenerError, RequestListener};
