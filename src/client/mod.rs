//! Outbound HTTP client
//!
//! Sends one POST per operator action to a configured target, with headers
//! parsed from a free-form block and a bounded request timeout.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod transport;


pub use client::{ClientError, OutboundClient, OutboundTarget};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use dispatch::{MessageDispatcher, SendReport};
pub use transport::{OutboundRequest, ReqwestTransport, Transport, TransportFailure};
