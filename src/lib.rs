use thiserror::Error;

/// Error types for the roundtrip library
#[derive(Error, Debug)]
pub enum RoundtripError {
    /// Operator input rejected before any network action
    #[error(transparent)]
    Validation(#[from] lifecycle::ValidationError),

    /// Listener bind or run errors
    #[error(transparent)]
    Listener(#[from] listener::ListenerError),

    /// Outbound request errors
    #[error(transparent)]
    Client(#[from] client::ClientError),

    /// Malformed operator header block
    #[error(transparent)]
    Header(#[from] headers::HeaderError),

    /// Settings file errors
    #[error(transparent)]
    Settings(#[from] settings::SettingsError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for the roundtrip library
pub type Result<T> = std::result::Result<T, RoundtripError>;

pub mod client;
pub mod feedback;
pub mod headers;
pub mod lifecycle;
pub mod listener;
pub mod settings;
pub mod test_utils;

// Re-export main types for convenience
pub use client::{ClientConfig, ClientError, MessageDispatcher, OutboundClient, SendReport};
pub use feedback::{MessageSink, Severity, TracingSink};
pub use headers::{ClassifiedHeader, HeaderClass, HeaderError, parse_header_block};
pub use lifecycle::{LifecycleState, ServerLifecycleManager, ValidationError};
pub use listener::{
    ListenerConfig, ListenerError, RequestListener, RequestNotifier, RequestOutcome,
    RequestProcessor,
};
pub use settings::{SettingsError, SettingsStore};
