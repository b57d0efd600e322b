use super::config::ClientConfig;
use super::transport::{OutboundRequest, ReqwestTransport, Transport, TransportFailure};
use crate::headers::{HeaderError, parse_header_block};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("Client must be configured before sending requests")]
    NotConfigured,
    #[error("Request body must not be empty")]
    EmptyBody,
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error("Request timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),
    #[error("Could not connect to target: {0}")]
    Unreachable(String),
    #[error("{0}")]
    TransportError(String),
}

/// Where outbound requests go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundTarget {
    pub base_url: String,
}

impl OutboundTarget {
    pub fn new(address: &str, port: u16) -> Self {
        Self {
            base_url: format!("http://{}:{port}/", address.trim()),
        }
    }
}

/// Single-target HTTP client sending one POST per call
///
/// # Examples
///
/// ```no_run
/// use roundtrip::client::OutboundClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut client = OutboundClient::new(Default::default())?;
///     client.configure("127.0.0.1", 8080);
///
///     let reply = client
///         .send_request("hello", "Content-Type: text/plain\nX-Trace: 1")
///         .await?;
///     println!("{reply}");
///     Ok(())
/// }
/// ```
pub struct OutboundClient {
    target: Option<OutboundTarget>,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl OutboundClient {
    /// Creates an unconfigured client backed by `reqwest`
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(&config)
            .map_err(|e| ClientError::TransportError(e.to_string()))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            target: None,
            config,
            transport,
        }
    }

    /// Points the client at `http://{address}:{port}/`, replacing any earlier target
    pub fn configure(&mut self, address: &str, port: u16) {
        let target = OutboundTarget::new(address, port);
        info!(base_url = %target.base_url, "Outbound client configured");
        self.target = Some(target);
    }

    pub fn target(&self) -> Option<&OutboundTarget> {
        self.target.as_ref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Builds and sends one POST carrying `body` and the parsed `raw_headers`.
    ///
    /// Nothing is sent unless the whole header block is valid.
    pub async fn send_request(&self, body: &str, raw_headers: &str) -> Result<String, ClientError> {
        let target = self.target.as_ref().ok_or(ClientError::NotConfigured)?;
        if body.trim().is_empty() {
            return Err(ClientError::EmptyBody);
        }

        let headers = parse_header_block(raw_headers)?;
        let request = OutboundRequest::new(&target.base_url, body).with_headers(headers);
        debug!(
            url = %request.url,
            size = request.body.len(),
            headers = request.content_headers.len() + request.request_headers.len(),
            "Sending request"
        );

        match self.transport.send(&request).await {
            Ok(response) => {
                info!(url = %request.url, size = response.len(), "Received response");
                Ok(response)
            }
            Err(failure) => {
                warn!(url = %request.url, error = %failure, "Request failed");
                Err(match failure {
                    TransportFailure::Timeout => ClientError::Timeout(self.config.request_timeout),
                    TransportFailure::Unreachable(message) => ClientError::Unreachable(message),
                    TransportFailure::Other(message) => ClientError::TransportError(message),
                })
            }
        }
    }
}
