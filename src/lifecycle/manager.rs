use super::state::LifecycleState;
use super::validation::validate;
use crate::Result;
use crate::client::{MessageDispatcher, OutboundClient, OutboundTarget, SendReport};
use crate::feedback::{MessageSink, Severity};
use crate::listener::RequestListener;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const STARTED_MESSAGE: &str = "Server started successfully!";
pub const NOT_RUNNING_MESSAGE: &str =
    "The server is not running. Please start the server before sending messages.";

/// Owns the listener and the client and moves them between Stopped and Running
///
/// # Examples
///
/// ```no_run
/// use roundtrip::client::OutboundClient;
/// use roundtrip::feedback::TracingSink;
/// use roundtrip::lifecycle::ServerLifecycleManager;
/// use roundtrip::listener::{ListenerConfig, NoopNotifier, RequestListener};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let listener = RequestListener::new(ListenerConfig::default(), Arc::new(NoopNotifier));
///     let client = OutboundClient::new(Default::default())?;
///     let mut manager = ServerLifecycleManager::new(listener, client, Arc::new(TracingSink));
///
///     manager.start("127.0.0.1", "127.0.0.1", "8080", "8080").await?;
///     let report = manager.send_message("hello", "X-Test: 1").await;
///     println!("{}", report.response);
///     manager.stop().await;
///     Ok(())
/// }
/// ```
pub struct ServerLifecycleManager {
    listener: RequestListener,
    client: OutboundClient,
    dispatcher: MessageDispatcher,
    sink: Arc<dyn MessageSink>,
    state: LifecycleState,
}

impl ServerLifecycleManager {
    pub fn new(
        listener: RequestListener,
        client: OutboundClient,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            listener,
            client,
            dispatcher: MessageDispatcher::new(sink.clone()),
            sink,
            state: LifecycleState::Stopped,
        }
    }

    /// Validates the operator fields, binds the listener and configures the client.
    ///
    /// Does nothing when already running. On any failure the state stays
    /// Stopped and the error is both shown on the sink and returned.
    pub async fn start(
        &mut self,
        server_address: &str,
        client_address: &str,
        server_port: &str,
        client_port: &str,
    ) -> Result<()> {
        if self.state.is_running() {
            debug!("Start ignored, already running");
            return Ok(());
        }

        let settings = validate(server_address, client_address, server_port, client_port)
            .inspect_err(|e| {
                warn!(error = %e, "Rejected start parameters");
                self.sink.show(&e.to_string(), Severity::Error, None);
            })?;

        let local_addr = self
            .listener
            .start(&settings.server_address, settings.server_port)
            .await
            .inspect_err(|e| {
                warn!(error = %e, "Failed to start server");
                let message = format!("Failed to start server: {e}");
                self.sink.show(&message, Severity::Error, None);
            })?;

        self.client.configure(&settings.client_address, settings.client_port);
        let target = OutboundTarget::new(&settings.client_address, settings.client_port);

        info!(%local_addr, target = %target.base_url, "Server running");
        self.state.bound(local_addr, target);
        let dismiss = Some(Duration::from_secs(3));
        self.sink.show(STARTED_MESSAGE, Severity::Success, dismiss);
        Ok(())
    }

    /// Stops the listener; does nothing when already stopped
    pub async fn stop(&mut self) {
        if !self.state.is_running() {
            return;
        }

        self.listener.stop().await;
        if let Some(local_addr) = self.state.released() {
            info!(%local_addr, "Server stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn client(&self) -> &OutboundClient {
        &self.client
    }

    /// Sends `body` to the configured target if the server is running
    pub async fn send_message(&self, body: &str, headers: &str) -> SendReport {
        if !self.state.is_running() {
            self.sink.show(NOT_RUNNING_MESSAGE, Severity::Info, None);
            return SendReport {
                success: false,
                response: NOT_RUNNING_MESSAGE.to_string(),
            };
        }

        self.dispatcher.send_message(&self.client, body, headers).await
    }
}
