use super::config::ListenerConfig;
use super::notifier::RequestNotifier;
use super::processor::{RequestProcessor, TIMEOUT_MESSAGE};
use super::protocol::{self, EchoResponse, HttpProtocolError, IncomingRequest};
use super::scope::{CancellationScope, ScopeExit};
use http::StatusCode;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Listener is already running on {0}")]
    AlreadyRunning(String),
    #[error("Port {port} is already in use")]
    PortInUse { port: u16 },
    #[error("Failed to bind {prefix}: {source}")]
    BindFailed {
        prefix: String,
        #[source]
        source: io::Error,
    },
}

/// The single prefix a running listener is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerEndpoint {
    pub address: String,
    pub port: u16,
    /// Address the socket actually bound to (port 0 resolves here)
    pub local_addr: SocketAddr,
}

impl ListenerEndpoint {
    pub fn prefix(&self) -> String {
        format!("http://{}:{}/", self.address, self.port)
    }
}

struct ActiveRun {
    endpoint: ListenerEndpoint,
    scope: CancellationScope,
    task: JoinHandle<()>,
}

/// HTTP listener bound to one prefix, processing every request concurrently
///
/// # Examples
///
/// ```no_run
/// use roundtrip::listener::{ListenerConfig, RequestListener};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let notifier = Arc::new(|line: &str| println!("{line}"));
///     let mut listener = RequestListener::new(ListenerConfig::default(), notifier);
///
///     let addr = listener.start("127.0.0.1", 8080).await?;
///     println!("listening on {addr}");
///
///     tokio::signal::ctrl_c().await?;
///     listener.stop().await;
///     Ok(())
/// }
/// ```
pub struct RequestListener {
    config: Arc<ListenerConfig>,
    notifier: Arc<dyn RequestNotifier>,
    active: Option<ActiveRun>,
}

impl RequestListener {
    pub fn new(config: ListenerConfig, notifier: Arc<dyn RequestNotifier>) -> Self {
        Self {
            config: Arc::new(config),
            notifier,
            active: None,
        }
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn endpoint(&self) -> Option<&ListenerEndpoint> {
        self.active.as_ref().map(|run| &run.endpoint)
    }

    /// Binds `http://{address}:{port}/` and starts the accept loop.
    ///
    /// Returns as soon as the socket is bound; requests are served on a
    /// background task until [`stop`](Self::stop).
    pub async fn start(&mut self, address: &str, port: u16) -> Result<SocketAddr, ListenerError> {
        if let Some(run) = &self.active {
            return Err(ListenerError::AlreadyRunning(run.endpoint.prefix()));
        }

        let host = match address.trim() {
            "*" | "+" => "0.0.0.0",
            other => other,
        };
        let prefix = format!("http://{address}:{port}/");

        let listener = TcpListener::bind((host, port)).await.map_err(|e| {
            if e.kind() == io::ErrorKind::AddrInUse {
                ListenerError::PortInUse { port }
            } else {
                ListenerError::BindFailed {
                    prefix: prefix.clone(),
                    source: e,
                }
            }
        })?;
        let local_addr = listener.local_addr().map_err(|e| ListenerError::BindFailed {
            prefix: prefix.clone(),
            source: e,
        })?;

        info!(%prefix, %local_addr, "Request listener listening");

        let scope = CancellationScope::root();
        let task = tokio::spawn(accept_loop(
            listener,
            scope.clone(),
            self.config.clone(),
            self.notifier.clone(),
        ));

        self.active = Some(ActiveRun {
            endpoint: ListenerEndpoint {
                address: address.to_string(),
                port,
                local_addr,
            },
            scope,
            task,
        });
        Ok(local_addr)
    }

    /// Cancels the run and waits for the socket to be released; no-op when idle
    pub async fn stop(&mut self) {
        let Some(run) = self.active.take() else {
            return;
        };

        run.scope.cancel();
        if let Err(e) = run.task.await {
            error!(error = %e, "Accept loop task failed");
        }
        info!(prefix = %run.endpoint.prefix(), "Request listener stopped");
    }
}

impl Drop for RequestListener {
    fn drop(&mut self) {
        if let Some(run) = &self.active {
            run.scope.cancel();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    scope: CancellationScope,
    config: Arc<ListenerConfig>,
    notifier: Arc<dyn RequestNotifier>,
) {
    let (queue_tx, mut queue_rx) = mpsc::channel::<IncomingRequest>(config.max_pending.max(1));

    loop {
        tokio::select! {
            biased;
            _ = scope.cancelled() => {
                info!("Received internal shutdown signal, stopping listener");
                break;
            }
            Some(request) = queue_rx.recv() => {
                let peer = request.peer;
                let method = request.method().clone();
                let span = tracing::info_span!("request", %peer, %method);
                let processor = span.in_scope(|| {
                    RequestProcessor::accept(request, &scope, config.clone(), notifier.clone())
                });

                tokio::spawn(async move {
                    let outcome = processor.process().instrument(span).await;
                    debug!(%peer, status = ?outcome.status, "Request finished");
                });
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "Accepted connection");
                        let queue = queue_tx.clone();
                        let scope = scope.clone();
                        let config = config.clone();
                        tokio::spawn(read_request(stream, peer, scope, config, queue));
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                    }
                }
            }
        }
    }
}

/// Waits for a full request head, then queues the request for acceptance
async fn read_request(
    mut stream: TcpStream,
    peer: SocketAddr,
    run: CancellationScope,
    config: Arc<ListenerConfig>,
    queue: mpsc::Sender<IncomingRequest>,
) {
    let scope = run.child_with_timeout(config.request_timeout);
    let server_name = config.server_name.as_deref();

    let head = scope
        .run(protocol::read_head(&mut stream, config.max_head_size))
        .await;

    match head {
        Ok(Ok((head, buffered))) => {
            let request = IncomingRequest::new(head, buffered, stream, peer);
            if queue.send(request).await.is_err() {
                debug!(%peer, "Listener stopped before request was accepted");
            }
        }
        Ok(Err(HttpProtocolError::IncompleteRequest)) => {
            debug!(%peer, "Connection closed before a request arrived");
        }
        Ok(Err(e)) => {
            warn!(%peer, error = %e, "Rejected malformed request");
            let response = EchoResponse::text(StatusCode::BAD_REQUEST, format!("Bad Request: {e}"));
            protocol::reject(&mut stream, &response, server_name).await;
        }
        Err(ScopeExit::TimedOut) => {
            warn!(%peer, "Request head not received in time");
            let response = EchoResponse::text(StatusCode::REQUEST_TIMEOUT, TIMEOUT_MESSAGE);
            protocol::reject(&mut stream, &response, server_name).await;
        }
        Err(ScopeExit::Cancelled) => {
            debug!(%peer, "Listener stopping, dropping unaccepted connection");
        }
    }
}
