use super::config::ListenerConfig;
use super::notifier::RequestNotifier;
use super::protocol::{EchoResponse, IncomingRequest};
use super::scope::{CancellationScope, ScopeExit};
use chrono::Local;
use http::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Local-time format shared by notifications and echo bodies
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const TIMEOUT_MESSAGE: &str = "Request processing timed out";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Ok,
    Timeout,
    Error,
}

/// What happened to one accepted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub status: OutcomeStatus,
    pub payload: String,
}

impl RequestOutcome {
    fn ok(payload: String) -> Self {
        Self {
            status: OutcomeStatus::Ok,
            payload,
        }
    }

    fn timeout() -> Self {
        Self {
            status: OutcomeStatus::Timeout,
            payload: TIMEOUT_MESSAGE.to_string(),
        }
    }

    fn error(message: impl std::fmt::Display) -> Self {
        Self {
            status: OutcomeStatus::Error,
            payload: format!("An error occurred: {message}"),
        }
    }

    /// HTTP status written for this outcome
    pub fn http_status(&self) -> StatusCode {
        match self.status {
            OutcomeStatus::Ok => StatusCode::OK,
            OutcomeStatus::Timeout => StatusCode::REQUEST_TIMEOUT,
            OutcomeStatus::Error => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct JsonEcho<'a> {
    timestamp: &'a str,
    #[serde(rename = "receivedData")]
    received_data: serde_json::Value,
}

pub fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Per-request state, from acceptance to the closed connection
pub struct RequestProcessor {
    request: IncomingRequest,
    timestamp: String,
    scope: CancellationScope,
    config: Arc<ListenerConfig>,
    notifier: Arc<dyn RequestNotifier>,
}

impl RequestProcessor {
    /// Takes ownership of an accepted request.
    ///
    /// Emits the "received" notification before returning, so calling this
    /// from the accept loop keeps notifications in acceptance order. The
    /// request's timeout scope is a child of `run`.
    pub fn accept(
        request: IncomingRequest,
        run: &CancellationScope,
        config: Arc<ListenerConfig>,
        notifier: Arc<dyn RequestNotifier>,
    ) -> Self {
        let timestamp = timestamp_now();
        notifier.request_received(&format!(
            "[{timestamp}] Received {} request.",
            request.method()
        ));

        Self {
            scope: run.child_with_timeout(config.request_timeout),
            request,
            timestamp,
            config,
            notifier,
        }
    }

    /// Reads the body, answers, and closes the connection on every path
    pub async fn process(mut self) -> RequestOutcome {
        let read = self
            .scope
            .run(self.request.read_body(self.config.max_body_size))
            .await;

        let outcome = match read {
            Ok(Ok(body)) => match self.compose(&body) {
                Ok(response) => self.respond(response).await,
                Err(e) => {
                    error!(error = %e, "Failed to compose response");
                    let outcome = RequestOutcome::error(e);
                    self.respond_with(&outcome).await
                }
            },
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to read request body");
                let outcome = RequestOutcome::error(e);
                self.respond_with(&outcome).await
            }
            Err(exit) => {
                match exit {
                    ScopeExit::TimedOut => warn!(
                        timeout_ms = self.config.request_timeout.as_millis() as u64,
                        "Request body not received in time"
                    ),
                    ScopeExit::Cancelled => debug!("Listener stopping, abandoning request"),
                }
                self.respond_with(&RequestOutcome::timeout()).await
            }
        };

        if outcome.status == OutcomeStatus::Ok {
            info!(size = outcome.payload.len(), "Echoed request");
        }

        let Self {
            request, notifier, ..
        } = self;
        request.close().await;

        notifier.request_completed(&outcome);
        outcome
    }

    fn compose(&self, body: &[u8]) -> Result<(EchoResponse, RequestOutcome), serde_json::Error> {
        let wants_json = self.config.json_echo
            && self
                .request
                .content_type()
                .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));

        if wants_json {
            let received_data: serde_json::Value = serde_json::from_slice(body)?;
            let payload = serde_json::to_string(&JsonEcho {
                timestamp: &self.timestamp,
                received_data,
            })?;
            let response = EchoResponse {
                status: StatusCode::OK,
                content_type: EchoResponse::JSON,
                body: payload.clone(),
            };
            return Ok((response, RequestOutcome::ok(payload)));
        }

        let payload = format!(
            "[{}] Received: {}",
            self.timestamp,
            String::from_utf8_lossy(body)
        );
        Ok((
            EchoResponse::text(StatusCode::OK, payload.clone()),
            RequestOutcome::ok(payload),
        ))
    }

    async fn respond_with(&mut self, outcome: &RequestOutcome) -> RequestOutcome {
        let response = EchoResponse::text(outcome.http_status(), outcome.payload.clone());
        self.respond((response, outcome.clone())).await
    }

    async fn respond(
        &mut self,
        (response, outcome): (EchoResponse, RequestOutcome),
    ) -> RequestOutcome {
        let write = timeout(
            self.config.write_timeout,
            self.request
                .write_response(&response, self.config.server_name.as_deref()),
        )
        .await;

        match write {
            Ok(Ok(())) => outcome,
            Ok(Err(e)) => {
                error!(error = %e, "Failed to write response");
                RequestOutcome::error(e)
            }
            Err(_) => {
                warn!("Write timeout");
                RequestOutcome::error("response write timed out")
            }
        }
    }
}
