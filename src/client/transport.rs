use super::config::ClientConfig;
use crate::headers::{ClassifiedHeader, HeaderClass};
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::error::Error as StdError;
use std::io;
use tracing::debug;

/// A fully assembled POST, ready for the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub url: String,
    pub body: String,
    /// Media type of the body, from a `Content-Type` line
    pub content_type: Option<String>,
    /// Other `Content-*` headers, attached to the body
    pub content_headers: Vec<(String, String)>,
    /// Everything else, attached to the request
    pub request_headers: Vec<(String, String)>,
}

impl OutboundRequest {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            content_type: None,
            content_headers: Vec::new(),
            request_headers: Vec::new(),
        }
    }

    /// Routes each header to the body or the request according to its class
    pub fn with_headers(mut self, headers: Vec<ClassifiedHeader>) -> Self {
        for header in headers {
            let (name, value) = (header.line.name, header.line.value);
            match header.class {
                HeaderClass::ContentType => self.content_type = Some(value),
                HeaderClass::OtherContentMetadata => self.content_headers.push((name, value)),
                HeaderClass::RequestMetadata => self.request_headers.push((name, value)),
            }
        }
        self
    }
}

/// Why a transport call failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportFailure {
    #[error("request timed out")]
    Timeout,
    /// No connection could be established (refused, unreachable, unresolvable)
    #[error("{0}")]
    Unreachable(String),
    #[error("{0}")]
    Other(String),
}

/// Sends an assembled request and returns the response body as text
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<String, TransportFailure>;
}

/// `reqwest`-backed transport with a total request timeout and no idle pooling
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportFailure> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(0);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        let client = builder.build().map_err(classify)?;
        Ok(Self { client })
    }

    fn header_map(request: &OutboundRequest) -> Result<HeaderMap, TransportFailure> {
        let mut headers = HeaderMap::new();

        if let Some(content_type) = &request.content_type {
            headers.insert(CONTENT_TYPE, header_value(CONTENT_TYPE.as_str(), content_type)?);
        }
        for (name, value) in &request.content_headers {
            let name = header_name(name)?;
            // Framing is derived from the body itself
            if name == CONTENT_LENGTH {
                debug!(value = %value, "Ignoring operator Content-Length");
                continue;
            }
            let value = header_value(name.as_str(), value)?;
            headers.append(name, value);
        }
        for (name, value) in &request.request_headers {
            headers.append(header_name(name)?, header_value(name, value)?);
        }

        Ok(headers)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<String, TransportFailure> {
        let headers = Self::header_map(request)?;

        let response = self
            .client
            .post(&request.url)
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await
            .map_err(classify)?;

        response.text().await.map_err(classify)
    }
}

fn header_name(name: &str) -> Result<HeaderName, TransportFailure> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| TransportFailure::Other(format!("header {name} cannot be sent: {e}")))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, TransportFailure> {
    HeaderValue::from_str(value)
        .map_err(|e| TransportFailure::Other(format!("value of header {name} cannot be sent: {e}")))
}

/// Maps a `reqwest` error onto an explicit failure kind
fn classify(err: reqwest::Error) -> TransportFailure {
    if err.is_timeout() || has_io_kind(&err, io::ErrorKind::TimedOut) {
        TransportFailure::Timeout
    } else if err.is_connect() {
        TransportFailure::Unreachable(describe(&err))
    } else {
        TransportFailure::Other(describe(&err))
    }
}

fn has_io_kind(err: &(dyn StdError + 'static), kind: io::ErrorKind) -> bool {
    let mut source = Some(err);
    while let Some(current) = source {
        if current
            .downcast_ref::<io::Error>()
            .is_some_and(|io| io.kind() == kind)
        {
            return true;
        }
        source = current.source();
    }
    false
}

/// Joins the error chain so the root cause is visible to the operator
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
