use super::client::{ClientError, OutboundClient};
use crate::feedback::{MessageSink, Severity};
use std::sync::Arc;

pub const EMPTY_BODY_MESSAGE: &str = "Message body cannot be empty.";
pub const UNREACHABLE_MESSAGE: &str =
    "Connection refused. Make sure the server is running and the address/port are correct.";

/// Result of an operator send, as shown to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    pub success: bool,
    /// Response body on success, otherwise the message that was shown
    pub response: String,
}

impl SendReport {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            response: message,
        }
    }
}

/// Turns client results into operator-facing messages
pub struct MessageDispatcher {
    sink: Arc<dyn MessageSink>,
}

impl MessageDispatcher {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self { sink }
    }

    pub async fn send_message(
        &self,
        client: &OutboundClient,
        body: &str,
        headers: &str,
    ) -> SendReport {
        if body.trim().is_empty() {
            return self.fail(EMPTY_BODY_MESSAGE.to_string());
        }

        match client.send_request(body, headers).await {
            Ok(response) => {
                self.clear();
                SendReport {
                    success: true,
                    response,
                }
            }
            Err(ClientError::Unreachable(_)) => self.fail(UNREACHABLE_MESSAGE.to_string()),
            Err(ClientError::Timeout(after)) => self.fail(format!(
                "The request timed out after {} seconds.",
                after.as_secs_f64()
            )),
            Err(e) => self.fail(format!("An error occurred: {e}")),
        }
    }

    /// Dismisses any error or info message left over from an earlier send
    fn clear(&self) {
        self.sink.show("", Severity::Error, None);
        self.sink.show("", Severity::Info, None);
    }

    fn fail(&self, message: String) -> SendReport {
        self.sink.show(&message, Severity::Error, None);
        SendReport::failed(message)
    }
}
