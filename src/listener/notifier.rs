use super::processor::RequestOutcome;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Receives a one-line summary for every accepted request.
///
/// `request_received` is called synchronously from the accept loop, so the
/// order of calls matches acceptance order. Keep it cheap; hand the message
/// off to another task if displaying it takes time.
pub trait RequestNotifier: Send + Sync {
    fn request_received(&self, message: &str);

    /// Called once processing has finished, in completion order
    fn request_completed(&self, _outcome: &RequestOutcome) {}
}

impl<F> RequestNotifier for F
where
    F: Fn(&str) + Send + Sync,
{
    fn request_received(&self, message: &str) {
        self(message)
    }
}

/// Forwards notifications over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: UnboundedSender<String>,
}

impl ChannelNotifier {
    pub fn new(sender: UnboundedSender<String>) -> Self {
        Self { sender }
    }
}

impl RequestNotifier for ChannelNotifier {
    fn request_received(&self, message: &str) {
        if self.sender.send(message.to_string()).is_err() {
            debug!("Notification receiver dropped");
        }
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl RequestNotifier for NoopNotifier {
    fn request_received(&self, _message: &str) {}
}
