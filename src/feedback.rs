//! Operator-facing message sink
//!
//! Lifecycle and send outcomes are reported as `(message, severity,
//! optional auto-dismiss)` triples. How they are displayed is up to the
//! embedder; the CLI logs them through `tracing`.

use std::fmt;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Receives operator-facing messages
pub trait MessageSink: Send + Sync {
    /// Shows `message`; `dismiss_after` of `None` means it stays until replaced.
    ///
    /// An empty `message` clears whatever is shown at that severity.
    fn show(&self, message: &str, severity: Severity, dismiss_after: Option<Duration>);
}

impl<F> MessageSink for F
where
    F: Fn(&str, Severity, Option<Duration>) + Send + Sync,
{
    fn show(&self, message: &str, severity: Severity, dismiss_after: Option<Duration>) {
        self(message, severity, dismiss_after)
    }
}

/// Sink that forwards every message to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MessageSink for TracingSink {
    fn show(&self, message: &str, severity: Severity, dismiss_after: Option<Duration>) {
        if message.is_empty() {
            return;
        }
        let dismiss_ms = dismiss_after.map(|d| d.as_millis() as u64);
        match severity {
            Severity::Error => error!(%severity, ?dismiss_ms, "{message}"),
            Severity::Info | Severity::Success => info!(%severity, ?dismiss_ms, "{message}"),
        }
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::{MessageSink, Severity};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Keeps every message it is shown, for assertions
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        pub messages: Mutex<Vec<(String, Severity, Option<Duration>)>>,
    }

    impl RecordingSink {
        pub fn last(&self) -> Option<(String, Severity, Option<Duration>)> {
            self.messages.lock().unwrap().last().cloned()
        }

        pub fn len(&self) -> usize {
            self.messages.lock().unwrap().len()
        }
    }

    impl MessageSink for RecordingSink {
        fn show(&self, message: &str, severity: Severity, dismiss_after: Option<Duration>) {
            self.messages
                .lock()
                .unwrap()
                .push((message.to_string(), severity, dismiss_after));
        }
    }
}
