use std::time::Duration;

/// Configuration for the request listener
///
/// # Examples
///
/// ```
/// use roundtrip::listener::ListenerConfig;
/// use std::time::Duration;
///
/// let config = ListenerConfig {
///     request_timeout: Duration::from_secs(2),
///     server_name: Some("Roundtrip/0.1".to_string()),
///     ..Default::default()
/// };
/// assert_eq!(config.max_pending, 128);
/// ```
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Deadline for reading a request head, and separately for its body
    pub request_timeout: Duration,
    /// Deadline for writing a response
    pub write_timeout: Duration,
    /// Largest request head accepted, in bytes
    pub max_head_size: usize,
    /// Largest request body accepted, in bytes
    pub max_body_size: usize,
    /// Parsed requests that may wait for the accept loop before readers block
    pub max_pending: usize,
    /// Value of the `Server` response header (optional)
    pub server_name: Option<String>,
    /// Answer `application/json` requests with a JSON envelope instead of text
    pub json_echo: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            max_head_size: 16 * 1024,
            max_body_size: 10 * 1024 * 1024, // 10MB
            max_pending: 128,
            server_name: None,
            json_echo: false,
        }
    }
}
