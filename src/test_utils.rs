use crate::listener::{ListenerConfig, RequestListener, RequestNotifier};
use crate::{Result, RoundtripError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

/// Lowest port handed out by [`free_port`]
const PORT_FLOOR: u16 = 20000;
/// Width of the window above `PORT_FLOOR`; stays inside 1024..=49151
const PORT_SPAN: u16 = 29000;

static NEXT_OFFSET: AtomicU16 = AtomicU16::new(0);

/// Finds a currently unused port in the range the lifecycle manager accepts.
///
/// Probes by binding and immediately releasing, so another process may still
/// take the port before the caller binds it.
pub fn free_port() -> Result<u16> {
    let seed = (std::process::id() % u32::from(PORT_SPAN)) as u16;

    for _ in 0..PORT_SPAN {
        let offset = NEXT_OFFSET.fetch_add(1, Ordering::Relaxed) % PORT_SPAN;
        let port = PORT_FLOOR + (seed + offset) % PORT_SPAN;
        if std::net::TcpListener::bind(("127.0.0.1", port)).is_ok() {
            return Ok(port);
        }
    }

    Err(RoundtripError::Config(
        "No free port available for tests".to_string(),
    ))
}

/// Starts a listener on an ephemeral loopback port for integration tests
pub async fn start_test_listener(
    config: ListenerConfig,
    notifier: Arc<dyn RequestNotifier>,
) -> Result<(RequestListener, SocketAddr)> {
    let mut listener = RequestListener::new(config, notifier);
    let addr = listener.start("127.0.0.1", 0).await?;
    Ok((listener, addr))
}
