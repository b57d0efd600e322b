use super::*;
use crate::RoundtripError;
use crate::client::{ClientConfig, ClientError, OutboundClient};
use crate::feedback::Severity;
use crate::feedback::recording::RecordingSink;
use crate::listener::{ListenerConfig, ListenerError, NoopNotifier, RequestListener};
use crate::test_utils::free_port;
use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn manager_with_sink() -> (ServerLifecycleManager, Arc<RecordingSink>) {
    manager_notifying(Arc::new(NoopNotifier))
}

fn manager_notifying(
    notifier: Arc<dyn crate::listener::RequestNotifier>,
) -> (ServerLifecycleManager, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let listener = RequestListener::new(ListenerConfig::default(), notifier);
    let client = OutboundClient::new(ClientConfig::default()).unwrap();
    (
        ServerLifecycleManager::new(listener, client, sink.clone()),
        sink,
    )
}

#[test]
fn test_validation_order() {
    let cases = [
        (("", "", "x", "x"), ValidationError::EmptyServerAddress),
        (("  ", "127.0.0.1", "8080", "8080"), ValidationError::EmptyServerAddress),
        (("127.0.0.1", " ", "x", "x"), ValidationError::EmptyClientAddress),
        (("127.0.0.1", "127.0.0.1", "80a", "x"), ValidationError::InvalidServerPort),
        (("127.0.0.1", "127.0.0.1", "8080", ""), ValidationError::InvalidClientPort),
        (("127.0.0.1", "127.0.0.1", "80", "0"), ValidationError::ServerPortOutOfRange(80)),
        (("127.0.0.1", "127.0.0.1", "49152", "8080"), ValidationError::ServerPortOutOfRange(49152)),
        (("127.0.0.1", "127.0.0.1", "8080", "0"), ValidationError::ClientPortOutOfRange(0)),
        (("127.0.0.1", "127.0.0.1", "8080", "65536"), ValidationError::ClientPortOutOfRange(65536)),
    ];

    for ((server, client, server_port, client_port), expected) in cases {
        assert_eq!(
            validate(server, client, server_port, client_port),
            Err(expected.clone()),
            "inputs: {server:?} {client:?} {server_port:?} {client_port:?}"
        );
    }
}

#[test]
fn test_validation_messages() {
    assert_eq!(
        ValidationError::InvalidServerPort.to_string(),
        "Invalid server inbound port. Please enter a valid number."
    );
    assert_eq!(
        ValidationError::ServerPortOutOfRange(80).to_string(),
        "Server inbound port number must be between 1024 and 49151."
    );
    assert_eq!(
        ValidationError::EmptyClientAddress.to_string(),
        "Client outbound address must not be empty."
    );
}

#[test]
fn test_validation_accepts_range_edges() {
    let low = validate("localhost", "localhost", " 1024 ", "1").unwrap();
    assert_eq!(low.server_port, 1024);
    assert_eq!(low.client_port, 1);

    let high = validate(" * ", "10.0.0.2", "49151", "65535").unwrap();
    assert_eq!(high.server_address, "*");
    assert_eq!(high.server_port, 49151);
    assert_eq!(high.client_port, 65535);
}

proptest! {
    #[test]
    fn non_numeric_server_port_is_rejected(
        port in "[a-zA-Z ._-]{0,8}",
        client_port in ".{0,8}",
    ) {
        prop_assert_eq!(
            validate("127.0.0.1", "127.0.0.1", &port, &client_port),
            Err(ValidationError::InvalidServerPort)
        );
    }

    #[test]
    fn out_of_range_server_port_is_rejected(
        port in prop_oneof![-100_000i32..1024, 49152i32..200_000],
    ) {
        prop_assert_eq!(
            validate("127.0.0.1", "127.0.0.1", &port.to_string(), "8080"),
            Err(ValidationError::ServerPortOutOfRange(port))
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn invalid_start_never_binds(server_port in "[0-9]{0,3}|[a-z]{1,5}") {
        let (mut manager, sink) = manager_with_sink();

        let result = tokio_test::block_on(
            manager.start("127.0.0.1", "127.0.0.1", &server_port, "8080"),
        );

        prop_assert!(matches!(result, Err(RoundtripError::Validation(_))));
        prop_assert!(!manager.is_running());
        prop_assert_eq!(sink.last().map(|(_, severity, _)| severity), Some(Severity::Error));
    }
}

#[tokio::test]
async fn test_invalid_start_stays_stopped() {
    let (mut manager, sink) = manager_with_sink();

    let result = manager.start("127.0.0.1", "127.0.0.1", "80", "8080").await;

    assert!(matches!(
        result,
        Err(RoundtripError::Validation(ValidationError::ServerPortOutOfRange(80)))
    ));
    assert!(!manager.is_running());
    assert_eq!(manager.state(), &LifecycleState::Stopped);
    assert_eq!(
        sink.last(),
        Some((
            "Server inbound port number must be between 1024 and 49151.".to_string(),
            Severity::Error,
            None
        ))
    );
}

#[tokio::test]
async fn test_start_and_stop() {
    let (mut manager, sink) = manager_with_sink();
    let port = free_port().unwrap();

    manager
        .start("127.0.0.1", "127.0.0.1", &port.to_string(), "9000")
        .await
        .unwrap();

    assert!(manager.is_running());
    match manager.state() {
        LifecycleState::Running { local_addr, target } => {
            assert_eq!(local_addr.port(), port);
            assert_eq!(target.base_url, "http://127.0.0.1:9000/");
        }
        LifecycleState::Stopped => panic!("expected running"),
    }
    assert_eq!(
        manager.client().target().map(|t| t.base_url.as_str()),
        Some("http://127.0.0.1:9000/")
    );
    assert_eq!(
        sink.last(),
        Some((
            STARTED_MESSAGE.to_string(),
            Severity::Success,
            Some(Duration::from_secs(3))
        ))
    );

    manager.stop().await;
    assert!(!manager.is_running());
    // The port is released once stop returns
    std::net::TcpListener::bind(("127.0.0.1", port)).unwrap();
}

#[tokio::test]
async fn test_start_while_running_is_noop() {
    let (mut manager, sink) = manager_with_sink();
    let port = free_port().unwrap();
    let other = free_port().unwrap();

    manager
        .start("127.0.0.1", "127.0.0.1", &port.to_string(), "9000")
        .await
        .unwrap();
    manager
        .start("127.0.0.1", "127.0.0.1", &other.to_string(), "9001")
        .await
        .unwrap();

    match manager.state() {
        LifecycleState::Running { local_addr, target } => {
            assert_eq!(local_addr.port(), port);
            assert_eq!(target.base_url, "http://127.0.0.1:9000/");
        }
        LifecycleState::Stopped => panic!("expected running"),
    }
    assert_eq!(sink.len(), 1);

    manager.stop().await;
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let (mut manager, _) = manager_with_sink();
    manager.stop().await;

    let port = free_port().unwrap();
    manager
        .start("127.0.0.1", "127.0.0.1", &port.to_string(), "9000")
        .await
        .unwrap();
    manager.stop().await;
    manager.stop().await;
    assert!(!manager.is_running());

    // And it can be started again afterwards
    manager
        .start("127.0.0.1", "127.0.0.1", &port.to_string(), "9000")
        .await
        .unwrap();
    assert!(manager.is_running());
    manager.stop().await;
}

#[tokio::test]
async fn test_port_collision_reports_failure() {
    let (mut manager, sink) = manager_with_sink();
    let port = free_port().unwrap();
    let _occupant = std::net::TcpListener::bind(("127.0.0.1", port)).unwrap();

    let result = manager
        .start("127.0.0.1", "127.0.0.1", &port.to_string(), "9000")
        .await;

    assert!(matches!(
        result,
        Err(RoundtripError::Listener(ListenerError::PortInUse { port: p })) if p == port
    ));
    assert!(!manager.is_running());
    let (message, severity, dismiss) = sink.last().unwrap();
    assert_eq!(message, format!("Failed to start server: Port {port} is already in use"));
    assert_eq!(severity, Severity::Error);
    assert_eq!(dismiss, None);
}

#[tokio::test]
async fn test_send_while_stopped() {
    let (manager, sink) = manager_with_sink();

    let report = manager.send_message("hello", "").await;

    assert!(!report.success);
    assert_eq!(report.response, NOT_RUNNING_MESSAGE);
    assert_eq!(
        sink.last(),
        Some((NOT_RUNNING_MESSAGE.to_string(), Severity::Info, None))
    );
}

#[tokio::test]
async fn test_send_to_self() {
    let received = Arc::new(Mutex::new(Vec::<String>::new()));
    let lines = received.clone();
    let notifier = Arc::new(move |line: &str| lines.lock().unwrap().push(line.to_string()));
    let (mut manager, sink) = manager_notifying(notifier);

    let port = free_port().unwrap().to_string();
    manager
        .start("127.0.0.1", "127.0.0.1", &port, &port)
        .await
        .unwrap();

    let report = manager
        .send_message("hello over loopback", "X-Test: 1\nContent-Type: text/plain")
        .await;

    assert!(report.success, "{}", report.response);
    assert!(report.response.ends_with("] Received: hello over loopback"));
    let received = received.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    assert!(received[0].ends_with("] Received POST request."));
    // The start message, then the two clears from the successful send
    assert_eq!(sink.len(), 3);
    assert_eq!(sink.last(), Some((String::new(), Severity::Info, None)));

    manager.stop().await;
}

#[tokio::test]
async fn test_send_after_stop_reports_unreachable() {
    let (mut manager, _) = manager_with_sink();
    let port = free_port().unwrap().to_string();
    manager
        .start("127.0.0.1", "127.0.0.1", &port, &port)
        .await
        .unwrap();
    manager.stop().await;

    // Stopped again, so the manager refuses before touching the network
    let report = manager.send_message("x", "").await;
    assert_eq!(report.response, NOT_RUNNING_MESSAGE);

    let direct = manager.client().send_request("x", "").await;
    assert!(matches!(direct, Err(ClientError::Unreachable(_))), "got {direct:?}");
}

#[test]
fn test_client_target_validation() {
    assert_eq!(
        validate_client_target(" example.test ", "443"),
        Ok(("example.test".to_string(), 443))
    );
    assert_eq!(
        validate_client_target("", "443"),
        Err(ValidationError::EmptyClientAddress)
    );
    assert_eq!(
        validate_client_target("localhost", "http"),
        Err(ValidationError::InvalidClientPort)
    );
    assert_eq!(
        validate_client_target("localhost", "-1"),
        Err(ValidationError::ClientPortOutOfRange(-1))
    );
}
