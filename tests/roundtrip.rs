use color_eyre::eyre::{Result, eyre};
use roundtrip::client::{ClientConfig, ClientError, OutboundClient};
use roundtrip::feedback::Severity;
use roundtrip::lifecycle::{LifecycleState, ServerLifecycleManager};
use roundtrip::listener::{ChannelNotifier, ListenerConfig, RequestListener};
use roundtrip::settings::{CLIENT_ADDRESS, CLIENT_PORT, SERVER_ADDRESS, SERVER_PORT, SettingsStore};
use roundtrip::test_utils::{free_port, start_test_listener};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

type Shown = Arc<Mutex<Vec<(String, Severity)>>>;

fn recording_sink() -> (Shown, impl Fn(&str, Severity, Option<Duration>) + Send + Sync + 'static) {
    let shown: Shown = Arc::default();
    let messages = shown.clone();
    let sink = move |message: &str, severity: Severity, _: Option<Duration>| {
        messages.lock().unwrap().push((message.to_string(), severity));
    };
    (shown, sink)
}

#[tokio::test]
async fn test_full_round_trip_from_settings() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let port = free_port()?.to_string();

    let mut store = SettingsStore::load(dir.path().join("settings.json"))?;
    store.set_value(SERVER_PORT, &port)?;
    store.set_value(CLIENT_PORT, &port)?;
    store.save()?;
    let store = SettingsStore::load(store.path())?;

    let (notify_tx, mut notifications) = mpsc::unbounded_channel();
    let listener = RequestListener::new(
        ListenerConfig::default(),
        Arc::new(ChannelNotifier::new(notify_tx)),
    );
    let client = OutboundClient::new(ClientConfig::default())?;
    let (shown, sink) = recording_sink();
    let mut manager = ServerLifecycleManager::new(listener, client, Arc::new(sink));

    manager
        .start(
            store.value(SERVER_ADDRESS),
            store.value(CLIENT_ADDRESS),
            store.value(SERVER_PORT),
            store.value(CLIENT_PORT),
        )
        .await?;
    assert!(matches!(manager.state(), LifecycleState::Running { .. }));

    for body in ["first", "second"] {
        let report = manager.send_message(body, "X-Run: integration").await;
        assert!(report.success, "{}", report.response);
        assert!(report.response.ends_with(&format!("] Received: {body}")));
    }

    for _ in 0..2 {
        let line = tokio::time::timeout(Duration::from_secs(1), notifications.recv())
            .await?
            .ok_or_else(|| eyre!("notifier closed"))?;
        assert!(line.starts_with('['));
        assert!(line.ends_with("] Received POST request."));
    }

    manager.stop().await;
    assert!(!manager.is_running());

    let report = manager.send_message("after stop", "").await;
    assert!(!report.success);

    let shown = shown.lock().unwrap().clone();
    assert_eq!(
        shown.first(),
        Some(&("Server started successfully!".to_string(), Severity::Success))
    );
    assert_eq!(shown.last().map(|(_, severity)| *severity), Some(Severity::Info));
    Ok(())
}

#[tokio::test]
async fn test_client_against_standalone_listener() -> Result<()> {
    let received = Arc::new(Mutex::new(Vec::new()));
    let log = received.clone();
    let (mut listener, addr) = start_test_listener(
        ListenerConfig::default(),
        Arc::new(move |line: &str| log.lock().unwrap().push(line.to_string())),
    )
    .await?;

    let mut client = OutboundClient::new(ClientConfig::default())?;
    client.configure("127.0.0.1", addr.port());

    let response = client
        .send_request("{\"k\": 1}", "Content-Type: application/json\nX-Case: plain")
        .await?;
    assert!(response.ends_with("] Received: {\"k\": 1}"));
    assert_eq!(received.lock().unwrap().len(), 1);

    listener.stop().await;
    let after = client.send_request("late", "").await;
    assert!(matches!(after, Err(ClientError::Unreachable(_))), "got {after:?}");
    Ok(())
}
