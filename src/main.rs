use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use roundtrip::client::{ClientConfig, MessageDispatcher, OutboundClient, SendReport};
use roundtrip::feedback::{MessageSink, Severity, TracingSink};
use roundtrip::lifecycle::{ServerLifecycleManager, validate_client_target};
use roundtrip::listener::{ChannelNotifier, ListenerConfig, RequestListener};
use roundtrip::settings::{
    CLIENT_ADDRESS, CLIENT_PORT, DEFAULT_SETTINGS_FILE, SERVER_ADDRESS, SERVER_PORT, SettingsStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "roundtrip", version)]
#[command(
    about = "Local HTTP listener and paired client for manual round-trip testing",
    long_about = None
)]
struct Cli {
    /// Settings file supplying defaults for addresses and ports
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the listener; each stdin line is sent to the client target
    Listen(ListenArgs),
    /// Send a single message to the client target
    Send(SendArgs),
    /// Show or edit the settings file
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Args)]
struct ListenArgs {
    #[arg(long)]
    server_address: Option<String>,
    #[arg(long)]
    server_port: Option<String>,
    #[arg(long)]
    client_address: Option<String>,
    #[arg(long)]
    client_port: Option<String>,
    /// Echo `application/json` bodies as a JSON document
    #[arg(long)]
    json_echo: bool,
    /// Header line sent with every message, e.g. -H "X-Test: 1"
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
}

#[derive(Args)]
struct SendArgs {
    #[arg(long)]
    body: String,
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    port: Option<String>,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print every item
    Show,
    /// Change one item, e.g. set "Server Inbound Port" 9090
    Set { label: String, value: String },
    /// Restore the defaults
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Logs go to stderr; stdout carries notifications and responses
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roundtrip=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let sink: Arc<dyn MessageSink> = Arc::new(TracingSink);
    let store = load_settings(&cli.settings, sink.as_ref());

    match cli.command {
        Commands::Listen(args) => listen(args, &store, sink).await,
        Commands::Send(args) => send(args, &store, sink).await,
        Commands::Settings { action } => edit_settings(action, store, sink.as_ref()),
    }
}

fn load_settings(path: &Path, sink: &dyn MessageSink) -> SettingsStore {
    match SettingsStore::load(path) {
        Ok(store) => store,
        Err(e) => {
            sink.show(&format!("Failed to load settings: {e}"), Severity::Error, None);
            SettingsStore::new(path)
        }
    }
}

async fn listen(args: ListenArgs, store: &SettingsStore, sink: Arc<dyn MessageSink>) -> Result<()> {
    let or_stored = |value: Option<String>, label: &str| {
        value.unwrap_or_else(|| store.value(label).to_string())
    };
    let server_address = or_stored(args.server_address, SERVER_ADDRESS);
    let server_port = or_stored(args.server_port, SERVER_PORT);
    let client_address = or_stored(args.client_address, CLIENT_ADDRESS);
    let client_port = or_stored(args.client_port, CLIENT_PORT);

    let config = ListenerConfig {
        json_echo: args.json_echo,
        server_name: Some(concat!("roundtrip/", env!("CARGO_PKG_VERSION")).to_string()),
        ..ListenerConfig::default()
    };
    let (notify_tx, mut notifications) = mpsc::unbounded_channel();
    let listener = RequestListener::new(config, Arc::new(ChannelNotifier::new(notify_tx)));
    let client =
        OutboundClient::new(ClientConfig::default()).wrap_err("Failed to build HTTP client")?;
    let mut manager = ServerLifecycleManager::new(listener, client, sink.clone());

    manager
        .start(&server_address, &client_address, &server_port, &client_port)
        .await
        .wrap_err("Failed to start server")?;

    let headers = args.headers.join("\n");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Received Ctrl-C, shutting down");
                break;
            }
            Some(line) = notifications.recv() => println!("{line}"),
            line = lines.next_line() => {
                let Some(body) = line.wrap_err("Failed to read stdin")? else {
                    info!("Input closed, shutting down");
                    break;
                };
                let report = manager.send_message(&body, &headers).await;
                report_send(&report, sink.as_ref());
            }
        }
    }

    manager.stop().await;
    // Drain what arrived before the listener stopped
    while let Ok(line) = notifications.try_recv() {
        println!("{line}");
    }
    Ok(())
}

async fn send(args: SendArgs, store: &SettingsStore, sink: Arc<dyn MessageSink>) -> Result<()> {
    let address = args.address.unwrap_or_else(|| store.value(CLIENT_ADDRESS).to_string());
    let port = args.port.unwrap_or_else(|| store.value(CLIENT_PORT).to_string());
    let (address, port) = validate_client_target(&address, &port)?;

    let mut client =
        OutboundClient::new(ClientConfig::default()).wrap_err("Failed to build HTTP client")?;
    client.configure(&address, port);

    let report = MessageDispatcher::new(sink.clone())
        .send_message(&client, &args.body, &args.headers.join("\n"))
        .await;
    report_send(&report, sink.as_ref());

    if report.success {
        Ok(())
    } else {
        Err(color_eyre::eyre::eyre!(report.response))
    }
}

fn report_send(report: &SendReport, sink: &dyn MessageSink) {
    if report.success {
        println!("{}", report.response);
        let dismiss = Some(Duration::from_secs(3));
        sink.show("Message sent successfully", Severity::Success, dismiss);
    } else {
        sink.show(
            &format!("Failed to send message: {}", report.response),
            Severity::Error,
            Some(Duration::from_secs(5)),
        );
    }
}

fn edit_settings(
    action: SettingsAction,
    mut store: SettingsStore,
    sink: &dyn MessageSink,
) -> Result<()> {
    match action {
        SettingsAction::Show => {
            for item in store.items() {
                println!("{}: {} ({}, {})", item.label, item.text, item.x, item.y);
            }
            return Ok(());
        }
        SettingsAction::Set { label, value } => store.set_value(&label, &value)?,
        SettingsAction::Reset => store.reset(),
    }

    match store.save() {
        Ok(()) => {
            let dismiss = Some(Duration::from_secs(3));
            sink.show("Settings saved successfully!", Severity::Success, dismiss);
            Ok(())
        }
        Err(e) => {
            sink.show(&format!("Failed to save settings: {e}"), Severity::Error, None);
            Err(e).wrap_err_with(|| format!("Failed to write {}", store.path().display()))
        }
    }
}
