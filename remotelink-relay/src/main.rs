use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use remotelink_core::RemoteId;
use remotelink_relay::{
    CommandTransport, Config, DocumentStore, HttpTransport, MemoryDocumentStore, MockTransport,
    Poller, Relay, SqliteDocumentStore, StorageConfig, TransportConfig, api,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "remotelink-relay")]
#[command(about = "Remotelink command relay")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "remotelink.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tracing=info,remotelink_relay=info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        info!(path = ?cli.config, "Loading configuration");
        Config::load(&cli.config)?
    } else {
        info!("No configuration file found, using defaults");
        Config::default()
    };

    info!(http_addr = %config.server.http_addr, "Starting remotelink-relay");

    match config.storage {
        StorageConfig::Memory => {
            info!("Using in-memory storage");
            let store = MemoryDocumentStore::new();
            with_transport(config, store).await?;
        }
        StorageConfig::Sqlite { ref path } => {
            info!(path = ?path, "Using SQLite storage");
            let store = SqliteDocumentStore::new(path.to_string_lossy()).await?;
            with_transport(config, store).await?;
        }
    }

    Ok(())
}

async fn with_transport<S: DocumentStore>(config: Config, store: S) -> color_eyre::Result<()> {
    match &config.transport {
        TransportConfig::Mock { offline } => {
            info!(offline = offline.len(), "Using mock transport");
            let transport =
                MockTransport::with_offline(offline.iter().map(|id| RemoteId::from(id.as_str())));
            run_relay(config, store, transport).await
        }
        TransportConfig::Http {
            endpoint,
            device_path,
            token,
        } => {
            info!(%endpoint, %device_path, "Using HTTP transport");
            let transport = HttpTransport::new(endpoint, device_path).with_token(token.clone());
            run_relay(config, store, transport).await
        }
    }
}

async fn run_relay<S, T>(config: Config, store: S, transport: T) -> color_eyre::Result<()>
where
    S: DocumentStore,
    T: CommandTransport,
{
    let cancel = CancellationToken::new();
    let liveness = config.telemetry.liveness;

    let poller_handle = if config.poller.enabled {
        let poller = Poller::new(store.clone(), transport.clone(), liveness);
        let interval = Duration::from_secs(config.poller.interval_secs);
        let cancel_for_poller = cancel.clone();
        Some(tokio::spawn(async move {
            poller.run(interval, cancel_for_poller).await;
        }))
    } else {
        info!("Poller disabled");
        None
    };

    let relay = Arc::new(Relay::new(store, transport, liveness));
    let app = api::router(relay);

    let http_addr = config.server.http_addr;
    let listener = TcpListener::bind(http_addr).await?;
    info!(%http_addr, "HTTP server listening");

    let cancel_for_http = cancel.clone();

    tokio::select! {
        result = axum::serve(listener, app).with_graceful_shutdown(async move {
            cancel_for_http.cancelled().await;
        }) => {
            if let Err(e) = result {
                error!(error = ?e, "HTTP server error");
            }
            info!("HTTP server shut down");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            cancel.cancel();
        }
    }

    if let Some(handle) = poller_handle
        && let Err(e) = handle.await
    {
        error!(error = ?e, "poller task failed");
    }

    info!("remotelink-relay shut down complete");
    Ok(())
}
