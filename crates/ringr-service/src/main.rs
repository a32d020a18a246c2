//! Ringr - Entry point.

use channel_client::{HttpChannelClient, MemoryChannel, NotificationChannel};
use endpoint_store::{MemoryRecordStore, RecordStore};
use ringr_service::{
    api::{create_router_with_rate_limit, AppState, RateLimitState},
    config::Config,
    sweeper::spawn_sweeper,
    worker::spawn_worker,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Table used for the in-process store when none is configured.
const FALLBACK_TABLE: &str = "ringr";

#[tokio::main]
async fn main() {
    // Load configuration
    let (config, load_error) = match Config::load() {
        Ok(c) => (c, None),
        Err(e) => (Config::default(), Some(e)),
    };

    init_logging(&config.log.level);

    info!("Starting Ringr");

    if let Some(e) = load_error {
        error!("Failed to load configuration, using defaults: {:#}", e);
    }
    let missing = config.ringr.missing();
    if !missing.is_empty() {
        warn!(
            "Missing configuration: {}. Affected requests will fail with 500",
            missing.join(", ")
        );
    }

    // Initialize channel
    let channel: Arc<dyn NotificationChannel> = match &config.channel.api_url {
        Some(url) => match HttpChannelClient::new(url, config.channel.timeout) {
            Ok(client) => {
                if client.health_check().await {
                    info!("Channel gateway healthy at {}", url);
                } else {
                    warn!("Channel gateway not reachable at {} - will retry on requests", url);
                }
                Arc::new(client)
            }
            Err(e) => {
                error!("Failed to create channel client: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            info!("No channel gateway configured, using in-process channel");
            Arc::new(MemoryChannel::new())
        }
    };

    // Initialize storage
    let table = config
        .ringr
        .table_name
        .clone()
        .unwrap_or_else(|| FALLBACK_TABLE.to_string());
    let store = MemoryRecordStore::with_table(&table);

    // Create application state
    let ringr_config = Arc::new(config.ringr.clone());
    let state = AppState::new(
        channel,
        Arc::new(store.clone()) as Arc<dyn RecordStore>,
        ringr_config,
    );

    // Background tasks
    let _worker = spawn_worker(state.reconciler.clone(), table, store.changes());
    let _sweeper = spawn_sweeper(store, config.sweeper.interval);

    // Create rate limiter from config
    let rate_limit = RateLimitState::new(config.rate_limit.global_per_minute);

    // Create router with rate limiting
    let app = create_router_with_rate_limit(state, rate_limit);

    // Bind to address
    let addr = SocketAddr::new(
        config
            .server
            .listen_addr
            .parse()
            .unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    );

    info!("Listening on {}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Run server
    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Shutting down...");
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
