//! EventSync Server
//!
//! Collects webhook events from several sources and publishes one aggregate
//! once every source has reported within the observation window.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::{Parser, ValueEnum};
use config::runtime::{ServerSettings, admin_config, publish_retry};
use config::{ConfigLoader, get_database_url, pubsub_endpoint};
use eventsync_core::processors::{
    EventIngestor, PublishCoordinator, RetryPolicy, TriggerProcessing,
};
use eventsync_core::sink::{SinkSettings, build_sink};
use eventsync_core::store::{EventStore, MemoryEventStore, PgEventStore};
use server::{build_router, run_server};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreBackend {
    Postgres,
    Memory,
}

/// EventSync - webhook event aggregation and trigger engine
#[derive(Parser, Debug)]
#[command(name = "eventsync-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the service description (JSON, or TOML with a .toml extension)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Inline JSON service description, used when no --config is given
    #[arg(long, env = "EVENTSYNC_CONFIG", hide_env_values = true)]
    config_json: Option<String>,

    /// The address and port to listen on
    #[arg(short, long, env = "EVENTSYNC_LISTEN", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Event store backend
    #[arg(long, env = "EVENTSYNC_STORE", value_enum, default_value = "postgres")]
    store: StoreBackend,

    /// PostgreSQL connection string, required by the postgres store
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,

    /// Run trigger cycles in the background instead of within the ingestion request
    #[arg(long, env = "EVENTSYNC_ASYNC_TRIGGER")]
    async_trigger: bool,

    /// Deadline of one trigger cycle, in seconds
    #[arg(long, env = "EVENTSYNC_TRIGGER_TIMEOUT", default_value = "30")]
    trigger_timeout: u64,

    /// Publish attempts per aggregate, the first one included
    #[arg(long, env = "EVENTSYNC_PUBLISH_ATTEMPTS", default_value = "3")]
    publish_attempts: u32,

    /// Pub/Sub emulator host, e.g. localhost:8085
    #[arg(long, env = "PUBSUB_EMULATOR_HOST")]
    pubsub_emulator_host: Option<String>,

    /// Pub/Sub REST endpoint
    #[arg(long, env = "PUBSUB_ENDPOINT")]
    pubsub_endpoint: Option<String>,

    /// Bearer token sent to Pub/Sub
    #[arg(long, env = "PUBSUB_ACCESS_TOKEN", hide_env_values = true)]
    pubsub_access_token: Option<String>,

    /// Admin secret, plaintext or argon2 hash. Admin endpoints are open without it
    #[arg(long, env = "EVENTSYNC_ADMIN_SECRET", hide_env_values = true)]
    admin_secret: Option<String>,

    /// Answer cross-origin requests from any origin
    #[arg(long, env = "EVENTSYNC_DISABLE_CORS")]
    disable_cors: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting eventsync-server v{}", env!("CARGO_PKG_VERSION"));

    // Load the service description
    let config_loader = ConfigLoader::from_args(args.config.clone(), args.config_json.clone())?;
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load the service description: {}", e);
        e
    })?;
    for line in loaded_config.report.lines() {
        tracing::info!("{}", line);
    }
    tracing::info!(
        "Service description loaded from {}",
        config_loader.source().describe()
    );
    let service = loaded_config.service;

    let settings = resolve_settings(&args)?;

    // Create the event store
    let (store, db_pool): (Arc<dyn EventStore>, Option<PgPool>) = match args.store {
        StoreBackend::Postgres => {
            let pool = connect_database(args.database_url.clone(), args.migrate).await?;
            let store = PgEventStore::new(pool.clone(), service.service_name.clone());
            (Arc::new(store), Some(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory event store, events are lost on restart");
            (Arc::new(MemoryEventStore::new()), None)
        }
    };

    let sink = build_sink(&service.sink, &settings.sink)?;
    tracing::info!("Publishing aggregates to {}", sink.describe());

    let coordinator = Arc::new(
        PublishCoordinator::new(service, store, sink)
            .with_retry(settings.publish_retry, RetryPolicy::default()),
    );

    let shutdown = CancellationToken::new();
    let ingestor = Arc::new(
        EventIngestor::new(coordinator.clone(), settings.processing, shutdown.clone())
            .with_background_timeout(settings.trigger_timeout),
    );

    // Create application state
    let state = AppState::new(
        coordinator,
        ingestor.clone(),
        settings.admin.clone(),
        settings.trigger_timeout,
    );

    // Build the router
    let router = build_router(state, settings.permissive_cors);

    // Run the server
    tracing::info!("Starting HTTP server on {}", settings.listen);
    let result = run_server(router, settings.listen).await;

    // Let background cycles finish, cancel the stragglers
    if tokio::time::timeout(settings.trigger_timeout, ingestor.shutdown())
        .await
        .is_err()
    {
        tracing::warn!("Background trigger cycles still running, cancelling them");
        shutdown.cancel();
        ingestor.shutdown().await;
    }

    // Close database connections gracefully
    if let Some(pool) = db_pool {
        tracing::info!("Closing database connections...");
        pool.close().await;
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

fn resolve_settings(args: &Args) -> anyhow::Result<ServerSettings> {
    let trigger_timeout = Duration::from_secs(args.trigger_timeout.max(1));
    let processing = if args.async_trigger {
        TriggerProcessing::Async
    } else {
        TriggerProcessing::Sync
    };

    Ok(ServerSettings {
        listen: args.listen,
        processing,
        trigger_timeout,
        publish_retry: publish_retry(args.publish_attempts),
        sink: SinkSettings {
            pubsub_endpoint: pubsub_endpoint(
                args.pubsub_emulator_host.as_deref(),
                args.pubsub_endpoint.as_deref(),
            )?,
            pubsub_access_token: args.pubsub_access_token.clone(),
            request_timeout: trigger_timeout,
        },
        admin: admin_config(args.admin_secret.as_deref())?,
        permissive_cors: args.disable_cors,
    })
}

async fn connect_database(database_url: Option<String>, migrate: bool) -> anyhow::Result<PgPool> {
    let database_url = get_database_url(database_url).map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    // Run migrations if requested
    if migrate {
        tracing::info!("Running database migrations...");
        eventsync_core::MIGRATOR.run(&db_pool).await.map_err(|e| {
            tracing::error!("Failed to run migrations: {}", e);
            e
        })?;
        tracing::info!("Migrations completed successfully");
    }

    Ok(db_pool)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
