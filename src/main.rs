//! tracker-graphql - issue tracker GraphQL API.
//!
//! # Usage
//!
//! ```bash
//! # In-memory store, playground on http://localhost:4000
//! tracker-graphql
//!
//! # MongoDB store
//! STORE=mongo MONGO_URI=mongodb://localhost:27017 JWT_SECRET=s3cret tracker-graphql
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use tracker_graphql::schema::build_schema;
use tracker_graphql::server::{serve_with_shutdown, AppState};
use tracker_graphql::{
    AppConfig, AuthConfig, BoundaryStrategy, PaginationConfig, ServerConfig, StoreBackend, Stores,
};

/// Which record store to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreKind {
    Memory,
    Mongo,
}

/// tracker-graphql CLI.
#[derive(Parser, Debug)]
#[command(name = "tracker-graphql")]
#[command(about = "GraphQL API for a lightweight issue tracker")]
#[command(version)]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// GraphQL server port.
    #[arg(long, env = "PORT", default_value = "4000")]
    port: u16,

    /// Serve the GraphiQL playground.
    #[arg(long, env = "PLAYGROUND", default_value = "true", action = clap::ArgAction::Set)]
    playground: bool,

    /// Record store: memory or mongo.
    #[arg(long, env = "STORE", default_value = "memory", value_parser = parse_store)]
    store: StoreKind,

    /// MongoDB connection string.
    #[arg(long, env = "MONGO_URI", default_value = "mongodb://localhost:27017")]
    mongo_uri: String,

    /// MongoDB database name.
    #[arg(long, env = "MONGO_DB", default_value = "tracker")]
    mongo_db: String,

    /// Token signing secret.
    #[arg(long, env = "JWT_SECRET", default_value = "change-me", hide_env_values = true)]
    jwt_secret: String,

    /// Token lifetime in seconds.
    #[arg(long, env = "TOKEN_TTL_SECS", default_value = "604800")]
    token_ttl_secs: u64,

    /// Page size when `first` is omitted.
    #[arg(long, env = "DEFAULT_FIRST", default_value = "10")]
    default_first: usize,

    /// Largest accepted `first`.
    #[arg(long, env = "MAX_FIRST", default_value = "100")]
    max_first: usize,

    /// How page flags are computed: full-scan or probe.
    #[arg(long, env = "BOUNDARY_STRATEGY", default_value = "full-scan")]
    boundary_strategy: BoundaryStrategy,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// Parse store kind from string.
fn parse_store(s: &str) -> Result<StoreKind, String> {
    match s.to_lowercase().as_str() {
        "memory" => Ok(StoreKind::Memory),
        "mongo" | "mongodb" => Ok(StoreKind::Mongo),
        _ => Err(format!("Invalid store '{}'. Use 'memory' or 'mongo'.", s)),
    }
}

impl Cli {
    fn app_config(&self) -> AppConfig {
        let store = match self.store {
            StoreKind::Memory => StoreBackend::Memory,
            StoreKind::Mongo => StoreBackend::Mongo {
                uri: self.mongo_uri.clone(),
                database: self.mongo_db.clone(),
            },
        };
        AppConfig {
            server: ServerConfig {
                host: self.host.clone(),
                port: self.port,
                enable_playground: self.playground,
            },
            auth: AuthConfig {
                secret: self.jwt_secret.clone(),
                token_ttl: Duration::from_secs(self.token_ttl_secs),
            },
            pagination: PaginationConfig {
                default_first: self.default_first,
                max_first: self.max_first,
                strategy: self.boundary_strategy,
            },
            store,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    let config = cli.app_config();
    config.validate().context("Invalid configuration")?;

    info!("Starting tracker-graphql");
    debug!(?config, "Configuration");
    if config.auth.secret == AuthConfig::default().secret {
        warn!("Using the default JWT secret; set JWT_SECRET in production");
    }

    let stores = connect_stores(&config.store).await?;
    let state = AppState {
        schema: build_schema(stores.clone(), &config),
        stores,
        auth: config.auth.clone(),
    };

    serve_with_shutdown(state, config.server.clone(), shutdown_signal())
        .await
        .context("GraphQL server failed")?;

    info!("Shutdown complete");
    Ok(())
}

async fn connect_stores(backend: &StoreBackend) -> Result<Stores> {
    match backend {
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Ok(Stores::in_memory())
        }
        #[cfg(feature = "mongo")]
        StoreBackend::Mongo { uri, database } => {
            info!(database = %database, "Connecting to MongoDB...");
            let stores = tracker_graphql::store::mongo::connect(uri, database)
                .await
                .context("Failed to connect to MongoDB")?;
            info!("MongoDB ready");
            Ok(stores)
        }
        #[cfg(not(feature = "mongo"))]
        StoreBackend::Mongo { .. } => anyhow::bail!("built without the `mongo` feature"),
    }
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down...");
}
