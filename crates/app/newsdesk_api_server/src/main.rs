//! Newsdesk API server binary.
//!
//! Reads configuration from the environment (and `.env`), runs migrations,
//! then serves the REST API until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use newsdesk_api::config::ApiConfig;
use newsdesk_api::{AppState, router};
use newsdesk_core::store::{MemoryStore, PgStore, Store};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// CLI arguments. Flags override the matching environment variables.
#[derive(Parser, Debug)]
#[command(name = "newsdesk_api_server", about = "Newsdesk API server")]
struct Args {
    /// Address to listen on, e.g. `0.0.0.0:3000`.
    #[arg(long, env = "BIND_ADDR")]
    bind: Option<String>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep all records in memory instead of PostgreSQL. Data is lost on exit.
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,newsdesk_api=debug,newsdesk_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(url) = args.database_url {
        config.pg_connection_url = url;
    }
    info!(?config, in_memory = args.in_memory, "starting newsdesk_api_server");

    let store: Arc<dyn Store> = if args.in_memory {
        warn!("using the in-memory store; records will not survive a restart");
        Arc::new(MemoryStore::new())
    } else {
        info!(
            max_connections = args.max_connections,
            "configuring connection pool"
        );
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.pg_connection_url)
            .await?;

        info!("running database migrations");
        newsdesk_api::migrate(&pool).await?;
        Arc::new(PgStore::new(pool))
    };

    let state = AppState::new(store, config.clone())?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
