//! Worklane Tenancy Core - service entry point

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use worklane_tenancy::{
    config::{LogFormat, LogTarget},
    create_router, db,
    services::ScopedBroadcaster,
    AppConfig, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (before logging, so we know the log format)
    let config = AppConfig::load().context("Failed to load configuration")?;

    // The guard must be kept alive for the duration of the program to
    // ensure log messages are flushed to files
    let _log_guard = init_logging(&config);

    info!("Worklane tenancy core starting up");

    let db = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database")?;

    let state = AppState {
        config: config.clone(),
        db,
        broadcast: Arc::new(ScopedBroadcaster::new()),
    };

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address configuration")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.target {
        LogTarget::Console => {
            let registry = tracing_subscriber::registry().with(env_filter);
            match config.logging.format {
                LogFormat::Json => {
                    registry.with(tracing_subscriber::fmt::layer().json()).init()
                }
                LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
            }
            None
        }
        LogTarget::File => {
            let appender =
                tracing_appender::rolling::daily(&config.logging.log_dir, "worklane-tenancy.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let registry = tracing_subscriber::registry().with(env_filter);
            match config.logging.format {
                LogFormat::Json => registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(writer)
                            .with_ansi(false),
                    )
                    .init(),
                LogFormat::Pretty => registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_writer(writer)
                            .with_ansi(false),
                    )
                    .init(),
            }
            Some(guard)
        }
    }
}
