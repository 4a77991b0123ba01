use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use request_workflow::api;
use request_workflow::app_state::AppState;
use request_workflow::config::Config;
use request_workflow::db::memory::MemoryStore;
use request_workflow::db::pool::get_db_pool;
use request_workflow::db::postgres::PgStore;

/// Stdout logging, plus a daily rolling file when `LOG_DIR` is set.
fn init_tracing(config: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    let Some(log_dir) = &config.log_dir else {
        tracing_subscriber::registry().with(filter).with(stdout_layer).init();
        return Ok(None);
    };

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "request_workflow.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();
    Ok(Some(guard))
}

async fn shutdown_signal(pg: Option<PgStore>) {
    if let Err(e) = signal::ctrl_c().await {
        warn!("failed to listen for Ctrl+C: {e}");
    }
    info!("Received Ctrl+C, shutting down...");
    if let Some(pg) = pg {
        info!("Closing database pool...");
        pg.close().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let _log_guard = init_tracing(&config)?;

    let pool = get_db_pool(&config)
        .await
        .context("failed to connect to the database")?;

    let (state, pg) = match pool {
        Some(pool) => {
            let pg = PgStore::new(pool);
            if config.run_migrations {
                pg.migrate().await.context("failed to run migrations")?;
                info!("database migrations applied");
            }
            let store = Arc::new(pg.clone());
            (AppState::new(config, store.clone(), store), Some(pg))
        }
        None => {
            warn!("DATABASE_URL not set; requests are kept in memory and lost on exit");
            let store = Arc::new(MemoryStore::new());
            (AppState::new(config, store.clone(), store), None)
        }
    };

    let addr = state.config.bind_addr;
    let app = api::router(state);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(pg))
        .await
        .context("server encountered an error")?;

    info!("Shutdown complete.");
    Ok(())
}
