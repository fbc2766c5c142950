#![warn(clippy::all)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

mod config;
mod database;
mod monitoring;
mod notify;
mod pool;
mod retention;

use config::Config;
use database::{LibsqlStore, StatusStore};
use monitoring::Monitor;
use monitoring::checker::HttpProber;
use notify::WebhookNotifier;
use pool::{LibsqlManager, LibsqlPool};
use retention::{RetentionCleanup, RetentionPolicy};

#[derive(Debug, Parser)]
#[command(name = "webmon", version, about = "Periodic web site monitoring daemon")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "/etc/webmon/config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?;

    logger::init_tracing(&config.global.log_level);

    let store = open_store(&config).await?;
    info!("Database initialized at {}", config.global.db_path.display());

    let prober = Arc::new(HttpProber::new(config.global.timeout_seconds)?);
    let notifier = Arc::new(WebhookNotifier::new(&config.alerts)?);

    let cleanup = RetentionCleanup::new(
        Arc::clone(&store),
        RetentionPolicy { check_log_days: config.global.retention_days },
    );
    let cleanup_task = cleanup.start_periodic_cleanup();

    let shutdown = Arc::new(AtomicBool::new(false));
    spawn_signal_listener(Arc::clone(&shutdown))?;

    let mut monitor = Monitor::new(&config, store, prober, notifier);
    monitor.run(shutdown).await;

    cleanup_task.abort();
    Ok(())
}

async fn open_store(config: &Config) -> Result<Arc<dyn StatusStore>> {
    if let Some(parent) = config.global.db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let db = libsql::Builder::new_local(&config.global.db_path).build().await?;
    let pool: LibsqlPool = deadpool::managed::Pool::builder(LibsqlManager::new(db)).build()?;

    let conn = pool.get().await?;
    database::initialize_database(&conn).await?;
    drop(conn);

    Ok(Arc::new(LibsqlStore::new_from_pool(pool)))
}

#[cfg(unix)]
fn spawn_signal_listener(shutdown: Arc<AtomicBool>) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
        info!("Stop requested");
        shutdown.store(true, Ordering::SeqCst);
    });
    Ok(())
}

#[cfg(not(unix))]
fn spawn_signal_listener(shutdown: Arc<AtomicBool>) -> Result<()> {
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Stop requested");
        shutdown.store(true, Ordering::SeqCst);
    });
    Ok(())
}
