use anyhow::{Context, Result};
use clap::Parser;
use invsync::{
    ActorDirectory, InMemoryRecordStore, LeaseStore, LockConfig, LockService, SystemClock,
    storage::{load_leases, save_leases},
    web::{AppState, Seed, build_router},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "invsync", about = "Lease-based edit locks for shared inventory records")]
struct ServerArgs {
    /// Interface to bind
    #[arg(long, env = "INVSYNC_HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, short, env = "INVSYNC_PORT", default_value_t = 8080)]
    port: u16,

    /// JSON file with the known actors and records
    #[arg(long, env = "INVSYNC_SEED")]
    seed: Option<PathBuf>,

    /// Lease table file, loaded on start and written on shutdown
    #[arg(long, env = "INVSYNC_STATE_FILE")]
    state_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = ServerArgs::parse();
    let config = LockConfig::from_env().context("failed to read lock configuration")?;

    let directory = Arc::new(ActorDirectory::new());
    let records = Arc::new(InMemoryRecordStore::new());
    if let Some(path) = &args.seed {
        let seed = Seed::load(path)
            .await
            .with_context(|| format!("failed to load seed {}", path.display()))?;
        seed.install(&directory, &records).await;
    }

    let leases = Arc::new(LeaseStore::new());
    if let Some(path) = &args.state_file {
        let restored = load_leases(&leases, path)
            .await
            .with_context(|| format!("failed to load lease table {}", path.display()))?;
        info!(restored, path = %path.display(), "lease table loaded");
    }

    let service = LockService::new(
        Arc::clone(&leases),
        records,
        directory,
        Arc::new(SystemClock),
        config,
    )
    .context("invalid lock configuration")?;

    let app = build_router(AppState::new(Arc::new(service)));
    let bind_addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!(bind_addr = %bind_addr, "invsync lock service started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(path) = &args.state_file {
        let saved = save_leases(&leases, path)
            .await
            .with_context(|| format!("failed to save lease table {}", path.display()))?;
        info!(saved, path = %path.display(), "lease table saved");
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("invsync=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
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

    warn!("shutdown signal received");
}
