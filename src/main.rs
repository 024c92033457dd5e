//! AI Try-On Service
//!
//! Orchestrates virtual try-on jobs: fetches body and garment images from
//! object storage, runs them through a remote try-on model and stores the
//! result image back under the session id.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tryon::api::rest::{create_rest_router, AppState};
use tryon::config::{Config, StorageType};
use tryon::engine::{BackendClient, RemoteBackend, ResultResolver};
use tryon::service::TryOnService;
use tryon::storage::{FsObjectStore, ObjectStore, S3ObjectStore, ScratchSpace};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Starting AI Try-On Service v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = Config::load_or_default(&Config::default_path());
    config.apply_env()?;

    info!("Configuration loaded:");
    info!("  Port: {}", config.server.port);
    info!("  Storage: {:?}", config.storage.storage_type);
    info!("  Backend: {}", config.backend.url);
    info!("  Backend timeout: {}s", config.backend.timeout_secs);

    let scratch = ScratchSpace::new(config.workflow.scratch_dir())?;
    info!("Scratch space at: {}", scratch.dir().display());

    match config.storage.storage_type {
        StorageType::S3 => {
            let store = S3ObjectStore::connect(&config.storage, scratch.clone()).await;
            serve(config, store, scratch).await
        }
        StorageType::Filesystem => {
            let store = FsObjectStore::new(&config.storage.root, config.storage.buckets.clone(), scratch.clone());
            info!("Filesystem object store at: {}", config.storage.root.display());
            serve(config, store, scratch).await
        }
    }
}

async fn serve<S: ObjectStore>(config: Config, store: S, scratch: ScratchSpace) -> Result<()> {
    let store = Arc::new(store);

    if config.storage.create_buckets {
        // Jobs still surface storage errors individually if this fails
        match store.ensure_buckets().await {
            Ok(()) => info!("Buckets ready"),
            Err(e) => warn!("Could not ensure buckets on {}: {}", store.name(), e),
        }
    }

    // Backend connection is established on the first job
    let backend = Arc::new(BackendClient::new(RemoteBackend::new(&config.backend), &config.backend));
    let resolver = ResultResolver::new(scratch, config.backend.result_fetch_timeout());

    let service = Arc::new(TryOnService::new(store, backend, resolver, &config));

    let app_state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
    });

    let router = create_rest_router(app_state, config.server.max_body_bytes);

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("REST API listening on http://{}", addr);
    info!("{} is ready!", config.server.service_name);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received, cleaning up...");
        })
        .await?;

    info!("Goodbye!");
    Ok(())
}
