use anyhow::{Context, Result};
use depot::api::{create_router, AppState};
use depot::assistant::{Assistant, GeminiAssistant};
use depot::config::{self, DepotConfig};
use depot::coordinator::{ActionJournal, Coordinator};
use depot::demo;
use depot::snapshot::{FileSnapshotStore, SnapshotStore};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "depot=info".into()),
        )
        .init();

    info!("Depot starting...");

    let config = config::load_from_env().context("Failed to load configuration")?;
    info!(
        bind = %config.server.bind_addr(),
        warehouse = %config.warehouse.name,
        snapshots = %config.snapshot.directory.display(),
        "Configuration loaded"
    );

    let coordinator = Arc::new(build_coordinator(&config)?);
    let assistant = build_assistant(&config)?;

    let app = create_router(AppState {
        coordinator: Arc::clone(&coordinator),
        assistant,
    });
    let listener = tokio::net::TcpListener::bind(config.server.bind_addr())
        .await
        .context("Failed to bind API address")?;
    info!(addr = %config.server.bind_addr(), "Depot API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    info!(revision = coordinator.revision(), "Depot stopped");
    Ok(())
}

fn build_coordinator(config: &DepotConfig) -> Result<Coordinator> {
    let mut coordinator = Coordinator::new(config.warehouse.name.clone());

    if config.journal.enabled {
        let journal = ActionJournal::with_mirror(&config.journal.path)?;
        info!(path = %config.journal.path.display(), "Action journal mirrored to file");
        coordinator = coordinator.with_journal(journal);
    }

    let mut recovered = false;
    if config.snapshot.enabled {
        let store: Arc<dyn SnapshotStore> =
            Arc::new(FileSnapshotStore::new(config.snapshot.clone())?);
        if config.snapshot.recover_on_start {
            if let Some(snapshot) = store.load_latest()? {
                coordinator
                    .restore(snapshot)
                    .context("Failed to restore snapshot")?;
                recovered = true;
            }
        }
        coordinator = coordinator.with_store(store);
    }

    if !recovered && config.warehouse.seed_demo {
        demo::seed(&coordinator).context("Failed to seed demo data")?;
    }

    let state = coordinator.state();
    info!(
        inventory_items = state.inventory.len(),
        agvs = state.agvs.len(),
        active_orders = state.orders.len(),
        recovered,
        "Warehouse ready"
    );
    Ok(coordinator)
}

fn build_assistant(config: &DepotConfig) -> Result<Option<Arc<dyn Assistant>>> {
    if !config.assistant.is_configured() {
        warn!("No assistant API key configured; /ask-agent is disabled");
        return Ok(None);
    }

    let assistant = GeminiAssistant::new(config.assistant.clone())
        .context("Failed to initialize Gemini assistant")?;
    info!(model = %assistant.model(), "Gemini assistant initialized");
    Ok(Some(Arc::new(assistant)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl_c signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
