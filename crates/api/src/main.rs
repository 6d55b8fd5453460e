use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cutline_core::memory::InMemoryStore;
use cutline_core::scene::Scene;
use cutline_core::service::TimelineService;
use cutline_core::store::TimelineStore;
use cutline_db::PgTimelineStore;
use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cutline_api::config::{ServerConfig, StoreBackend};
use cutline_api::router::build_app_router;
use cutline_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cutline_api=debug,cutline_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        store = %config.store,
        orphan_policy = %config.orphan_policy,
        "Loaded server configuration"
    );

    // --- Store ---
    let store: Arc<dyn TimelineStore> = match config.store {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL must be set when TIMELINE_STORE=postgres");

            let pool = cutline_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            cutline_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            cutline_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgTimelineStore::new(pool))
        }
        StoreBackend::Memory => {
            let store = InMemoryStore::new();
            if let Some(path) = &config.seed_path {
                let raw = std::fs::read_to_string(path)
                    .unwrap_or_else(|e| panic!("Failed to read TIMELINE_SEED '{path}': {e}"));
                let scenes: Vec<Scene> = serde_json::from_str(&raw)
                    .unwrap_or_else(|e| panic!("TIMELINE_SEED '{path}' is not a scene list: {e}"));
                let count = scenes.len();
                for scene in scenes {
                    store.upsert_scene(scene).await;
                }
                tracing::info!(path = %path, scenes = count, "Seeded in-memory store");
            }
            tracing::warn!("Using in-memory store; placements are lost on restart");
            Arc::new(store)
        }
    };

    // --- App state ---
    let service = TimelineService::new(store, config.orphan_policy);
    let state = AppState {
        service: Arc::new(service),
        config: Arc::new(config.clone()),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let stop = Arc::new(Notify::new());
    let server = {
        let stop = Arc::clone(&stop);
        tokio::spawn(
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.notified().await })
                .into_future(),
        )
    };

    shutdown_signal().await;
    stop.notify_one();

    // --- Drain ---
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    match tokio::time::timeout(drain, server).await {
        Ok(Ok(Ok(()))) => tracing::info!("Graceful shutdown complete"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "Server error"),
        Ok(Err(e)) => tracing::error!(error = %e, "Server task failed"),
        Err(_) => tracing::warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "In-flight requests did not drain before the shutdown timeout"
        ),
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
