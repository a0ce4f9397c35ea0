use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::info;

use super::{
    services::{
        add_file, create_task, download_archive, get_task, health, list_tasks, release_task,
        start_all,
    },
    state::AppState,
};
use crate::config::Config;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All routes of the service
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/tasks", post(create_task).get(list_tasks))
        .route("/tasks/start-all", post(start_all))
        .route("/tasks/{task_id}", get(get_task))
        .route("/tasks/{task_id}/files", post(add_file))
        .route("/tasks/{task_id}/start", post(release_task))
        .route("/download/{task_id}", get(download_archive))
        .route("/health", get(health))
        .with_state(state)
        // Handles Content-Encoding: gzip request bodies transparently
        .layer(RequestDecompressionLayer::new())
}

pub async fn run(config: Config) -> Result<(), AnyError> {
    let address = config.server.bind_addr;
    let autostart = config.scheduler.autostart;

    let state = AppState::new(config)?;
    let scheduler = state.scheduler.clone();

    if autostart {
        scheduler.start();
    } else {
        info!("Scheduler idle until POST /tasks/start-all");
    }

    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "zipbox API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
