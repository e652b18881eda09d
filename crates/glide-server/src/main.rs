//! Glide Server - route planning front end for the external thermal planner

use anyhow::Result;
use glide_server::{api, config::Config, loops, state::AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("glide_server=debug".parse()?))
        .init();

    tracing::info!("Starting Glide Server...");

    let config = Config::from_env();
    let port = config.server_port;
    tracing::info!(
        "Planner: {} {} (timeout {:?}, max {} concurrent), artifacts in {}",
        config.planner_program,
        config
            .planner_script
            .as_ref()
            .map(|script| script.display().to_string())
            .unwrap_or_default(),
        config.planner_timeout,
        config.max_concurrent_runs,
        config.artifact_dir.display()
    );

    let state = Arc::new(AppState::new(config.clone()));

    // Start background loops
    if config.keep_artifacts {
        tokio::spawn(loops::artifact_sweep_loop::run_artifact_sweep_loop(state.clone()));
    }

    // Build the app
    let app = api::routes()
        .with_state(state.clone()) // Inject state into all routes
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Run server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    Ok(())
}

/// Resolves on Ctrl-C after cancelling every running planner.
async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested; cancelling {} planner run(s)", state.active_runs().len());
    state.cancel_all();
}
