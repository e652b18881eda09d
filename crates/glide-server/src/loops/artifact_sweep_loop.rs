//! Loop that bounds the retained result-artifact directory.
//!
//! Only started when artifacts are kept after reading; otherwise each request
//! deletes its own artifact and there is nothing to sweep.

use std::sync::Arc;
use tokio::time::interval;

use crate::artifacts::prune_artifacts;
use crate::state::AppState;

/// Start the artifact sweep loop. Exits when the shutdown token fires.
pub async fn run_artifact_sweep_loop(state: Arc<AppState>) {
    let config = state.config().clone();
    let dir = state.artifacts().dir().to_path_buf();
    let shutdown = state.shutdown_token().clone();
    let mut ticker = interval(config.artifact_sweep_interval);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Artifact sweep loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                match prune_artifacts(&dir, config.artifact_max_count, config.artifact_max_age).await {
                    Ok(0) => {}
                    Ok(removed) => tracing::debug!("Pruned {} result artifact(s)", removed),
                    Err(e) => tracing::error!("Artifact sweep error in {}: {}", dir.display(), e),
                }
            }
        }
    }
}
