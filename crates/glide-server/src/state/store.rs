//! In-memory state store using DashMap.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::invocation::ArtifactAllocator;

/// A planner run currently in flight.
///
/// `run_id` is assigned by the server and unique per run; `request_id` comes
/// from the caller and may repeat.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveRun {
    pub run_id: String,
    pub request_id: String,
    pub pid: Option<u32>,
    pub artifact: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip)]
    pub cancel: CancellationToken,
}

/// Application state shared by all requests.
///
/// The only cross-request state: artifact path allocation, the registry of
/// running planner processes, and the limit on how many run at once.
pub struct AppState {
    config: Config,
    artifacts: ArtifactAllocator,
    active_runs: DashMap<String, ActiveRun>,
    run_permits: Arc<Semaphore>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            artifacts: ArtifactAllocator::new(config.artifact_dir.clone()),
            active_runs: DashMap::new(),
            run_permits: Arc::new(Semaphore::new(config.max_concurrent_runs.max(1))),
            shutdown: CancellationToken::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn artifacts(&self) -> &ArtifactAllocator {
        &self.artifacts
    }

    pub fn run_permits(&self) -> Arc<Semaphore> {
        self.run_permits.clone()
    }

    /// Root token; cancelling it stops every running planner.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn register_run(&self, run: ActiveRun) {
        self.active_runs.insert(run.run_id.clone(), run);
    }

    pub fn finish_run(&self, run_id: &str) {
        self.active_runs.remove(run_id);
    }

    /// Runs in flight, oldest first.
    pub fn active_runs(&self) -> Vec<ActiveRun> {
        let mut runs: Vec<ActiveRun> = self.active_runs.iter().map(|r| r.value().clone()).collect();
        runs.sort_by_key(|run| run.started_at);
        runs
    }

    /// Cancel the run with this run id, or every run carrying this request
    /// id. Returns how many runs were cancelled.
    pub fn cancel_run(&self, id: &str) -> usize {
        if let Some(run) = self.active_runs.get(id) {
            run.cancel.cancel();
            return 1;
        }
        let mut cancelled = 0;
        for run in self.active_runs.iter().filter(|r| r.request_id == id) {
            run.cancel.cancel();
            cancelled += 1;
        }
        cancelled
    }

    /// Cancel every run, used on shutdown.
    pub fn cancel_all(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(id: &str, cancel: CancellationToken) -> ActiveRun {
        ActiveRun {
            run_id: format!("run-{}", id),
            request_id: id.to_string(),
            pid: Some(42),
            artifact: format!("/tmp/{}.json", id),
            started_at: Utc::now(),
            cancel,
        }
    }

    #[test]
    fn cancel_run_reaches_registered_token() {
        let state = AppState::new(Config::from_env());
        let token = state.shutdown_token().child_token();
        state.register_run(run("req-1", token.clone()));

        assert_eq!(state.cancel_run("req-1"), 1);
        assert!(token.is_cancelled());
        assert_eq!(state.cancel_run("req-2"), 0);

        state.finish_run("run-req-1");
        assert!(state.active_runs().is_empty());
    }

    #[test]
    fn repeated_request_ids_keep_separate_runs() {
        let state = AppState::new(Config::from_env());
        let slow = state.shutdown_token().child_token();
        let fast = state.shutdown_token().child_token();
        let mut first = run("dup", slow.clone());
        first.run_id = "run-slow".to_string();
        let mut second = run("dup", fast.clone());
        second.run_id = "run-fast".to_string();
        state.register_run(first);
        state.register_run(second);
        assert_eq!(state.active_runs().len(), 2);

        state.finish_run("run-fast");
        let remaining = state.active_runs();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].run_id, "run-slow");

        assert_eq!(state.cancel_run("dup"), 1);
        assert!(slow.is_cancelled());
        assert!(!fast.is_cancelled());
    }

    #[test]
    fn cancel_by_run_id_leaves_siblings_running() {
        let state = AppState::new(Config::from_env());
        let a = state.shutdown_token().child_token();
        let b = state.shutdown_token().child_token();
        let mut first = run("dup", a.clone());
        first.run_id = "run-a".to_string();
        let mut second = run("dup", b.clone());
        second.run_id = "run-b".to_string();
        state.register_run(first);
        state.register_run(second);

        assert_eq!(state.cancel_run("run-b"), 1);
        assert!(b.is_cancelled());
        assert!(!a.is_cancelled());
    }

    #[test]
    fn cancel_all_cancels_child_tokens() {
        let state = AppState::new(Config::from_env());
        let token = state.shutdown_token().child_token();
        state.cancel_all();
        assert!(token.is_cancelled());
    }
}
