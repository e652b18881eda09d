//! Server configuration from environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// Executable started for each request, e.g. `python3`.
    pub planner_program: String,
    /// Script passed as the first planner argument, if any.
    pub planner_script: Option<PathBuf>,
    /// Working directory of the planner process.
    pub planner_workdir: Option<PathBuf>,
    /// `None` disables the deadline.
    pub planner_timeout: Option<Duration>,
    pub max_concurrent_runs: usize,
    pub artifact_dir: PathBuf,
    /// Retain result artifacts after reading instead of deleting them.
    pub keep_artifacts: bool,
    pub artifact_max_age: Duration,
    pub artifact_max_count: usize,
    pub artifact_sweep_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("GLIDE_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            planner_program: env::var("GLIDE_PLANNER_PROGRAM")
                .unwrap_or_else(|_| "python3".to_string()),
            planner_script: match env::var("GLIDE_PLANNER_SCRIPT") {
                Ok(script) if script.trim().is_empty() => None,
                Ok(script) => Some(PathBuf::from(script)),
                Err(_) => Some(PathBuf::from("generate_from_weglide.py")),
            },
            planner_workdir: env::var("GLIDE_PLANNER_WORKDIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            planner_timeout: Some(env_u64("GLIDE_PLANNER_TIMEOUT_S", 300))
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            max_concurrent_runs: env_u64("GLIDE_MAX_CONCURRENT_RUNS", 4).max(1) as usize,
            artifact_dir: env::var("GLIDE_ARTIFACT_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| env::temp_dir().join("glide-plans")),
            keep_artifacts: env_bool("GLIDE_KEEP_ARTIFACTS", false),
            artifact_max_age: Duration::from_secs(env_u64("GLIDE_ARTIFACT_MAX_AGE_S", 3600)),
            artifact_max_count: env_u64("GLIDE_ARTIFACT_MAX_COUNT", 200) as usize,
            artifact_sweep_interval: Duration::from_secs(
                env_u64("GLIDE_ARTIFACT_SWEEP_INTERVAL_S", 60).max(1),
            ),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}
