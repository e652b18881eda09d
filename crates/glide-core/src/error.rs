//! Failure taxonomy for a route-planning run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Everything the planner process wrote to stdout and stderr.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// Coarse class of a failure, reported to callers as `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed request. Never retry as-is.
    InvalidRequest,
    /// Planner executable missing or not runnable.
    SpawnFailure,
    /// Planner ran and reported failure, including "no route".
    ComputationFailure,
    Timeout,
    Cancelled,
    /// Planner exited 0 but the artifact could not be read.
    ResultUnreadable,
    /// Artifact present but not a route plan.
    ResultMalformed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::SpawnFailure => "spawn_failure",
            Self::ComputationFailure => "computation_failure",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::ResultUnreadable => "result_unreadable",
            Self::ResultMalformed => "result_malformed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to start planner `{program}`: {message}")]
    SpawnFailure {
        program: String,
        message: String,
        output: CapturedOutput,
    },

    #[error("planner exited with {}", describe_exit(.code))]
    ComputationFailure {
        code: Option<i32>,
        output: CapturedOutput,
    },

    #[error("planner timed out after {:.1}s", .after.as_secs_f64())]
    Timeout {
        after: Duration,
        output: CapturedOutput,
    },

    #[error("planner run cancelled")]
    Cancelled { output: CapturedOutput },

    #[error("result artifact {} unreadable: {message}", .path.display())]
    ResultUnreadable {
        path: PathBuf,
        message: String,
        output: CapturedOutput,
    },

    #[error("result artifact {} malformed: {message}", .path.display())]
    ResultMalformed {
        path: PathBuf,
        message: String,
        output: CapturedOutput,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code: {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl PlanError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::SpawnFailure { .. } => ErrorKind::SpawnFailure,
            Self::ComputationFailure { .. } => ErrorKind::ComputationFailure,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::ResultUnreadable { .. } => ErrorKind::ResultUnreadable,
            Self::ResultMalformed { .. } => ErrorKind::ResultMalformed,
        }
    }

    /// Captured planner output. `None` only for validation failures, which
    /// never reach the process stage.
    pub fn output(&self) -> Option<&CapturedOutput> {
        match self {
            Self::InvalidRequest(_) => None,
            Self::SpawnFailure { output, .. }
            | Self::ComputationFailure { output, .. }
            | Self::Timeout { output, .. }
            | Self::Cancelled { output }
            | Self::ResultUnreadable { output, .. }
            | Self::ResultMalformed { output, .. } => Some(output),
        }
    }
}
