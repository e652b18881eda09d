//! Response envelope returned to callers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CapturedOutput, ErrorKind, PlanError};
use crate::plan::{PlanDocument, RoutePlan};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSuccess {
    pub ok: bool,
    /// The planner's document, passed through as written.
    pub plan: Value,
    /// Planner stdout.
    pub log: String,
}

impl PlanSuccess {
    /// Typed view of `plan`.
    pub fn route_plan(&self) -> Result<RoutePlan, serde_json::Error> {
        RoutePlan::deserialize(&self.plan)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanFailure {
    pub ok: bool,
    pub kind: ErrorKind,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

/// `{ok: true, plan, log}` or `{ok: false, kind, error, stdout?, stderr?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlanResponse {
    Success(PlanSuccess),
    Failure(PlanFailure),
}

impl PlanResponse {
    pub fn success(plan: Value, output: CapturedOutput) -> Self {
        Self::Success(PlanSuccess {
            ok: true,
            plan,
            log: output.stdout,
        })
    }

    pub fn failure(err: &PlanError) -> Self {
        let output = err.output();
        Self::Failure(PlanFailure {
            ok: false,
            kind: err.kind(),
            error: err.to_string(),
            stdout: output.map(|o| o.stdout.clone()),
            stderr: output.map(|o| o.stderr.clone()),
        })
    }

    /// Merge a pipeline result into exactly one envelope.
    pub fn compose(result: Result<(PlanDocument, CapturedOutput), PlanError>) -> Self {
        match result {
            Ok((doc, output)) => Self::success(doc.document, output),
            Err(err) => Self::failure(&err),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure.kind),
        }
    }
}
