//! Reads the planner's result artifact.

use std::path::Path;

use glide_core::{CapturedOutput, PlanDocument, PlanError};

/// Load and parse the artifact written by a successful run.
///
/// I/O failures are `ResultUnreadable`, parse failures `ResultMalformed`.
/// Only structure is checked; invariant violations are logged so a plan the
/// renderer could still draw is not thrown away. The document itself is kept
/// as written.
pub async fn read_plan(
    path: &Path,
    output: CapturedOutput,
) -> Result<(PlanDocument, CapturedOutput), PlanError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return Err(PlanError::ResultUnreadable {
                path: path.to_path_buf(),
                message: err.to_string(),
                output,
            })
        }
    };

    let doc = match serde_json::from_slice(&bytes).and_then(PlanDocument::from_value) {
        Ok(doc) => doc,
        Err(err) => {
            return Err(PlanError::ResultMalformed {
                path: path.to_path_buf(),
                message: err.to_string(),
                output,
            })
        }
    };

    let issues = doc.plan.consistency_issues();
    if !issues.is_empty() {
        tracing::warn!(
            artifact = %path.display(),
            "Route plan has {} consistency issue(s): {}",
            issues.len(),
            issues.join("; ")
        );
    }

    Ok((doc, output))
}

/// Delete an artifact once it is no longer needed. Missing files are fine.
pub async fn discard_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(artifact = %path.display(), "Removed result artifact"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(
            artifact = %path.display(),
            "Failed to remove result artifact: {}",
            err
        ),
    }
}
