//! Route planning pipeline: validate, build the invocation, run the external
//! planner, read its artifact, compose the response.

use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;
use glide_core::{parse_request, CapturedOutput, PlanDocument, PlanError, PlanResponse, RoutePlanRequest};

use crate::invocation::Invocation;
use crate::orchestrator::PlannerRun;
use crate::result_reader::{discard_artifact, read_plan};
use crate::state::{ActiveRun, AppState};

/// Handle one raw request body end to end. Always yields exactly one envelope.
pub async fn plan_route(state: &AppState, request_id: &str, body: &[u8]) -> PlanResponse {
    let request = match parse_request(body) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(request_id, "Rejected route request: {}", err);
            return PlanResponse::failure(&err);
        }
    };
    PlanResponse::compose(run_request(state, request_id, &request).await)
}

/// Run the planner for a validated request and read back its plan.
pub async fn run_request(
    state: &AppState,
    request_id: &str,
    request: &RoutePlanRequest,
) -> Result<(PlanDocument, CapturedOutput), PlanError> {
    let config = state.config();
    let invocation = Invocation::prepare(config, state.artifacts(), request, request_id)
        .await
        .map_err(|err| PlanError::SpawnFailure {
            program: config.planner_program.clone(),
            message: format!(
                "cannot create artifact directory {}: {}",
                state.artifacts().dir().display(),
                err
            ),
            output: CapturedOutput::default(),
        })?;

    let cancel = state.shutdown_token().child_token();
    let _permit = tokio::select! {
        permit = state.run_permits().acquire_owned() => permit.map_err(|_| PlanError::Cancelled {
            output: CapturedOutput::default(),
        })?,
        _ = cancel.cancelled() => {
            return Err(PlanError::Cancelled { output: CapturedOutput::default() });
        }
    };

    let started = Instant::now();
    let run = PlannerRun::spawn(&invocation)?;
    tracing::info!(
        request_id,
        pid = ?run.pid(),
        "Started planner: {}",
        invocation.display_command()
    );

    let run_id = Uuid::new_v4().simple().to_string();
    state.register_run(ActiveRun {
        run_id: run_id.clone(),
        request_id: request_id.to_string(),
        pid: run.pid(),
        artifact: invocation.artifact.display().to_string(),
        started_at: Utc::now(),
        cancel: cancel.clone(),
    });
    let _registration = RunRegistration {
        state,
        run_id: &run_id,
    };

    let outcome = match run.wait(config.planner_timeout, &cancel).await {
        Ok(output) => read_plan(&invocation.artifact, output).await,
        Err(err) => Err(err),
    };

    if !config.keep_artifacts {
        discard_artifact(&invocation.artifact).await;
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &outcome {
        Ok((doc, _)) => tracing::info!(
            request_id,
            elapsed_ms,
            "Planner succeeded: {} node path, {:.0}s total",
            doc.plan.path.len(),
            doc.plan.total_time_s
        ),
        Err(err) => tracing::warn!(
            request_id,
            elapsed_ms,
            kind = %err.kind(),
            "Planner run failed: {}",
            err
        ),
    }

    outcome
}

/// Removes the run from the active registry however the request ends.
struct RunRegistration<'a> {
    state: &'a AppState,
    run_id: &'a str,
}

impl Drop for RunRegistration<'_> {
    fn drop(&mut self) {
        self.state.finish_run(self.run_id);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Config;
    use glide_core::ErrorKind;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    const REFERENCE_PLAN: &str = r#"{"nodes":{"A":{"lat":46.095,"lon":11.300,"thermal_net_ms":0},"B":{"lat":46.130,"lon":11.520,"thermal_net_ms":0}},"path":["A","B"],"steps":[{"from_id":"A","to_id":"B","depart_h_msl":1600,"arrive_h_msl":1200,"climbed_m":0,"climb_time_s":0,"cruise_time_s":600}],"thermals":[],"total_time_s":600,"final_arrival_h_msl":1200}"#;

    const REFERENCE_REQUEST: &str = r#"{"start":[46.095,11.300,1600],"goal":[46.130,11.520,1200],"corridor_km":20,"min_net":1.0,"max_nodes":20,"per_leg_floor":1200,"mc":0,"wind":0,"wdir":0,"wair":-0.3,"chain_thermals":false}"#;

    /// Stub planner script: finds `--outfile` and runs `body` with `$out` set.
    fn write_stub(dir: &Path, body: &str) -> PathBuf {
        let script = format!(
            "out=\"\"\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"--outfile\" ]; then out=\"$2\"; fi\n  shift\ndone\n{}\n",
            body
        );
        let path = dir.join("stub_planner.sh");
        std::fs::write(&path, script).unwrap();
        path
    }

    fn state_for(dir: &Path, stub: Option<PathBuf>) -> AppState {
        let mut config = Config::from_env();
        config.planner_program = "sh".to_string();
        config.planner_script = stub;
        config.planner_workdir = None;
        config.planner_timeout = Some(Duration::from_secs(10));
        config.artifact_dir = dir.join("artifacts");
        config.keep_artifacts = false;
        AppState::new(config)
    }

    fn artifact_count(state: &AppState) -> usize {
        std::fs::read_dir(state.artifacts().dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn reference_scenario_returns_plan_and_empty_log() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = write_stub(tmp.path(), &format!("cat > \"$out\" <<'EOF'\n{}\nEOF", REFERENCE_PLAN));
        let state = state_for(tmp.path(), Some(stub));

        let response = plan_route(&state, "req-ok", REFERENCE_REQUEST.as_bytes()).await;
        let expected: serde_json::Value = serde_json::from_str(REFERENCE_PLAN).unwrap();
        match response {
            PlanResponse::Success(success) => {
                assert!(success.ok);
                assert_eq!(success.plan, expected);
                assert_eq!(success.log, "");
            }
            PlanResponse::Failure(failure) => panic!("unexpected failure: {:?}", failure),
        }
        assert_eq!(artifact_count(&state), 0, "artifact should be removed after reading");
        assert!(state.active_runs().is_empty());
    }

    #[tokio::test]
    async fn no_route_exit_code_is_reported_with_output() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = write_stub(tmp.path(), "printf 'no route found' >&2\nexit 2");
        let state = state_for(tmp.path(), Some(stub));

        match plan_route(&state, "req-fail", REFERENCE_REQUEST.as_bytes()).await {
            PlanResponse::Failure(failure) => {
                assert_eq!(failure.kind, ErrorKind::ComputationFailure);
                assert!(failure.error.ends_with("code: 2"));
                assert_eq!(failure.stdout.as_deref(), Some(""));
                assert_eq!(failure.stderr.as_deref(), Some("no route found"));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn invalid_request_never_starts_the_planner() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("ran");
        let stub = write_stub(tmp.path(), &format!("touch '{}'", marker.display()));
        let state = state_for(tmp.path(), Some(stub));

        let body = br#"{"start":[46.095,11.3],"goal":[46.13,11.52,1200]}"#;
        let response = plan_route(&state, "req-bad", body).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::InvalidRequest));
        assert!(!marker.exists());
        assert!(!state.artifacts().dir().exists());
    }

    #[tokio::test]
    async fn missing_executable_is_spawn_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let state = {
            let mut config = state_for(tmp.path(), None).config().clone();
            config.planner_program = tmp.path().join("no-such-planner").display().to_string();
            AppState::new(config)
        };

        match plan_route(&state, "req-spawn", REFERENCE_REQUEST.as_bytes()).await {
            PlanResponse::Failure(failure) => {
                assert_eq!(failure.kind, ErrorKind::SpawnFailure);
                assert_eq!(failure.stdout.as_deref(), Some(""));
                assert_eq!(failure.stderr.as_deref(), Some(""));
            }
            other => panic!("unexpected response: {:?}", other),
        }
        assert_eq!(artifact_count(&state), 0);
    }

    #[tokio::test]
    async fn success_without_artifact_is_unreadable() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = write_stub(tmp.path(), "echo 'pretending to plan'");
        let state = state_for(tmp.path(), Some(stub));

        match plan_route(&state, "req-missing", REFERENCE_REQUEST.as_bytes()).await {
            PlanResponse::Failure(failure) => {
                assert_eq!(failure.kind, ErrorKind::ResultUnreadable);
                assert_eq!(failure.stdout.as_deref(), Some("pretending to plan\n"));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn garbage_artifact_is_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = write_stub(tmp.path(), "printf 'not json' > \"$out\"");
        let state = state_for(tmp.path(), Some(stub));

        let response = plan_route(&state, "req-garbage", REFERENCE_REQUEST.as_bytes()).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::ResultMalformed));
        assert_eq!(artifact_count(&state), 0);
    }

    #[tokio::test]
    async fn slow_planner_times_out() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = write_stub(tmp.path(), "sleep 30");
        let state = {
            let mut config = state_for(tmp.path(), Some(stub)).config().clone();
            config.planner_timeout = Some(Duration::from_millis(200));
            AppState::new(config)
        };

        let response = plan_route(&state, "req-slow", REFERENCE_REQUEST.as_bytes()).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::Timeout));
        assert!(state.active_runs().is_empty());
    }

    #[tokio::test]
    async fn retained_artifacts_survive_reading() {
        let tmp = tempfile::tempdir().unwrap();
        let stub = write_stub(tmp.path(), &format!("cat > \"$out\" <<'EOF'\n{}\nEOF", REFERENCE_PLAN));
        let state = {
            let mut config = state_for(tmp.path(), Some(stub)).config().clone();
            config.keep_artifacts = true;
            AppState::new(config)
        };

        assert!(plan_route(&state, "req-keep", REFERENCE_REQUEST.as_bytes()).await.is_ok());
        assert_eq!(artifact_count(&state), 1);
    }

    #[tokio::test]
    async fn concurrent_requests_read_their_own_results() {
        let tmp = tempfile::tempdir().unwrap();
        // Each run echoes its --day back as the goal node id, after a delay so
        // the runs overlap.
        let stub = tmp.path().join("stub_planner.sh");
        let script = format!(
            "out=\"\"\nday=\"\"\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"--outfile\" ]; then out=\"$2\"; fi\n  if [ \"$1\" = \"--day\" ]; then day=\"$2\"; fi\n  shift\ndone\nsleep 0.3\ncat > \"$out\" <<EOF\n{}\nEOF\n",
            r#"{"nodes":{"S":{"lat":0,"lon":0,"thermal_net_ms":0},"$day":{"lat":1,"lon":1,"thermal_net_ms":0}},"path":["S","$day"],"steps":[],"thermals":[],"total_time_s":0,"final_arrival_h_msl":0}"#
        );
        std::fs::write(&stub, script).unwrap();
        let state = std::sync::Arc::new(state_for(tmp.path(), Some(stub)));

        let days = ["2025-07-14", "2025-07-15", "2025-07-16", "2025-07-17"];
        let handles: Vec<_> = days
            .iter()
            .enumerate()
            .map(|(idx, day)| {
                let state = state.clone();
                let body = format!(
                    r#"{{"day":"{}","start":[46.0,11.0,1500],"goal":[46.1,11.2,1200]}}"#,
                    day
                );
                tokio::spawn(async move {
                    plan_route(&state, &format!("req-{}", idx), body.as_bytes()).await
                })
            })
            .collect();

        for (handle, day) in handles.into_iter().zip(days) {
            match handle.await.unwrap() {
                PlanResponse::Success(success) => assert_eq!(success.plan["path"], serde_json::json!(["S", day])),
                PlanResponse::Failure(failure) => panic!("unexpected failure: {:?}", failure),
            }
        }
    }

    #[tokio::test]
    async fn runs_beyond_the_limit_wait_for_a_permit() {
        let tmp = tempfile::tempdir().unwrap();
        // A second planner starting while another holds the marker fails.
        let busy = tmp.path().join("busy");
        let stub = write_stub(
            tmp.path(),
            &format!(
                "if [ -e '{busy}' ]; then echo overlap >&2; exit 9; fi\ntouch '{busy}'\nsleep 0.3\nrm '{busy}'\ncat > \"$out\" <<'EOF'\n{plan}\nEOF",
                busy = busy.display(),
                plan = REFERENCE_PLAN
            ),
        );
        let state = {
            let mut config = state_for(tmp.path(), Some(stub)).config().clone();
            config.max_concurrent_runs = 1;
            std::sync::Arc::new(AppState::new(config))
        };

        let handles: Vec<_> = (0..3)
            .map(|idx| {
                let state = state.clone();
                tokio::spawn(async move {
                    plan_route(&state, &format!("req-limit-{}", idx), REFERENCE_REQUEST.as_bytes()).await
                })
            })
            .collect();

        for handle in handles {
            let response = handle.await.unwrap();
            assert!(response.is_ok(), "unexpected failure: {:?}", response);
        }
        assert_eq!(state.run_permits().available_permits(), 1);
    }
}
