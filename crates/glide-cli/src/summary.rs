//! Plain-text rendering of plans and failures.

use glide_core::{PlanFailure, RoutePlan};
use std::fmt::Write;

/// Leg-by-leg breakdown of a plan.
pub fn format_plan(plan: &RoutePlan) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Route {} ({} leg(s), {:.1} min, arrive {:.0} m MSL)",
        plan.path.join(" -> "),
        plan.steps.len(),
        plan.total_time_s / 60.0,
        plan.final_arrival_h_msl
    );
    for leg in &plan.steps {
        let _ = writeln!(
            out,
            "  {} -> {}: climb={:.0} m in {:.1} min, cruise={:.1} min, depart={:.0} m -> arrive={:.0} m",
            leg.from_id,
            leg.to_id,
            leg.climbed_m,
            leg.climb_time_s / 60.0,
            leg.cruise_time_s / 60.0,
            leg.depart_h_msl,
            leg.arrive_h_msl
        );
    }
    let _ = writeln!(
        out,
        "Thermals: {} considered, {} used",
        plan.thermals.len(),
        plan.used_thermals().count()
    );
    for issue in plan.consistency_issues() {
        let _ = writeln!(out, "warning: {}", issue);
    }
    out
}

/// Failure summary including whatever the planner printed.
pub fn format_failure(failure: &PlanFailure) -> String {
    let mut out = format!("Planning failed [{}]: {}\n", failure.kind, failure.error);
    for (label, text) in [("stdout", &failure.stdout), ("stderr", &failure.stderr)] {
        if let Some(text) = text.as_deref().filter(|t| !t.trim().is_empty()) {
            let _ = writeln!(out, "--- planner {} ---", label);
            let _ = writeln!(out, "{}", text.trim_end());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use glide_core::ErrorKind;
    use serde_json::json;

    #[test]
    fn plan_summary_lists_legs() {
        let plan: RoutePlan = serde_json::from_value(json!({
            "nodes": {
                "START": {"lat": 46.0, "lon": 11.0, "thermal_net_ms": 0},
                "T1": {"lat": 46.05, "lon": 11.2, "thermal_net_ms": 2.1, "ceiling_msl": 2500},
                "GOAL": {"lat": 46.1, "lon": 11.5, "thermal_net_ms": 0}
            },
            "path": ["START", "T1", "GOAL"],
            "steps": [
                {"from_id": "START", "to_id": "T1", "depart_h_msl": 1600, "arrive_h_msl": 1300,
                 "climbed_m": 0, "climb_time_s": 0, "cruise_time_s": 420},
                {"from_id": "T1", "to_id": "GOAL", "depart_h_msl": 2500, "arrive_h_msl": 1400,
                 "climbed_m": 1200, "climb_time_s": 571, "cruise_time_s": 900}
            ],
            "thermals": [
                {"id": "T1", "lat": 46.05, "lon": 11.2, "net_ms": 2.1, "ceiling_msl": 2500, "used_in_path": true},
                {"id": "T2", "lat": 46.07, "lon": 11.3, "net_ms": 1.3, "ceiling_msl": null, "used_in_path": false}
            ],
            "total_time_s": 1891,
            "final_arrival_h_msl": 1400
        }))
        .unwrap();

        let text = format_plan(&plan);
        assert!(text.starts_with("Route START -> T1 -> GOAL (2 leg(s), 31.5 min, arrive 1400 m MSL)"));
        assert!(text.contains("T1 -> GOAL: climb=1200 m in 9.5 min"));
        assert!(text.contains("Thermals: 2 considered, 1 used"));
        assert!(!text.contains("warning"));
    }

    #[test]
    fn failure_summary_includes_stderr_only_when_present() {
        let failure = PlanFailure {
            ok: false,
            kind: ErrorKind::ComputationFailure,
            error: "planner exited with code: 2".to_string(),
            stdout: Some(String::new()),
            stderr: Some("no route found\n".to_string()),
        };
        let text = format_failure(&failure);
        assert!(text.starts_with("Planning failed [computation_failure]: planner exited with code: 2"));
        assert!(text.contains("--- planner stderr ---\nno route found"));
        assert!(!text.contains("planner stdout"));
    }
}
