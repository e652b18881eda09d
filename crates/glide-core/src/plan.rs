//! Route plan produced by the external planner.
//!
//! This is the document the planner writes to its result artifact and the sole
//! contract with the map renderer. Fields the planner emits beyond the ones
//! modelled here (edges, pins, labels, run parameters) are carried through
//! untouched in the `extra` maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A graph node: start, goal, or a thermal candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub lat: f64,
    pub lon: f64,
    /// Usable net lift, m/s. Zero means no usable lift.
    pub thermal_net_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceiling_msl: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One climb-then-cruise segment between consecutive path nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub from_id: String,
    pub to_id: String,
    pub depart_h_msl: f64,
    pub arrive_h_msl: f64,
    pub climbed_m: f64,
    pub climb_time_s: f64,
    pub cruise_time_s: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A corridor thermal considered by the planner, used or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thermal {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub net_ms: f64,
    #[serde(default)]
    pub ceiling_msl: Option<f64>,
    #[serde(default)]
    pub used_in_path: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub nodes: BTreeMap<String, Node>,
    pub path: Vec<String>,
    pub steps: Vec<Leg>,
    #[serde(default)]
    pub thermals: Vec<Thermal>,
    pub total_time_s: f64,
    pub final_arrival_h_msl: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A plan exactly as the planner wrote it, plus its typed view.
///
/// Callers get `document` untouched; `plan` is only for checks and summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanDocument {
    pub document: Value,
    pub plan: RoutePlan,
}

impl PlanDocument {
    /// Fails when the document does not have the plan's shape.
    pub fn from_value(document: Value) -> Result<Self, serde_json::Error> {
        let plan = RoutePlan::deserialize(&document)?;
        Ok(Self { document, plan })
    }
}

impl RoutePlan {
    /// Structural invariants the renderer relies on.
    ///
    /// Returns one message per violation; an empty list means the plan is
    /// consistent. Violations are reported, never repaired.
    pub fn consistency_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.path.len() < 2 {
            issues.push(format!("path has {} node(s), expected at least 2", self.path.len()));
        }

        for id in &self.path {
            if !self.nodes.contains_key(id) {
                issues.push(format!("path node '{}' missing from nodes", id));
            }
        }

        for (idx, leg) in self.steps.iter().enumerate() {
            for id in [&leg.from_id, &leg.to_id] {
                if !self.nodes.contains_key(id) {
                    issues.push(format!("step {} references unknown node '{}'", idx, id));
                }
            }
            if leg.climbed_m < 0.0 || leg.climb_time_s < 0.0 || leg.cruise_time_s < 0.0 {
                issues.push(format!("step {} has a negative climb or time", idx));
            }
        }

        let expected_steps = self.path.len().saturating_sub(1);
        if self.steps.len() != expected_steps {
            issues.push(format!(
                "{} step(s) for a path of {} node(s)",
                self.steps.len(),
                self.path.len()
            ));
        } else {
            for (idx, (leg, pair)) in self.steps.iter().zip(self.path.windows(2)).enumerate() {
                if leg.from_id != pair[0] || leg.to_id != pair[1] {
                    issues.push(format!(
                        "step {} is {} -> {} but path has {} -> {}",
                        idx, leg.from_id, leg.to_id, pair[0], pair[1]
                    ));
                }
            }
        }

        for (id, node) in &self.nodes {
            if node.thermal_net_ms < 0.0 {
                issues.push(format!("node '{}' has negative net lift", id));
            }
        }

        issues
    }

    /// Thermals the route actually climbs in.
    pub fn used_thermals(&self) -> impl Iterator<Item = &Thermal> {
        self.thermals.iter().filter(|t| t.used_in_path)
    }
}
