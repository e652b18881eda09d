//! Request validation.
//!
//! Shape checks run on the raw JSON before typed deserialization so a bad
//! `start`/`goal` is always reported as a request error with a precise
//! message, never surfaced later as a planner failure.

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::PlanError;
use crate::models::RoutePlanRequest;

/// Parse and validate a raw request body.
pub fn parse_request(body: &[u8]) -> Result<RoutePlanRequest, PlanError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| PlanError::invalid(format!("body is not valid JSON: {}", err)))?;
    validate_value(value)
}

/// Validate an already-parsed JSON request.
pub fn validate_value(value: Value) -> Result<RoutePlanRequest, PlanError> {
    let Some(fields) = value.as_object() else {
        return Err(PlanError::invalid("body must be a JSON object"));
    };

    check_position(fields.get("start"), "start")?;
    check_position(fields.get("goal"), "goal")?;

    let request: RoutePlanRequest = serde_json::from_value(value)
        .map_err(|err| PlanError::invalid(err.to_string()))?;
    validate_request(&request)?;
    Ok(request)
}

/// Bound checks on a typed request.
pub fn validate_request(request: &RoutePlanRequest) -> Result<(), PlanError> {
    if !request.start.is_finite() {
        return Err(PlanError::invalid("start must contain finite numbers"));
    }
    if !request.goal.is_finite() {
        return Err(PlanError::invalid("goal must contain finite numbers"));
    }

    let numeric = [
        ("corridor_km", request.corridor_km),
        ("min_net", request.min_net),
        ("per_leg_floor", request.per_leg_floor),
        ("mc", request.mc),
        ("wind", request.wind),
        ("wdir", request.wdir),
        ("wair", request.wair),
    ];
    for (name, value) in numeric {
        if !value.is_finite() {
            return Err(PlanError::invalid(format!("{} must be a finite number", name)));
        }
    }

    if request.corridor_km <= 0.0 {
        return Err(PlanError::invalid("corridor_km must be positive"));
    }
    if request.max_nodes == 0 {
        return Err(PlanError::invalid("max_nodes must be a positive integer"));
    }

    if let Some(day) = &request.day {
        if NaiveDate::parse_from_str(day, "%Y-%m-%d").is_err() {
            return Err(PlanError::invalid(format!(
                "day must be a YYYY-MM-DD date, got '{}'",
                day
            )));
        }
    }

    Ok(())
}

fn check_position(value: Option<&Value>, name: &str) -> Result<(), PlanError> {
    let expected = || PlanError::invalid(format!("{} must be [lat, lon, h_msl] of finite numbers", name));

    let items = value.and_then(Value::as_array).ok_or_else(expected)?;
    if items.len() != 3 {
        return Err(expected());
    }
    let all_finite = items
        .iter()
        .all(|item| item.as_f64().is_some_and(f64::is_finite));
    if !all_finite {
        return Err(expected());
    }
    Ok(())
}
