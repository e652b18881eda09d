//! Planner command-line arguments.
//!
//! The flag order is fixed so identical requests always produce identical
//! invocations (apart from the output path).

use std::ffi::OsString;
use std::path::Path;

use crate::models::{GeoPoint, RoutePlanRequest};

pub const OUTFILE_FLAG: &str = "--outfile";

/// Build the planner argument vector for a validated request.
///
/// `--day` is emitted only when present and `--chain-thermals` only when
/// true; every other field is always passed explicitly. `--outfile` is last.
pub fn planner_args(request: &RoutePlanRequest, outfile: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(28);

    if let Some(day) = &request.day {
        push_flag(&mut args, "--day", day);
    }
    push_point(&mut args, "--start", &request.start);
    push_point(&mut args, "--goal", &request.goal);
    push_flag(&mut args, "--corridor-km", &request.corridor_km.to_string());
    push_flag(&mut args, "--min-net", &request.min_net.to_string());
    push_flag(&mut args, "--max-nodes", &request.max_nodes.to_string());
    push_flag(&mut args, "--per-leg-floor", &request.per_leg_floor.to_string());
    push_flag(&mut args, "--mc", &request.mc.to_string());
    push_flag(&mut args, "--wind", &request.wind.to_string());
    push_flag(&mut args, "--wdir", &request.wdir.to_string());
    push_flag(&mut args, "--wair", &request.wair.to_string());
    if request.chain_thermals {
        args.push("--chain-thermals".into());
    }
    args.push(OUTFILE_FLAG.into());
    args.push(outfile.as_os_str().to_owned());

    args
}

fn push_flag(args: &mut Vec<OsString>, flag: &str, value: &str) {
    args.push(flag.into());
    args.push(value.into());
}

fn push_point(args: &mut Vec<OsString>, flag: &str, point: &GeoPoint) {
    args.push(flag.into());
    args.push(point.lat.to_string().into());
    args.push(point.lon.to_string().into());
    args.push(point.h_msl.to_string().into());
}
