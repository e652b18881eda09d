use anyhow::{Context, Result};
use clap::Parser;
use glide_cli::{format_failure, format_plan, GlideClient};
use glide_core::models::{
    DEFAULT_CORRIDOR_KM, DEFAULT_MAX_NODES, DEFAULT_MC_MS, DEFAULT_MIN_NET_MS,
    DEFAULT_PER_LEG_FLOOR_MSL, DEFAULT_WIND_FROM_DEG, DEFAULT_WIND_MS, DEFAULT_W_AIR_MS,
};
use glide_core::{GeoPoint, PlanResponse, RoutePlanRequest};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Request a thermal-aided glide route", long_about = None)]
struct Args {
    /// Glide server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// UTC day YYYY-MM-DD (planner default: today)
    #[arg(long)]
    day: Option<String>,

    /// Start position
    #[arg(long, num_args = 3, value_names = ["LAT", "LON", "H_MSL"], allow_negative_numbers = true, required = true)]
    start: Vec<f64>,

    /// Goal position and required arrival height
    #[arg(long, num_args = 3, value_names = ["LAT", "LON", "ARRIVE_H"], allow_negative_numbers = true, required = true)]
    goal: Vec<f64>,

    /// Half-width corridor (km)
    #[arg(long, default_value_t = DEFAULT_CORRIDOR_KM)]
    corridor_km: f64,

    /// Minimum net thermal (m/s)
    #[arg(long, default_value_t = DEFAULT_MIN_NET_MS, allow_negative_numbers = true)]
    min_net: f64,

    /// Max thermal nodes to consider
    #[arg(long, default_value_t = DEFAULT_MAX_NODES)]
    max_nodes: u32,

    /// Arrival floor at the end of each leg (m MSL)
    #[arg(long, default_value_t = DEFAULT_PER_LEG_FLOOR_MSL, allow_negative_numbers = true)]
    per_leg_floor: f64,

    /// MacCready setting (m/s)
    #[arg(long, default_value_t = DEFAULT_MC_MS, allow_negative_numbers = true)]
    mc: f64,

    /// Wind speed (m/s)
    #[arg(long, default_value_t = DEFAULT_WIND_MS, allow_negative_numbers = true)]
    wind: f64,

    /// Wind FROM direction (deg)
    #[arg(long, default_value_t = DEFAULT_WIND_FROM_DEG, allow_negative_numbers = true)]
    wdir: f64,

    /// Background vertical air motion (m/s)
    #[arg(long, default_value_t = DEFAULT_W_AIR_MS, allow_negative_numbers = true)]
    wair: f64,

    /// Allow hops between thermals
    #[arg(long)]
    chain_thermals: bool,

    /// Print the raw response envelope
    #[arg(long)]
    json: bool,

    /// Write the plan JSON to this file on success
    #[arg(long)]
    save: Option<PathBuf>,
}

impl Args {
    fn to_request(&self) -> RoutePlanRequest {
        let mut request = RoutePlanRequest::new(point(&self.start), point(&self.goal));
        request.day = self.day.clone();
        request.corridor_km = self.corridor_km;
        request.min_net = self.min_net;
        request.max_nodes = self.max_nodes;
        request.per_leg_floor = self.per_leg_floor;
        request.mc = self.mc;
        request.wind = self.wind;
        request.wdir = self.wdir;
        request.wair = self.wair;
        request.chain_thermals = self.chain_thermals;
        request
    }
}

fn point(values: &[f64]) -> GeoPoint {
    GeoPoint::new(values[0], values[1], values[2])
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let request = args.to_request();
    if let Err(err) = glide_core::validate_request(&request) {
        eprintln!("{}", err);
        return Ok(ExitCode::FAILURE);
    }

    let client = GlideClient::new(args.url.clone());
    let response = client.plan(&request).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    match response {
        PlanResponse::Success(success) => {
            if !args.json {
                let plan = success
                    .route_plan()
                    .context("server returned a plan of unexpected shape")?;
                print!("{}", format_plan(&plan));
            }
            if let Some(path) = &args.save {
                let json = serde_json::to_string_pretty(&success.plan)?;
                std::fs::write(path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Wrote {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        PlanResponse::Failure(failure) => {
            if !args.json {
                eprint!("{}", format_failure(&failure));
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
