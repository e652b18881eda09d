//! Route-planning request model.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CORRIDOR_KM: f64 = 30.0;
pub const DEFAULT_MIN_NET_MS: f64 = 1.2;
pub const DEFAULT_MAX_NODES: u32 = 30;
pub const DEFAULT_PER_LEG_FLOOR_MSL: f64 = 1200.0;
pub const DEFAULT_MC_MS: f64 = 0.0;
pub const DEFAULT_WIND_MS: f64 = 8.0;
pub const DEFAULT_WIND_FROM_DEG: f64 = 260.0;
pub const DEFAULT_W_AIR_MS: f64 = 0.0;

/// A `[lat, lon, h_msl]` triple as sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    /// Height above mean sea level, meters.
    pub h_msl: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64, h_msl: f64) -> Self {
        Self { lat, lon, h_msl }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite() && self.h_msl.is_finite()
    }
}

impl From<[f64; 3]> for GeoPoint {
    fn from([lat, lon, h_msl]: [f64; 3]) -> Self {
        Self { lat, lon, h_msl }
    }
}

impl From<GeoPoint> for [f64; 3] {
    fn from(point: GeoPoint) -> Self {
        [point.lat, point.lon, point.h_msl]
    }
}

/// A client request for a thermal-aided glide route.
///
/// Every tuning field is optional on the wire and falls back to the planner's
/// own default, so the outbound invocation always carries an explicit value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlanRequest {
    /// UTC day, `YYYY-MM-DD`. The planner uses today when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    pub start: GeoPoint,
    /// Goal position; `h_msl` is the required arrival height.
    pub goal: GeoPoint,
    /// Half-width of the search corridor, km.
    #[serde(default = "default_corridor_km")]
    pub corridor_km: f64,
    /// Minimum usable thermal net lift, m/s.
    #[serde(default = "default_min_net")]
    pub min_net: f64,
    #[serde(default = "default_max_nodes")]
    pub max_nodes: u32,
    /// Minimum height at the end of every leg, m MSL.
    #[serde(default = "default_per_leg_floor")]
    pub per_leg_floor: f64,
    #[serde(default = "default_mc")]
    pub mc: f64,
    #[serde(default = "default_wind")]
    pub wind: f64,
    /// Wind-from bearing, degrees.
    #[serde(default = "default_wdir")]
    pub wdir: f64,
    /// Vertical air-mass motion, m/s.
    #[serde(default = "default_wair")]
    pub wair: f64,
    #[serde(default)]
    pub chain_thermals: bool,
    /// Name hint for the result artifact. Only a sanitized stem is kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outfile: Option<String>,
}

impl RoutePlanRequest {
    /// Request with every tuning field at its default.
    pub fn new(start: GeoPoint, goal: GeoPoint) -> Self {
        Self {
            day: None,
            start,
            goal,
            corridor_km: DEFAULT_CORRIDOR_KM,
            min_net: DEFAULT_MIN_NET_MS,
            max_nodes: DEFAULT_MAX_NODES,
            per_leg_floor: DEFAULT_PER_LEG_FLOOR_MSL,
            mc: DEFAULT_MC_MS,
            wind: DEFAULT_WIND_MS,
            wdir: DEFAULT_WIND_FROM_DEG,
            wair: DEFAULT_W_AIR_MS,
            chain_thermals: false,
            outfile: None,
        }
    }
}

fn default_corridor_km() -> f64 {
    DEFAULT_CORRIDOR_KM
}

fn default_min_net() -> f64 {
    DEFAULT_MIN_NET_MS
}

fn default_max_nodes() -> u32 {
    DEFAULT_MAX_NODES
}

fn default_per_leg_floor() -> f64 {
    DEFAULT_PER_LEG_FLOOR_MSL
}

fn default_mc() -> f64 {
    DEFAULT_MC_MS
}

fn default_wind() -> f64 {
    DEFAULT_WIND_MS
}

fn default_wdir() -> f64 {
    DEFAULT_WIND_FROM_DEG
}

fn default_wair() -> f64 {
    DEFAULT_W_AIR_MS
}
