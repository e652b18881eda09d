pub mod args;
pub mod error;
pub mod models;
pub mod plan;
pub mod response;
pub mod validation;

pub use args::{planner_args, OUTFILE_FLAG};
pub use error::{CapturedOutput, ErrorKind, PlanError};
pub use models::{GeoPoint, RoutePlanRequest};
pub use plan::{Leg, Node, PlanDocument, RoutePlan, Thermal};
pub use response::{PlanFailure, PlanResponse, PlanSuccess};
pub use validation::{parse_request, validate_request, validate_value};
