//! API routes for the glide route planning server.

pub mod request_id;
mod routes;

use axum::Router;

pub use routes::status_for;

pub fn routes() -> Router<std::sync::Arc<crate::state::AppState>> {
    routes::create_router()
}
