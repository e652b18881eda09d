//! Glide CLI - command line client for the route planning server.
//!
//! - `glide-plan`: submit a route request and print the legs

pub mod client;
pub mod summary;

pub use client::GlideClient;
pub use summary::{format_failure, format_plan};
