//! Shared library surface for the glide route planning server and its tests.

pub mod api;
pub mod artifacts;
pub mod config;
pub mod invocation;
pub mod loops;
pub mod orchestrator;
pub mod planner;
pub mod result_reader;
pub mod state;
