//! Background loops for continuous processing.

pub mod artifact_sweep_loop;
