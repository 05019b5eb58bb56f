//! # grain
//!
//! Command-line surface of the Grain engine: argument parsing, policy
//! configuration, and reporting. All accounting happens in `grain-core`.

pub mod cli;
pub mod config;
