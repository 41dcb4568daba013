//! Shared settings, errors and helpers for the steeple crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod util;
