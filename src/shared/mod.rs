//! Shared utilities used across the probe.

pub mod timing;

pub use timing::{round_tenths, DetailedTiming};
