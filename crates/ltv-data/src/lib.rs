//! Data layer for subscription LTV analytics.
//!
//! Discovers and reads CSV subscription exports, groups records into
//! segments, computes country and per-segment LTV figures and runs the
//! top-level analysis pipeline.

pub mod analysis;
pub mod country;
pub mod ltv_profile;
pub mod reader;
pub mod segments;

pub use ltv_core as core;
