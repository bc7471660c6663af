//! Output layer for subscription LTV analytics.
//!
//! Renders analysis results as console text, draws per-segment LTV charts
//! with [`plotters`] and exports the full report as JSON.

pub mod charts;
pub mod console;
pub mod export;

pub use ltv_core as core;
