//! Domain layer for subscription LTV analytics.
//!
//! Holds the subscription record model, the lifetime / order value / LTV
//! calculations, number formatting, time helpers, CLI settings and the
//! shared error type.

pub mod calculations;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{LtvError, Result};
