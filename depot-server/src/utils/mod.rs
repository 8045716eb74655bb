//! Utility functions and helpers

pub mod logger;

pub use shared::util::now_millis;
