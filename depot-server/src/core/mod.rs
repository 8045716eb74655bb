//! Core module: configuration, state and background tasks
//!
//! - [`Config`] - server configuration
//! - [`ServerState`] - wired service graph
//! - [`BackgroundTasks`] - background task supervisor

pub mod config;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use state::ServerState;
pub use tasks::{BackgroundTasks, TaskKind};
