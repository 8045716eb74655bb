//! Shared types for the depot platform
//!
//! This crate holds everything both the server and its clients need to
//! agree on:
//!
//! - **models**: domain entities (orders, wallets, branches, partners, products)
//! - **error**: unified error codes, categories and the [`AppError`] type
//! - **message**: fanout room keys and event payloads

pub mod error;
pub mod message;
pub mod models;
pub mod util;

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use message::{FanoutEvent, RoomKey};
