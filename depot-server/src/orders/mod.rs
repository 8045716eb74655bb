//! Order lifecycle
//!
//! [`modification`] holds the pure item-change validator, [`manager`]
//! the stateful commands that drive the lifecycle.

pub mod manager;
pub mod modification;

pub use manager::{CreateOrderRequest, NewOrderItem, OrderManager};
pub use modification::{ModificationOutcome, ProposedItem};
