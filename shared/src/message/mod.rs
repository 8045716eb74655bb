//! Fanout message types
//!
//! These types are shared between the server and clients subscribed to
//! rooms. A room is a named broadcast channel scoped to one actor or one
//! aggregate; clients treat events as invalidation hints and re-fetch
//! authoritative state when in doubt.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{OrderStatus, TransactionType};

/// Room key addressing one broadcast channel
///
/// Wire form is `<scope>:<id>`, e.g. `order:o-42` or `wallet:b-7`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum RoomKey {
    Order(String),
    Branch(String),
    Customer(String),
    Partner(String),
    Wallet(String),
    /// Admin-broadcast room for platform-wide alerts
    Admin,
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Order(id) => write!(f, "order:{}", id),
            Self::Branch(id) => write!(f, "branch:{}", id),
            Self::Customer(id) => write!(f, "customer:{}", id),
            Self::Partner(id) => write!(f, "partner:{}", id),
            Self::Wallet(id) => write!(f, "wallet:{}", id),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl From<RoomKey> for String {
    fn from(key: RoomKey) -> String {
        key.to_string()
    }
}

/// Error for unparseable room keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRoomKey(pub String);

impl fmt::Display for InvalidRoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid room key: {}", self.0)
    }
}

impl std::error::Error for InvalidRoomKey {}

impl TryFrom<String> for RoomKey {
    type Error = InvalidRoomKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "admin" {
            return Ok(Self::Admin);
        }
        let (scope, id) = value.split_once(':').ok_or(InvalidRoomKey(value.clone()))?;
        if id.is_empty() {
            return Err(InvalidRoomKey(value.clone()));
        }
        match scope {
            "order" => Ok(Self::Order(id.to_string())),
            "branch" => Ok(Self::Branch(id.to_string())),
            "customer" => Ok(Self::Customer(id.to_string())),
            "partner" => Ok(Self::Partner(id.to_string())),
            "wallet" => Ok(Self::Wallet(id.to_string())),
            _ => Err(InvalidRoomKey(value)),
        }
    }
}

/// Event published to a room
///
/// Delivery is at-least-once and unordered across rooms; two rooms
/// receiving related events for the same transition are independent
/// broadcasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum FanoutEvent {
    /// New order created (branch + customer rooms)
    OrderCreated {
        order_id: String,
        order_number: String,
        branch_id: String,
        customer_id: String,
        total_price: Decimal,
        delivery_enabled: bool,
    },
    /// Status changed (order room on every transition)
    OrderStatusUpdated {
        order_id: String,
        order_number: String,
        status: OrderStatus,
        timestamp: i64,
    },
    /// Branch modified items while packing (customer room)
    OrderModified {
        order_id: String,
        changes: Vec<String>,
        new_total: Decimal,
    },
    /// Packed delivery order waiting for a partner (partner rooms)
    ReadyForAssignment {
        order_id: String,
        order_number: String,
        branch_id: String,
    },
    /// Packed pickup order waiting for the customer (customer room)
    ReadyForPickup {
        order_id: String,
        order_number: String,
    },
    /// Partner assigned (branch + customer + partner rooms)
    OrderAssigned {
        order_id: String,
        order_number: String,
        partner_id: String,
    },
    /// Wallet balance changed (wallet room)
    WalletUpdated {
        branch_id: String,
        balance: Decimal,
        amount: Decimal,
        #[serde(rename = "type")]
        tx_type: TransactionType,
    },
    /// Sweep force-closed an insolvent store (branch + admin rooms)
    StoreAutoClosed {
        branch_id: String,
        reason: String,
        balance: Decimal,
    },
}

impl FanoutEvent {
    /// Event name on the wire (the serde tag)
    pub fn name(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "orderCreated",
            Self::OrderStatusUpdated { .. } => "orderStatusUpdated",
            Self::OrderModified { .. } => "orderModified",
            Self::ReadyForAssignment { .. } => "readyForAssignment",
            Self::ReadyForPickup { .. } => "readyForPickup",
            Self::OrderAssigned { .. } => "orderAssigned",
            Self::WalletUpdated { .. } => "walletUpdated",
            Self::StoreAutoClosed { .. } => "storeAutoClosed",
        }
    }
}
