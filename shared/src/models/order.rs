//! Order aggregate and its value types
//!
//! The order is the aggregate root of the core. It is mutated exclusively
//! through the order manager's commands; every status change appends to
//! `status_history` and every branch-side item change appends to
//! `modification_history`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order lifecycle status
///
/// Legal transitions (no back-edges except cancel):
///
/// ```text
/// placed -> accepted -> packed -> assigned -> arriving -> delivered
/// placed/accepted/packed -> cancelled        (branch-initiated)
/// packed -> delivered                        (self-pickup, delivery disabled)
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Placed,
    Accepted,
    Packed,
    Assigned,
    Arriving,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Terminal states permit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Lowercase name used in messages and change descriptions
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Placed => "placed",
            Self::Accepted => "accepted",
            Self::Packed => "packed",
            Self::Assigned => "assigned",
            Self::Arriving => "arriving",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How an item is sold, resolved once at order creation
///
/// Loose products are priced by weight/volume, packed products by unit
/// count. Resolving this to a tagged union up front removes repeated
/// fallback lookups against the catalog later in the lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    /// Fixed units, priced by count
    Packed { count: u32 },
    /// Variable weight/volume, priced by quantity
    Loose {
        count: u32,
        quantity: Decimal,
        unit: String,
    },
}

/// A line item on an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// Product ID (must reference a product that existed at creation)
    pub product_id: String,
    /// Product name snapshot
    pub name: String,
    /// Unit price snapshot (per unit for packed, per quantity unit for loose)
    pub unit_price: Decimal,
    /// Resolved sale form
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl OrderItem {
    /// Unit count of this item (loose items carry a count as well,
    /// e.g. two 1.5kg bags)
    pub fn count(&self) -> u32 {
        match &self.kind {
            ItemKind::Packed { count } => *count,
            ItemKind::Loose { count, .. } => *count,
        }
    }

    /// Whether this item is sold loose
    pub fn is_loose(&self) -> bool {
        matches!(self.kind, ItemKind::Loose { .. })
    }

    /// Line total: `unit_price × quantity` for loose, `unit_price × count`
    /// for packed
    pub fn line_total(&self) -> Decimal {
        match &self.kind {
            ItemKind::Packed { count } => self.unit_price * Decimal::from(*count),
            ItemKind::Loose { quantity, .. } => self.unit_price * *quantity,
        }
    }
}

/// Append-only status history entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub timestamp: i64,
}

/// Append-only modification history entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModificationEntry {
    /// Branch that made the modification
    pub modified_by: String,
    /// Human-readable diffs, e.g. `"Removed Apples (3x)"`
    pub changes: Vec<String>,
    pub timestamp: i64,
}

/// Geographic snapshot taken at order creation (not live-updated)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Order aggregate root
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Order ID (assigned by server)
    pub id: String,
    /// Human-readable order number, monotonic across all branches
    pub order_number: String,
    /// Monotonic sequence backing the order number
    pub sequence: u64,
    /// Customer who placed the order
    pub customer_id: String,
    /// Branch that fulfils the order
    pub branch_id: String,
    /// Delivery partner, set at assignment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_partner_id: Option<String>,
    /// Line items
    pub items: Vec<OrderItem>,
    /// Current lifecycle status
    pub status: OrderStatus,
    /// Append-only status log
    pub status_history: Vec<StatusEntry>,
    /// Derived total, recomputed on every modification
    pub total_price: Decimal,
    /// Fixed at creation from branch capability + partner availability
    pub delivery_enabled: bool,
    /// Append-only modification log
    #[serde(default)]
    pub modification_history: Vec<ModificationEntry>,
    /// True only for pickup orders marked collected by the customer
    #[serde(default)]
    pub manually_collected: bool,
    /// Delivery destination snapshot (delivery orders)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_location: Option<Location>,
    /// Branch pickup location snapshot
    pub pickup_location: Location,
    /// Creation timestamp (unix millis)
    pub created_at: i64,
    /// Last update timestamp (unix millis)
    pub updated_at: i64,
}

impl Order {
    /// Recompute the total strictly from current items
    pub fn recompute_total(&self) -> Decimal {
        self.items.iter().map(|item| item.line_total()).sum()
    }

    /// Append a status entry and advance the current status
    pub fn push_status(&mut self, status: OrderStatus, timestamp: i64) {
        self.status = status;
        self.status_history.push(StatusEntry { status, timestamp });
        self.updated_at = timestamp;
    }
}
