//! Product catalog entry
//!
//! The catalog itself is external to the core; this is the projection the
//! core reads at order-creation time and the record it disables when a
//! branch omits an item during packing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product as seen by the order core
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Branch listing this product
    pub branch_id: String,
    /// Price per unit (packed) or per quantity unit (loose)
    pub price: Decimal,
    /// Sold by variable weight/volume rather than unit count
    pub is_loose: bool,
    /// Quantity unit for loose products, e.g. "kg"
    pub unit: String,
    /// Disabled products cannot be ordered
    #[serde(default)]
    pub disabled: bool,
}
