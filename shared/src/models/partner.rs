//! Delivery partner model

use super::branch::ApprovalStatus;
use serde::{Deserialize, Serialize};

/// Delivery partner record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryPartner {
    pub id: String,
    pub name: String,
    /// Branch this partner delivers for
    pub branch_id: String,
    pub status: ApprovalStatus,
    /// Whether the partner is currently taking new assignments
    pub availability: bool,
    /// In-flight order ids assigned to this partner
    #[serde(default)]
    pub current_orders: Vec<String>,
}

impl DeliveryPartner {
    /// Eligible to receive a new assignment
    pub fn is_eligible(&self) -> bool {
        self.status == ApprovalStatus::Approved && self.availability
    }
}
