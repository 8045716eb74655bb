//! Branch (store) model
//!
//! Branches are owned by the platform directory, not by the order core;
//! the core reads approval status and capability, and flips the store
//! open/closed through the operational gate.

use super::order::Location;
use serde::{Deserialize, Serialize};

/// Platform approval status for branches and delivery partners
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Whether the store is accepting orders
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreStatus {
    Open,
    Closed,
}

/// Open/close history entry, flagged manual vs automatic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreStatusEntry {
    pub status: StoreStatus,
    pub reason: String,
    /// True when written by the auto-close sweep rather than an operator
    pub automatic: bool,
    pub timestamp: i64,
}

/// Branch record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Branch {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub approval_status: ApprovalStatus,
    pub store_status: StoreStatus,
    /// Whether this branch offers delivery at all
    pub delivery_service_available: bool,
    /// Append-only open/close log
    #[serde(default)]
    pub status_history: Vec<StoreStatusEntry>,
    pub location: Location,
}

impl Branch {
    /// Append an open/close entry and set the current store status
    pub fn push_store_status(
        &mut self,
        status: StoreStatus,
        reason: impl Into<String>,
        automatic: bool,
        timestamp: i64,
    ) {
        self.store_status = status;
        self.status_history.push(StoreStatusEntry {
            status,
            reason: reason.into(),
            automatic,
            timestamp,
        });
    }
}
