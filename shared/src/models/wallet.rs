//! Branch wallet and its transaction log
//!
//! One wallet per branch, created lazily on first access. The balance is
//! maintained as the running sum of the append-only transaction log;
//! every mutation is an increment-and-append inside one storage
//! transaction, never a read-modify-write of the balance alone.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Wallet transaction type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Platform fee deducted on delivery completion (negative amount)
    PlatformCharge,
    /// Top-up from the payment gateway or manual credit (positive amount)
    Payment,
}

/// Append-only wallet transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletTransaction {
    /// Transaction ID
    pub id: String,
    /// Order the charge refers to (charges only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// Signed amount: charges negative, payments positive
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// External payment reference from the gateway (payments only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_payment_id: Option<String>,
    pub timestamp: i64,
}

/// Per-branch wallet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Wallet {
    /// Owning branch (unique key)
    pub branch_id: String,
    /// Signed balance, may go negative
    pub balance: Decimal,
    /// Append-only ordered transaction log
    pub transactions: Vec<WalletTransaction>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Wallet {
    /// Fresh wallet with zero balance
    pub fn new(branch_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            branch_id: branch_id.into(),
            balance: Decimal::ZERO,
            transactions: Vec::new(),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Balance recomputed by replaying the transaction log
    ///
    /// Invariant: always equals `balance`.
    pub fn replay_balance(&self) -> Decimal {
        self.transactions.iter().map(|tx| tx.amount).sum()
    }
}

/// Read-only wallet aggregates derived from the transaction log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletStatistics {
    /// Sum of all charge amounts (negative)
    pub total_charges: Decimal,
    /// Sum of all payment amounts (positive)
    pub total_payments: Decimal,
    /// `total_payments + total_charges`
    pub net: Decimal,
    pub transaction_count: usize,
}
