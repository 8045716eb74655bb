//! Branch operational gate
//!
//! A branch may trade only while it is approved and its wallet balance
//! is above the minimum. The gate answers that question on demand, arms
//! manual open/close, and hosts the daily sweep that force-closes stores
//! whose balance has sunk below the threshold.

pub mod sweep;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::message::{FanoutEvent, RoomKey};
use shared::models::{ApprovalStatus, Branch, StoreStatus, StoreStatusEntry};
use std::sync::Arc;

use crate::directory::BranchDirectory;
use crate::fanout::EventFanout;
use crate::utils::now_millis;
use crate::wallet::WalletLedger;

/// Balance floor, in currency units. A branch whose wallet drops to or
/// below this stops being allowed to trade.
pub const DEFAULT_MINIMUM_BALANCE: i64 = -100;

/// Answer to "may this branch operate right now"
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationalStatus {
    pub can_operate: bool,
    /// Present when `can_operate` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub balance: Decimal,
}

/// Outcome of one sweep run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    /// Open branches inspected
    pub inspected: usize,
    /// Branches force-closed for insufficient balance
    pub closed: Vec<String>,
}

pub struct BranchGate {
    branches: Arc<dyn BranchDirectory>,
    ledger: Arc<WalletLedger>,
    fanout: Arc<dyn EventFanout>,
    minimum_balance: Decimal,
}

impl BranchGate {
    pub fn new(
        branches: Arc<dyn BranchDirectory>,
        ledger: Arc<WalletLedger>,
        fanout: Arc<dyn EventFanout>,
        minimum_balance: Decimal,
    ) -> Self {
        Self {
            branches,
            ledger,
            fanout,
            minimum_balance,
        }
    }

    /// Evaluate whether a branch may operate
    pub async fn operational_status(&self, branch_id: &str) -> AppResult<OperationalStatus> {
        let branch = self.branches.find_by_id(branch_id).await?;
        let balance = self.ledger.balance(branch_id)?;
        Ok(self.evaluate(&branch, balance))
    }

    fn evaluate(&self, branch: &Branch, balance: Decimal) -> OperationalStatus {
        if branch.approval_status != ApprovalStatus::Approved {
            return OperationalStatus {
                can_operate: false,
                reason: Some("branch is not approved".to_string()),
                balance,
            };
        }
        if balance <= self.minimum_balance {
            return OperationalStatus {
                can_operate: false,
                reason: Some(format!(
                    "wallet balance {} is at or below the minimum of {}",
                    balance, self.minimum_balance
                )),
                balance,
            };
        }
        OperationalStatus {
            can_operate: true,
            reason: None,
            balance,
        }
    }

    /// Open the store, re-checking the gate first
    pub async fn attempt_open(&self, branch_id: &str) -> AppResult<OperationalStatus> {
        let branch = self.branches.find_by_id(branch_id).await?;
        let balance = self.ledger.balance(branch_id)?;
        let status = self.evaluate(&branch, balance);
        if !status.can_operate {
            let code = if branch.approval_status != ApprovalStatus::Approved {
                ErrorCode::BranchNotApproved
            } else {
                ErrorCode::BranchBelowMinimumBalance
            };
            return Err(
                AppError::with_message(code, status.reason.clone().unwrap_or_default())
                    .with_detail("branch_id", branch_id)
                    .with_detail("balance", status.balance.to_string()),
            );
        }

        self.branches
            .set_store_status(
                branch_id,
                StoreStatusEntry {
                    status: StoreStatus::Open,
                    reason: "opened by branch".to_string(),
                    automatic: false,
                    timestamp: now_millis(),
                },
            )
            .await?;
        tracing::info!(branch_id = %branch_id, balance = %status.balance, "Store opened");
        Ok(status)
    }

    /// Close the store manually
    pub async fn close_store(&self, branch_id: &str) -> AppResult<()> {
        self.branches
            .set_store_status(
                branch_id,
                StoreStatusEntry {
                    status: StoreStatus::Closed,
                    reason: "closed by branch".to_string(),
                    automatic: false,
                    timestamp: now_millis(),
                },
            )
            .await?;
        tracing::info!(branch_id = %branch_id, "Store closed");
        Ok(())
    }

    /// One sweep pass over all open branches
    ///
    /// Reads wallet state written asynchronously by order delivery, so a
    /// branch can be solvent at open time and insolvent by the time the
    /// sweep runs; that is the race this pass exists to settle.
    pub async fn run_sweep(&self) -> AppResult<SweepReport> {
        let open_branches = self.branches.find_open().await?;
        let mut report = SweepReport {
            inspected: open_branches.len(),
            ..Default::default()
        };

        for branch in open_branches {
            let balance = match self.ledger.balance(&branch.id) {
                Ok(balance) => balance,
                Err(err) => {
                    tracing::warn!(branch_id = %branch.id, error = %err, "Sweep balance read failed");
                    continue;
                }
            };
            if balance > self.minimum_balance {
                continue;
            }

            let reason = format!(
                "automatically closed: balance {} at or below minimum {}",
                balance, self.minimum_balance
            );
            if let Err(err) = self
                .branches
                .set_store_status(
                    &branch.id,
                    StoreStatusEntry {
                        status: StoreStatus::Closed,
                        reason: reason.clone(),
                        automatic: true,
                        timestamp: now_millis(),
                    },
                )
                .await
            {
                tracing::warn!(branch_id = %branch.id, error = %err, "Sweep close failed");
                continue;
            }

            tracing::warn!(branch_id = %branch.id, balance = %balance, "Store force-closed by sweep");
            let event = FanoutEvent::StoreAutoClosed {
                branch_id: branch.id.clone(),
                reason,
                balance,
            };
            self.fanout
                .publish(RoomKey::Branch(branch.id.clone()), event.clone());
            self.fanout.publish(RoomKey::Admin, event);
            report.closed.push(branch.id);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryBranchDirectory;
    use crate::fanout::RecordingFanout;
    use crate::storage::CoreStorage;
    use shared::models::Location;

    struct Harness {
        gate: BranchGate,
        branches: Arc<MemoryBranchDirectory>,
        ledger: Arc<WalletLedger>,
        fanout: Arc<RecordingFanout>,
    }

    fn harness() -> Harness {
        let storage = Arc::new(CoreStorage::open_in_memory().unwrap());
        let fanout: Arc<RecordingFanout> = Arc::new(RecordingFanout::new());
        let branches = Arc::new(MemoryBranchDirectory::new());
        let ledger = Arc::new(WalletLedger::new(storage, fanout.clone()));
        Harness {
            gate: BranchGate::new(
                branches.clone(),
                ledger.clone(),
                fanout.clone(),
                Decimal::from(DEFAULT_MINIMUM_BALANCE),
            ),
            branches,
            ledger,
            fanout,
        }
    }

    fn branch(id: &str, approval: ApprovalStatus, store: StoreStatus) -> Branch {
        Branch {
            id: id.to_string(),
            name: id.to_string(),
            phone: None,
            approval_status: approval,
            store_status: store,
            delivery_service_available: true,
            status_history: Vec::new(),
            location: Location {
                latitude: 0.0,
                longitude: 0.0,
                address: None,
            },
        }
    }

    fn set_balance(h: &Harness, branch_id: &str, amount: i64) {
        if amount > 0 {
            h.ledger
                .apply_payment(branch_id, Decimal::from(amount), None)
                .unwrap();
        } else if amount < 0 {
            // drive the balance down through charges of -2 each
            for _ in 0..(-amount / 2) {
                h.ledger
                    .apply_charge(branch_id, "o-x", Decimal::from(500))
                    .unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_operational_status_gates_on_approval_and_balance() {
        let h = harness();
        h.branches
            .upsert(branch("b-1", ApprovalStatus::Approved, StoreStatus::Closed));

        let status = h.gate.operational_status("b-1").await.unwrap();
        assert!(status.can_operate);

        set_balance(&h, "b-1", -150);
        let status = h.gate.operational_status("b-1").await.unwrap();
        assert!(!status.can_operate);
        assert_eq!(status.balance, Decimal::from(-150));
        assert!(status.reason.unwrap().contains("-150"));

        h.branches
            .upsert(branch("b-2", ApprovalStatus::Pending, StoreStatus::Closed));
        let status = h.gate.operational_status("b-2").await.unwrap();
        assert!(!status.can_operate);
        assert!(status.reason.unwrap().contains("approved"));
    }

    #[tokio::test]
    async fn test_balance_exactly_at_minimum_blocks() {
        let h = harness();
        h.branches
            .upsert(branch("b-1", ApprovalStatus::Approved, StoreStatus::Closed));
        set_balance(&h, "b-1", -100);

        let status = h.gate.operational_status("b-1").await.unwrap();
        assert!(!status.can_operate);
    }

    #[tokio::test]
    async fn test_attempt_open_rejects_below_minimum() {
        let h = harness();
        h.branches
            .upsert(branch("b-1", ApprovalStatus::Approved, StoreStatus::Closed));
        set_balance(&h, "b-1", -150);

        let err = h.gate.attempt_open("b-1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BranchBelowMinimumBalance);

        let branch = h.branches.find_by_id("b-1").await.unwrap();
        assert_eq!(branch.store_status, StoreStatus::Closed);
    }

    #[tokio::test]
    async fn test_attempt_open_rejects_unapproved() {
        let h = harness();
        h.branches
            .upsert(branch("b-1", ApprovalStatus::Rejected, StoreStatus::Closed));

        let err = h.gate.attempt_open("b-1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BranchNotApproved);
    }

    #[tokio::test]
    async fn test_attempt_open_sets_status_with_history() {
        let h = harness();
        h.branches
            .upsert(branch("b-1", ApprovalStatus::Approved, StoreStatus::Closed));

        h.gate.attempt_open("b-1").await.unwrap();
        let branch = h.branches.find_by_id("b-1").await.unwrap();
        assert_eq!(branch.store_status, StoreStatus::Open);
        assert_eq!(branch.status_history.len(), 1);
        assert!(!branch.status_history[0].automatic);
    }

    #[tokio::test]
    async fn test_sweep_closes_insolvent_open_branches() {
        let h = harness();
        h.branches
            .upsert(branch("b-1", ApprovalStatus::Approved, StoreStatus::Open));
        h.branches
            .upsert(branch("b-2", ApprovalStatus::Approved, StoreStatus::Open));
        h.branches
            .upsert(branch("b-3", ApprovalStatus::Approved, StoreStatus::Closed));
        set_balance(&h, "b-1", -150);
        set_balance(&h, "b-2", 50);
        set_balance(&h, "b-3", -150);

        let report = h.gate.run_sweep().await.unwrap();
        assert_eq!(report.inspected, 2);
        assert_eq!(report.closed, vec!["b-1".to_string()]);

        let closed = h.branches.find_by_id("b-1").await.unwrap();
        assert_eq!(closed.store_status, StoreStatus::Closed);
        assert!(closed.status_history.last().unwrap().automatic);

        // solvent and already-closed branches untouched
        assert_eq!(
            h.branches.find_by_id("b-2").await.unwrap().store_status,
            StoreStatus::Open
        );

        assert!(h.fanout.was_published(&RoomKey::Branch("b-1".into()), "storeAutoClosed"));
        assert!(h.fanout.was_published(&RoomKey::Admin, "storeAutoClosed"));
    }
}
