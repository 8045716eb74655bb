//! Delivery availability
//!
//! Answers "can this branch deliver right now". Evaluated once at order
//! creation (snapshot, stored on the order as `delivery_enabled`) and
//! exposed as a live query for clients. The two answers may legitimately
//! diverge after creation since partner availability is dynamic.

use shared::error::AppResult;
use std::sync::Arc;

use crate::directory::{BranchDirectory, PartnerDirectory};

pub struct AssignmentSelector {
    branches: Arc<dyn BranchDirectory>,
    partners: Arc<dyn PartnerDirectory>,
}

impl AssignmentSelector {
    pub fn new(branches: Arc<dyn BranchDirectory>, partners: Arc<dyn PartnerDirectory>) -> Self {
        Self { branches, partners }
    }

    /// Whether the branch offers delivery and has at least one approved,
    /// available partner
    pub async fn is_delivery_available(&self, branch_id: &str) -> AppResult<bool> {
        let branch = self.branches.find_by_id(branch_id).await?;
        if !branch.delivery_service_available {
            return Ok(false);
        }
        let available = self.partners.find_available(branch_id, 1).await?;
        Ok(!available.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{MemoryBranchDirectory, MemoryPartnerDirectory};
    use shared::models::{ApprovalStatus, Branch, DeliveryPartner, Location, StoreStatus};

    fn branch(id: &str, delivery: bool) -> Branch {
        Branch {
            id: id.to_string(),
            name: id.to_string(),
            phone: None,
            approval_status: ApprovalStatus::Approved,
            store_status: StoreStatus::Open,
            delivery_service_available: delivery,
            status_history: Vec::new(),
            location: Location {
                latitude: 0.0,
                longitude: 0.0,
                address: None,
            },
        }
    }

    fn partner(id: &str, branch_id: &str, available: bool) -> DeliveryPartner {
        DeliveryPartner {
            id: id.to_string(),
            name: id.to_string(),
            branch_id: branch_id.to_string(),
            status: ApprovalStatus::Approved,
            availability: available,
            current_orders: Vec::new(),
        }
    }

    fn selector() -> (
        AssignmentSelector,
        Arc<MemoryBranchDirectory>,
        Arc<MemoryPartnerDirectory>,
    ) {
        let branches = Arc::new(MemoryBranchDirectory::new());
        let partners = Arc::new(MemoryPartnerDirectory::new());
        (
            AssignmentSelector::new(branches.clone(), partners.clone()),
            branches,
            partners,
        )
    }

    #[tokio::test]
    async fn test_requires_branch_capability() {
        let (selector, branches, partners) = selector();
        branches.upsert(branch("b-1", false));
        partners.upsert(partner("dp-1", "b-1", true));

        assert!(!selector.is_delivery_available("b-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_requires_an_available_partner() {
        let (selector, branches, partners) = selector();
        branches.upsert(branch("b-1", true));
        assert!(!selector.is_delivery_available("b-1").await.unwrap());

        partners.upsert(partner("dp-1", "b-1", false));
        assert!(!selector.is_delivery_available("b-1").await.unwrap());

        partners.upsert(partner("dp-2", "b-1", true));
        assert!(selector.is_delivery_available("b-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_unapproved_partner_does_not_count() {
        let (selector, branches, partners) = selector();
        branches.upsert(branch("b-1", true));
        let mut p = partner("dp-1", "b-1", true);
        p.status = ApprovalStatus::Pending;
        partners.upsert(p);

        assert!(!selector.is_delivery_available("b-1").await.unwrap());
    }
}
