//! In-memory directory implementations
//!
//! Used by the in-process server and by tests. Backed by `DashMap` so
//! concurrent request handlers and the sweep can read and write without
//! a global lock.

use async_trait::async_trait;
use dashmap::DashMap;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Branch, DeliveryPartner, Product, StoreStatus, StoreStatusEntry};

use super::{BranchDirectory, PartnerDirectory, ProductCatalog};

/// In-memory product catalog
#[derive(Debug, Default)]
pub struct MemoryProductCatalog {
    products: DashMap<String, Product>,
}

impl MemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product
    pub fn upsert(&self, product: Product) {
        self.products.insert(product.id.clone(), product);
    }

    /// Ids of currently disabled products (test inspection)
    pub fn disabled_ids(&self) -> Vec<String> {
        self.products
            .iter()
            .filter(|entry| entry.disabled)
            .map(|entry| entry.id.clone())
            .collect()
    }
}

#[async_trait]
impl ProductCatalog for MemoryProductCatalog {
    async fn find_by_id(&self, id: &str) -> AppResult<Product> {
        self.products
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| {
                AppError::with_message(ErrorCode::ProductNotFound, format!("Product {} not found", id))
                    .with_detail("product_id", id)
            })
    }

    async fn disable(&self, ids: &[String], branch_id: &str, reason: &str) -> AppResult<()> {
        for id in ids {
            if let Some(mut product) = self.products.get_mut(id) {
                product.disabled = true;
            }
        }
        tracing::info!(
            branch_id = %branch_id,
            count = ids.len(),
            reason = %reason,
            "Products disabled"
        );
        Ok(())
    }
}

/// In-memory branch directory
#[derive(Debug, Default)]
pub struct MemoryBranchDirectory {
    branches: DashMap<String, Branch>,
}

impl MemoryBranchDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a branch
    pub fn upsert(&self, branch: Branch) {
        self.branches.insert(branch.id.clone(), branch);
    }
}

#[async_trait]
impl BranchDirectory for MemoryBranchDirectory {
    async fn find_by_id(&self, id: &str) -> AppResult<Branch> {
        self.branches
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| {
                AppError::with_message(ErrorCode::BranchNotFound, format!("Branch {} not found", id))
                    .with_detail("branch_id", id)
            })
    }

    async fn find_open(&self) -> AppResult<Vec<Branch>> {
        Ok(self
            .branches
            .iter()
            .filter(|entry| entry.store_status == StoreStatus::Open)
            .map(|entry| entry.clone())
            .collect())
    }

    async fn set_store_status(&self, branch_id: &str, entry: StoreStatusEntry) -> AppResult<()> {
        let mut branch = self.branches.get_mut(branch_id).ok_or_else(|| {
            AppError::with_message(
                ErrorCode::BranchNotFound,
                format!("Branch {} not found", branch_id),
            )
        })?;
        branch.push_store_status(entry.status, entry.reason, entry.automatic, entry.timestamp);
        Ok(())
    }
}

/// In-memory delivery partner directory
#[derive(Debug, Default)]
pub struct MemoryPartnerDirectory {
    partners: DashMap<String, DeliveryPartner>,
}

impl MemoryPartnerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a partner
    pub fn upsert(&self, partner: DeliveryPartner) {
        self.partners.insert(partner.id.clone(), partner);
    }
}

#[async_trait]
impl PartnerDirectory for MemoryPartnerDirectory {
    async fn find_by_id(&self, id: &str) -> AppResult<DeliveryPartner> {
        self.partners
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::PartnerNotFound,
                    format!("Delivery partner {} not found", id),
                )
                .with_detail("partner_id", id)
            })
    }

    async fn find_by_branch(&self, branch_id: &str) -> AppResult<Vec<DeliveryPartner>> {
        Ok(self
            .partners
            .iter()
            .filter(|entry| entry.branch_id == branch_id)
            .map(|entry| entry.clone())
            .collect())
    }

    async fn find_available(
        &self,
        branch_id: &str,
        limit: usize,
    ) -> AppResult<Vec<DeliveryPartner>> {
        Ok(self
            .partners
            .iter()
            .filter(|entry| entry.branch_id == branch_id && entry.is_eligible())
            .take(limit)
            .map(|entry| entry.clone())
            .collect())
    }

    async fn add_current_order(&self, partner_id: &str, order_id: &str) -> AppResult<()> {
        let mut partner = self.partners.get_mut(partner_id).ok_or_else(|| {
            AppError::with_message(
                ErrorCode::PartnerNotFound,
                format!("Delivery partner {} not found", partner_id),
            )
        })?;
        if !partner.current_orders.iter().any(|id| id == order_id) {
            partner.current_orders.push(order_id.to_string());
        }
        Ok(())
    }

    async fn remove_current_order(&self, partner_id: &str, order_id: &str) -> AppResult<()> {
        let mut partner = self.partners.get_mut(partner_id).ok_or_else(|| {
            AppError::with_message(
                ErrorCode::PartnerNotFound,
                format!("Delivery partner {} not found", partner_id),
            )
        })?;
        partner.current_orders.retain(|id| id != order_id);
        if partner.current_orders.is_empty() {
            partner.availability = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ApprovalStatus, Location};

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

    #[tokio::test]
    async fn test_find_available_filters_eligibility() {
        let directory = MemoryPartnerDirectory::new();
        directory.upsert(partner("dp-1", "b-1", true));
        directory.upsert(partner("dp-2", "b-1", false));
        directory.upsert(partner("dp-3", "b-2", true));

        let available = directory.find_available("b-1", 10).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, "dp-1");
    }

    #[tokio::test]
    async fn test_remove_current_order_restores_availability() {
        let directory = MemoryPartnerDirectory::new();
        let mut p = partner("dp-1", "b-1", true);
        p.availability = false;
        p.current_orders.push("o-1".to_string());
        p.current_orders.push("o-2".to_string());
        directory.upsert(p);

        directory.remove_current_order("dp-1", "o-1").await.unwrap();
        assert!(!directory.find_by_id("dp-1").await.unwrap().availability);

        directory.remove_current_order("dp-1", "o-2").await.unwrap();
        let restored = directory.find_by_id("dp-1").await.unwrap();
        assert!(restored.availability);
        assert!(restored.current_orders.is_empty());
    }

    #[tokio::test]
    async fn test_disable_marks_products() {
        let catalog = MemoryProductCatalog::new();
        catalog.upsert(Product {
            id: "p-1".to_string(),
            name: "Apples".to_string(),
            branch_id: "b-1".to_string(),
            price: rust_decimal::Decimal::from(50),
            is_loose: false,
            unit: "unit".to_string(),
            disabled: false,
        });

        catalog
            .disable(&["p-1".to_string()], "b-1", "out of stock")
            .await
            .unwrap();
        assert_eq!(catalog.disabled_ids(), vec!["p-1".to_string()]);
    }

    #[tokio::test]
    async fn test_set_store_status_appends_history() {
        let directory = MemoryBranchDirectory::new();
        directory.upsert(Branch {
            id: "b-1".to_string(),
            name: "Greenmart".to_string(),
            phone: None,
            approval_status: ApprovalStatus::Approved,
            store_status: StoreStatus::Open,
            delivery_service_available: true,
            status_history: Vec::new(),
            location: Location {
                latitude: 0.0,
                longitude: 0.0,
                address: None,
            },
        });

        directory
            .set_store_status(
                "b-1",
                StoreStatusEntry {
                    status: StoreStatus::Closed,
                    reason: "balance below threshold".to_string(),
                    automatic: true,
                    timestamp: 1,
                },
            )
            .await
            .unwrap();

        let branch = directory.find_by_id("b-1").await.unwrap();
        assert_eq!(branch.store_status, StoreStatus::Closed);
        assert_eq!(branch.status_history.len(), 1);
        assert!(branch.status_history[0].automatic);
    }
}
