//! External collaborator interfaces
//!
//! The core does not own products, branches or delivery partners; it
//! consumes them through these traits. Production deployments back them
//! with the platform directory service; tests and the bundled in-process
//! server use the [`memory`] implementations.

mod memory;

pub use memory::{MemoryBranchDirectory, MemoryPartnerDirectory, MemoryProductCatalog};

use async_trait::async_trait;
use shared::error::AppResult;
use shared::models::{Branch, DeliveryPartner, Product, StoreStatusEntry};

/// Product lookup and the out-of-stock disable hook
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Resolve a product by id
    async fn find_by_id(&self, id: &str) -> AppResult<Product>;

    /// Disable products a branch omitted while packing
    ///
    /// Best-effort: callers log and swallow failures, the primary
    /// command never fails on this.
    async fn disable(&self, ids: &[String], branch_id: &str, reason: &str) -> AppResult<()>;
}

/// Branch lookup and store status writes
#[async_trait]
pub trait BranchDirectory: Send + Sync {
    /// Resolve a branch by id
    async fn find_by_id(&self, id: &str) -> AppResult<Branch>;

    /// All branches whose store is currently open
    async fn find_open(&self) -> AppResult<Vec<Branch>>;

    /// Set the store status, appending the given history entry
    async fn set_store_status(&self, branch_id: &str, entry: StoreStatusEntry) -> AppResult<()>;
}

/// Delivery partner lookup and current-order bookkeeping
#[async_trait]
pub trait PartnerDirectory: Send + Sync {
    /// Resolve a partner by id
    async fn find_by_id(&self, id: &str) -> AppResult<DeliveryPartner>;

    /// All partners registered with a branch, regardless of availability
    async fn find_by_branch(&self, branch_id: &str) -> AppResult<Vec<DeliveryPartner>>;

    /// Approved and available partners for a branch, up to `limit`
    async fn find_available(&self, branch_id: &str, limit: usize)
    -> AppResult<Vec<DeliveryPartner>>;

    /// Add an order to a partner's in-flight set
    async fn add_current_order(&self, partner_id: &str, order_id: &str) -> AppResult<()>;

    /// Remove an order from a partner's in-flight set
    ///
    /// Restores availability when the set becomes empty.
    async fn remove_current_order(&self, partner_id: &str, order_id: &str) -> AppResult<()>;
}
