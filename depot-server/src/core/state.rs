use chrono_tz::Tz;
use shared::error::{AppError, AppResult};
use std::sync::Arc;

use crate::core::Config;
use crate::directory::{MemoryBranchDirectory, MemoryPartnerDirectory, MemoryProductCatalog};
use crate::dispatch::AssignmentSelector;
use crate::fanout::RoomBus;
use crate::gate::BranchGate;
use crate::orders::OrderManager;
use crate::storage::CoreStorage;
use crate::wallet::WalletLedger;

/// Server state holding shared references to every service
///
/// Cloning is shallow; everything inside is behind an `Arc`.
///
/// | Field | Purpose |
/// |-------|---------|
/// | config | Immutable configuration |
/// | storage | Order/wallet persistence (redb) |
/// | bus | Room-scoped event fanout |
/// | catalog / branches / partners | Directory services |
/// | ledger | Per-branch wallet ledger |
/// | orders | Order lifecycle commands |
/// | gate | Branch operational gate + sweep |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub storage: Arc<CoreStorage>,
    pub bus: Arc<RoomBus>,
    pub catalog: Arc<MemoryProductCatalog>,
    pub branches: Arc<MemoryBranchDirectory>,
    pub partners: Arc<MemoryPartnerDirectory>,
    pub selector: Arc<AssignmentSelector>,
    pub ledger: Arc<WalletLedger>,
    pub orders: Arc<OrderManager>,
    pub gate: Arc<BranchGate>,
}

impl ServerState {
    /// Build the full service graph from configuration
    ///
    /// Creates the working directory and opens the database, then wires
    /// every service with explicit dependencies; no service reaches for
    /// globals.
    pub fn initialize(config: Config) -> AppResult<Self> {
        std::fs::create_dir_all(&config.work_dir)
            .map_err(|e| AppError::internal(format!("cannot create work dir: {}", e)))?;
        let storage = Arc::new(CoreStorage::open(config.database_path())?);
        Self::with_storage(config, storage)
    }

    /// Wire the service graph around an existing storage handle
    ///
    /// Tests use this with in-memory storage.
    pub fn with_storage(config: Config, storage: Arc<CoreStorage>) -> AppResult<Self> {
        let bus = Arc::new(RoomBus::with_capacity(config.fanout_channel_capacity));
        let catalog = Arc::new(MemoryProductCatalog::new());
        let branches = Arc::new(MemoryBranchDirectory::new());
        let partners = Arc::new(MemoryPartnerDirectory::new());

        let selector = Arc::new(AssignmentSelector::new(
            branches.clone(),
            partners.clone(),
        ));
        let ledger = Arc::new(WalletLedger::new(storage.clone(), bus.clone()));
        let orders = Arc::new(OrderManager::new(
            storage.clone(),
            bus.clone(),
            catalog.clone(),
            branches.clone(),
            partners.clone(),
            selector.clone(),
            ledger.clone(),
        ));
        let gate = Arc::new(BranchGate::new(
            branches.clone(),
            ledger.clone(),
            bus.clone(),
            config.min_wallet_balance,
        ));

        Ok(Self {
            config,
            storage,
            bus,
            catalog,
            branches,
            partners,
            selector,
            ledger,
            orders,
            gate,
        })
    }

    /// Parse the configured sweep timezone
    pub fn sweep_timezone(&self) -> AppResult<Tz> {
        self.config
            .timezone
            .parse()
            .map_err(|_| AppError::validation(format!("invalid timezone {}", self.config.timezone)))
    }
}
