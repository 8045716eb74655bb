//! Depot Server - multi-tenant grocery delivery backend core
//!
//! # Architecture overview
//!
//! - **Orders** (`orders`): lifecycle state machine with atomic
//!   transitions and append-only history
//! - **Wallets** (`wallet`): per-branch ledger, balance always equals
//!   the transaction log sum
//! - **Charges** (`charges`): tiered platform fee on delivered orders
//! - **Gate** (`gate`): branch operational gate and the daily balance
//!   sweep
//! - **Fanout** (`fanout`): room-scoped event broadcast
//! - **Directory** (`directory`): product/branch/partner collaborator
//!   interfaces
//!
//! # Module layout
//!
//! ```text
//! depot-server/src/
//! ├── core/       # config, state, background tasks
//! ├── auth/       # principal and role gates
//! ├── orders/     # lifecycle commands + modification validator
//! ├── wallet/     # branch wallet ledger
//! ├── charges/    # platform charge tiers
//! ├── dispatch/   # delivery availability
//! ├── gate/       # operational gate + daily sweep
//! ├── fanout/     # room bus
//! ├── directory/  # external collaborator traits
//! ├── storage.rs  # redb persistence
//! └── utils/      # logger, time
//! ```

pub mod auth;
pub mod charges;
pub mod core;
pub mod directory;
pub mod dispatch;
pub mod fanout;
pub mod gate;
pub mod orders;
pub mod storage;
pub mod utils;
pub mod wallet;

pub use auth::{Principal, Role};
pub use core::{BackgroundTasks, Config, ServerState, TaskKind};
pub use dispatch::AssignmentSelector;
pub use fanout::{EventFanout, RoomBus};
pub use gate::BranchGate;
pub use orders::{CreateOrderRequest, OrderManager, ProposedItem};
pub use storage::CoreStorage;
pub use wallet::WalletLedger;

// Re-export unified error types from shared
pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
