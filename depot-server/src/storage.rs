//! redb-based storage layer for orders and wallets
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Order aggregates |
//! | `wallets` | `branch_id` | `Wallet` | Per-branch wallet + transaction log |
//! | `counters` | `&str` | `u64` | Order sequence counter |
//!
//! # Atomicity
//!
//! redb serializes writers, so each write transaction is an atomic unit:
//! an order transition (mutation + history append + sequence bump) either
//! fully commits or leaves nothing behind. Wallet mutations run in their
//! own write transaction — the increment-and-append happens inside one
//! commit, never as a read-balance-then-write-balance across commits.
//!
//! # Durability
//!
//! redb commits are persistent as soon as `commit()` returns (copy-on-
//! write with atomic pointer swap), so a crash mid-command never leaves a
//! half-applied transition.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::error::{AppError, ErrorCode};
use shared::models::{Order, Wallet};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Table for wallets: key = branch_id, value = JSON-serialized Wallet
const WALLETS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("wallets");

/// Table for counters: key = counter name, value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

/// Branch-independent order sequence counter key
const ORDER_SEQ_KEY: &str = "order_seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, format!("Order {} not found", id))
                    .with_detail("order_id", id)
            }
            StorageError::Serialization(e) => AppError::internal(e.to_string()),
            other => AppError::storage(other.to_string()),
        }
    }
}

/// Order and wallet storage backed by redb
#[derive(Clone)]
pub struct CoreStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for CoreStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreStorage").finish()
    }
}

impl CoreStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests, demos)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(WALLETS_TABLE)?;
            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            if counters.get(ORDER_SEQ_KEY)?.is_none() {
                counters.insert(ORDER_SEQ_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Order sequence ==========

    /// Increment and return the order sequence (within transaction)
    ///
    /// Allocated in the same transaction as the order insert so a failed
    /// creation never burns a visible number out of order.
    pub fn next_order_sequence(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let current = table
            .get(ORDER_SEQ_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(ORDER_SEQ_KEY, next)?;
        Ok(next)
    }

    /// Get current order sequence (read-only)
    pub fn current_order_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COUNTERS_TABLE)?;
        Ok(table
            .get(ORDER_SEQ_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    // ========== Order operations ==========

    /// Store an order (within transaction)
    pub fn store_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Load an order (within transaction)
    ///
    /// Used by commands so the read and the subsequent write commit as
    /// one unit; a concurrent conflicting command serializes behind this
    /// transaction and observes the new state.
    pub fn get_order_txn(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<Order> {
        let table = txn.open_table(ORDERS_TABLE)?;
        let guard = table
            .get(order_id)?
            .ok_or_else(|| StorageError::OrderNotFound(order_id.to_string()))?;
        Ok(serde_json::from_slice(guard.value())?)
    }

    /// Load an order (read-only)
    pub fn get_order(&self, order_id: &str) -> StorageResult<Order> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        let guard = table
            .get(order_id)?
            .ok_or_else(|| StorageError::OrderNotFound(order_id.to_string()))?;
        Ok(serde_json::from_slice(guard.value())?)
    }

    // ========== Wallet operations ==========

    /// Load a wallet (read-only), if it exists
    pub fn get_wallet(&self, branch_id: &str) -> StorageResult<Option<Wallet>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLETS_TABLE)?;
        match table.get(branch_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Atomically mutate a wallet, creating it with zero balance if absent
    ///
    /// The read, the mutation and the write commit as one transaction;
    /// redb's single-writer serialization makes this safe under
    /// concurrent first-access and concurrent charges/payments to the
    /// same branch.
    pub fn mutate_wallet<F>(&self, branch_id: &str, now: i64, mutate: F) -> StorageResult<Wallet>
    where
        F: FnOnce(&mut Wallet),
    {
        let txn = self.db.begin_write()?;
        let wallet = {
            let mut table = txn.open_table(WALLETS_TABLE)?;
            let mut wallet = match table.get(branch_id)? {
                Some(guard) => serde_json::from_slice(guard.value())?,
                None => Wallet::new(branch_id, now),
            };
            mutate(&mut wallet);
            wallet.updated_at = now;
            let value = serde_json::to_vec(&wallet)?;
            table.insert(branch_id, value.as_slice())?;
            wallet
        };
        txn.commit()?;
        Ok(wallet)
    }
}
