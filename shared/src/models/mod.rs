//! Domain models shared between the server and its clients

mod branch;
mod order;
mod partner;
mod product;
mod wallet;

pub use branch::{ApprovalStatus, Branch, StoreStatus, StoreStatusEntry};
pub use order::{
    ItemKind, Location, ModificationEntry, Order, OrderItem, OrderStatus, StatusEntry,
};
pub use partner::DeliveryPartner;
pub use product::Product;
pub use wallet::{TransactionType, Wallet, WalletStatistics, WalletTransaction};
