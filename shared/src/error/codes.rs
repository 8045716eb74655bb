//! Unified error codes for the depot platform
//!
//! This module defines all error codes used across the server and its
//! clients. Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Branch errors
//! - 4xxx: Order errors
//! - 5xxx: Wallet errors
//! - 6xxx: Product errors
//! - 8xxx: Delivery partner errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient
/// serialization and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Business rule violation
    BusinessRuleViolation = 5,
    /// Invalid request
    InvalidRequest = 6,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated
    NotAuthenticated = 1001,
    /// Credential could not be resolved to a principal
    InvalidCredentials = 1002,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// A specific role is required for this command
    RoleRequired = 2002,
    /// Actor does not own the referenced entity
    OwnershipMismatch = 2003,

    // ==================== 3xxx: Branch ====================
    /// Branch not found
    BranchNotFound = 3001,
    /// Branch has not been approved
    BranchNotApproved = 3002,
    /// Branch wallet balance is below the minimum operating threshold
    BranchBelowMinimumBalance = 3003,
    /// Store is currently closed
    StoreClosed = 3004,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Command is illegal in the order's current state
    InvalidStateTransition = 4002,
    /// Order has already been collected
    OrderAlreadyCollected = 4003,
    /// Proposed item count exceeds the original count
    ItemCountIncreased = 4004,
    /// Loose product requires a positive quantity
    LooseQuantityRequired = 4005,
    /// Proposed item does not exist on the original order
    UnknownOrderItem = 4006,
    /// Delivery is not enabled for this order
    DeliveryNotEnabled = 4007,
    /// Order contains no items
    OrderEmpty = 4008,

    // ==================== 5xxx: Wallet ====================
    /// Wallet not found
    WalletNotFound = 5001,
    /// Payment amount must be positive
    InvalidPaymentAmount = 5002,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product is disabled
    ProductDisabled = 6002,

    // ==================== 8xxx: Delivery partner ====================
    /// Delivery partner not found
    PartnerNotFound = 8001,
    /// No approved and available delivery partner
    PartnerNotAvailable = 8002,
    /// Delivery partner is not assigned to this order
    PartnerNotAssigned = 8003,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Storage layer unavailable or failed mid-transaction
    StorageUnavailable = 9002,
    /// Event fanout failed
    FanoutFailed = 9003,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the default human-readable message for this error code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::BusinessRuleViolation => "Business rule violation",
            Self::InvalidRequest => "Invalid request",

            Self::NotAuthenticated => "Authentication required",
            Self::InvalidCredentials => "Invalid credentials",

            Self::PermissionDenied => "Permission denied",
            Self::RoleRequired => "Role required for this command",
            Self::OwnershipMismatch => "Actor does not own this entity",

            Self::BranchNotFound => "Branch not found",
            Self::BranchNotApproved => "Branch is not approved",
            Self::BranchBelowMinimumBalance => "Wallet balance below minimum threshold",
            Self::StoreClosed => "Store is closed",

            Self::OrderNotFound => "Order not found",
            Self::InvalidStateTransition => "Command not allowed in current order state",
            Self::OrderAlreadyCollected => "Order has already been collected",
            Self::ItemCountIncreased => "Item count may only be reduced",
            Self::LooseQuantityRequired => "Loose product requires a positive quantity",
            Self::UnknownOrderItem => "Item does not exist on the original order",
            Self::DeliveryNotEnabled => "Delivery is not enabled for this order",
            Self::OrderEmpty => "Order contains no items",

            Self::WalletNotFound => "Wallet not found",
            Self::InvalidPaymentAmount => "Payment amount must be positive",

            Self::ProductNotFound => "Product not found",
            Self::ProductDisabled => "Product is disabled",

            Self::PartnerNotFound => "Delivery partner not found",
            Self::PartnerNotAvailable => "No delivery partner available",
            Self::PartnerNotAssigned => "Delivery partner is not assigned to this order",

            Self::InternalError => "Internal server error",
            Self::StorageUnavailable => "Storage unavailable",
            Self::FanoutFailed => "Event broadcast failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> u16 {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            4 => Self::AlreadyExists,
            5 => Self::BusinessRuleViolation,
            6 => Self::InvalidRequest,

            1001 => Self::NotAuthenticated,
            1002 => Self::InvalidCredentials,

            2001 => Self::PermissionDenied,
            2002 => Self::RoleRequired,
            2003 => Self::OwnershipMismatch,

            3001 => Self::BranchNotFound,
            3002 => Self::BranchNotApproved,
            3003 => Self::BranchBelowMinimumBalance,
            3004 => Self::StoreClosed,

            4001 => Self::OrderNotFound,
            4002 => Self::InvalidStateTransition,
            4003 => Self::OrderAlreadyCollected,
            4004 => Self::ItemCountIncreased,
            4005 => Self::LooseQuantityRequired,
            4006 => Self::UnknownOrderItem,
            4007 => Self::DeliveryNotEnabled,
            4008 => Self::OrderEmpty,

            5001 => Self::WalletNotFound,
            5002 => Self::InvalidPaymentAmount,

            6001 => Self::ProductNotFound,
            6002 => Self::ProductDisabled,

            8001 => Self::PartnerNotFound,
            8002 => Self::PartnerNotAvailable,
            8003 => Self::PartnerNotAssigned,

            9001 => Self::InternalError,
            9002 => Self::StorageUnavailable,
            9003 => Self::FanoutFailed,

            other => return Err(InvalidErrorCode(other)),
        };
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::NotFound.code(), 3);
        assert_eq!(ErrorCode::PermissionDenied.code(), 2001);
        assert_eq!(ErrorCode::InvalidStateTransition.code(), 4002);
        assert_eq!(ErrorCode::StorageUnavailable.code(), 9002);
    }

    #[test]
    fn test_roundtrip_u16() {
        for code in [
            ErrorCode::Success,
            ErrorCode::ValidationFailed,
            ErrorCode::NotAuthenticated,
            ErrorCode::OwnershipMismatch,
            ErrorCode::BranchBelowMinimumBalance,
            ErrorCode::LooseQuantityRequired,
            ErrorCode::WalletNotFound,
            ErrorCode::PartnerNotAvailable,
            ErrorCode::FanoutFailed,
        ] {
            let raw: u16 = code.into();
            assert_eq!(ErrorCode::try_from(raw), Ok(code));
        }
    }

    #[test]
    fn test_invalid_code_rejected() {
        assert_eq!(ErrorCode::try_from(7777), Err(InvalidErrorCode(7777)));
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::OrderNotFound).unwrap();
        assert_eq!(json, "4001");
        let back: ErrorCode = serde_json::from_str("4001").unwrap();
        assert_eq!(back, ErrorCode::OrderNotFound);
    }
}
