//! Principal and role checks
//!
//! Authentication itself is external: an authenticator resolves a request
//! credential into a `{subject_id, role}` principal before a command
//! reaches the core. This module holds the principal type and the role
//! gates every command runs first.

use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult, ErrorCode};
use std::fmt;

/// Actor role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Branch,
    DeliveryPartner,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Branch => write!(f, "branch"),
            Self::DeliveryPartner => write!(f, "delivery_partner"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// Authenticated actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Customer / branch / partner id, depending on role
    pub subject_id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(subject_id: impl Into<String>, role: Role) -> Self {
        Self {
            subject_id: subject_id.into(),
            role,
        }
    }

    /// Require a specific role for a command
    pub fn require_role(&self, role: Role) -> AppResult<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::with_message(
                ErrorCode::RoleRequired,
                format!("command requires {} role, caller is {}", role, self.role),
            )
            .with_detail("required_role", role.to_string())
            .with_detail("actual_role", self.role.to_string()))
        }
    }

    /// Require that the principal is the given subject
    ///
    /// Used for ownership checks: a branch may only act on its own
    /// orders, a partner only on its own assignments.
    pub fn require_subject(&self, subject_id: &str) -> AppResult<()> {
        if self.subject_id == subject_id {
            Ok(())
        } else {
            Err(AppError::ownership_mismatch(format!(
                "{} {} does not own this entity",
                self.role, self.subject_id
            )))
        }
    }
}
