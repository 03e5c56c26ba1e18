//! Error types for the authorization engine.
//!
//! Deny decisions are not errors — they are `Decision::Deny` values from the
//! policy evaluator. Errors here cover directory misses, bootstrap guards,
//! and configuration failures. None of them ever degrades to an
//! allow-by-default path: a caller that hits `MissingContext` must route
//! through the Bootstrap Manager before retrying.

use thiserror::Error;

use crate::directory::{OrganizationId, PrincipalId};

/// A specialized Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;

/// Errors from the authorization engine.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The principal has no row in the directory.
    #[error("Principal not found: {0}")]
    PrincipalNotFound(PrincipalId),

    /// The organization has no row in the directory.
    #[error("Organization not found: {0}")]
    OrganizationNotFound(OrganizationId),

    /// The principal has no profile or no organization yet (pre-bootstrap),
    /// or has been deactivated. Recoverable by routing through the
    /// Bootstrap Manager; never a reason to allow.
    #[error("No authorization context for principal {0}")]
    MissingContext(PrincipalId),

    /// The principal's organization is already set and cannot change.
    #[error("Principal {principal} is already assigned to organization {existing}")]
    AlreadyAssigned {
        principal: PrincipalId,
        existing: OrganizationId,
    },

    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A trusted-channel credential entry could not be parsed.
    #[error("Invalid trusted-channel digest for {channel}: {reason}")]
    InvalidCredentialDigest { channel: String, reason: String },
}

impl AuthzError {
    /// Whether this error is the recoverable pre-bootstrap state.
    pub fn is_missing_context(&self) -> bool {
        matches!(self, Self::MissingContext(_))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_context_is_recoverable() {
        let err = AuthzError::MissingContext(PrincipalId::new("p-1"));
        assert!(err.is_missing_context());

        let err = AuthzError::PrincipalNotFound(PrincipalId::new("p-1"));
        assert!(!err.is_missing_context());
    }

    #[test]
    fn test_already_assigned_display() {
        let err = AuthzError::AlreadyAssigned {
            principal: PrincipalId::new("p-1"),
            existing: OrganizationId::new("org-x"),
        };
        let msg = err.to_string();
        assert!(msg.contains("p-1"));
        assert!(msg.contains("org-x"));
    }
}
