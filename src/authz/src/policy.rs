//! Policy Evaluator: the pure decision function of the engine.
//!
//! The evaluator answers the question:
//! "Can this subject perform this operation on this resource row?"
//!
//! It consults nothing beyond the supplied subject and target snapshot — no
//! storage, no clocks, no globals — so every rule is exhaustively
//! unit-testable without a database. The rule list is ordered and closed:
//! implementers must not add implicit-allow cases beyond those below.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::context::AuthorizationContext;
use crate::directory::ResourceRef;
use crate::trusted::TrustedCaller;

// ═══════════════════════════════════════════════════════════════════════════════
// Operations
// ═══════════════════════════════════════════════════════════════════════════════

/// The operations a caller may request on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Subject
// ═══════════════════════════════════════════════════════════════════════════════

/// Who is asking.
///
/// Trusted callers carry no principal context; they are a separate trust
/// root verified by the [`TrustedChannelGate`](crate::trusted::TrustedChannelGate)
/// and can never be fabricated from a principal's context.
#[derive(Debug, Clone)]
pub enum Subject {
    Principal(AuthorizationContext),
    Trusted(TrustedCaller),
}

impl From<AuthorizationContext> for Subject {
    fn from(ctx: AuthorizationContext) -> Self {
        Self::Principal(ctx)
    }
}

impl From<TrustedCaller> for Subject {
    fn from(caller: TrustedCaller) -> Self {
        Self::Trusted(caller)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Decision
// ═══════════════════════════════════════════════════════════════════════════════

/// Why an operation was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The caller's organization does not match the resource's tenant tag.
    CrossTenant,
    /// The caller's role lacks the privilege for this operation.
    InsufficientRole,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CrossTenant => "cross_tenant",
            Self::InsufficientRole => "insufficient_role",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a policy evaluation.
///
/// A `Deny` is final for the request; decisions are never retried
/// automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// The operation is allowed.
    Allow,
    /// The operation is denied, with a reason.
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }
}

/// Errors from the enforcing variant of evaluation.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Permission denied: {0}")]
    PermissionDenied(DenyReason),
}

// ═══════════════════════════════════════════════════════════════════════════════
// Policy Evaluator
// ═══════════════════════════════════════════════════════════════════════════════

/// Stateless evaluator for the ordered rule list.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEvaluator;

impl PolicyEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate one request. First matching rule wins:
    ///
    /// 1. Trusted-channel subject: allow unconditionally.
    /// 2. Admin of the resource's own tenant: allow.
    /// 3. `create` within the caller's own tenant: allow for any role.
    /// 4. `read` within the caller's own tenant: allow for any role.
    /// 5. Self-referential target (the caller's own row): allow `read` and
    ///    non-privileged `update` regardless of role.
    /// 6. Otherwise deny — `CrossTenant` on organization mismatch, else
    ///    `InsufficientRole`.
    pub fn authorize(
        &self,
        subject: &Subject,
        operation: Operation,
        target: &ResourceRef,
    ) -> Decision {
        let decision = self.evaluate(subject, operation, target);
        self.record(subject, operation, target, decision);
        decision
    }

    /// Convenience: `Ok(())` if allowed, `Err(PolicyError)` if denied.
    pub fn enforce(
        &self,
        subject: &Subject,
        operation: Operation,
        target: &ResourceRef,
    ) -> Result<(), PolicyError> {
        match self.authorize(subject, operation, target) {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(PolicyError::PermissionDenied(reason)),
        }
    }

    fn evaluate(&self, subject: &Subject, operation: Operation, target: &ResourceRef) -> Decision {
        let ctx = match subject {
            Subject::Trusted(_) => return Decision::Allow,
            Subject::Principal(ctx) => ctx,
        };

        let same_tenant = ctx.organization_id == target.organization_id;

        if ctx.role.is_admin() && same_tenant {
            return Decision::Allow;
        }

        if operation == Operation::Create && same_tenant {
            return Decision::Allow;
        }

        if operation == Operation::Read && same_tenant {
            return Decision::Allow;
        }

        // Self-service: a principal may read its own row and apply updates
        // that leave the authorization-relevant fields untouched.
        if target.id == ctx.principal_id.as_str() {
            match operation {
                Operation::Read => return Decision::Allow,
                Operation::Update if !target.privileged => return Decision::Allow,
                _ => {}
            }
        }

        if !same_tenant {
            Decision::Deny(DenyReason::CrossTenant)
        } else {
            Decision::Deny(DenyReason::InsufficientRole)
        }
    }

    fn record(
        &self,
        subject: &Subject,
        operation: Operation,
        target: &ResourceRef,
        decision: Decision,
    ) {
        let subject_kind = match subject {
            Subject::Principal(_) => "principal",
            Subject::Trusted(_) => "trusted",
        };
        let outcome = match decision {
            Decision::Allow => "allow",
            Decision::Deny(reason) => reason.as_str(),
        };

        debug!(
            subject = subject_kind,
            operation = %operation,
            kind = %target.kind,
            organization_id = %target.organization_id,
            outcome = outcome,
            "Policy decision"
        );
        counter!(
            "authz_decisions_total",
            "subject" => subject_kind.to_string(),
            "operation" => operation.as_str().to_string(),
            "kind" => target.kind.as_str().to_string(),
            "outcome" => outcome.to_string(),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
