//! Context Resolver: derives the per-request authorization context.
//!
//! The resolver performs exactly one directory lookup and nothing else. Its
//! only storage handle is `dyn PrincipalDirectory`, which exposes no resource
//! tables — the interface makes the recursive failure mode (a permission
//! check querying the table it protects) unrepresentable rather than merely
//! discouraged.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::directory::{OrganizationId, PrincipalDirectory, PrincipalId, Role};
use crate::error::{AuthzError, Result};

/// The resolved `{principal, organization, role}` triple for one request.
///
/// Computed once per request and treated as immutable for the request's
/// duration; never re-derived mid-request, so a concurrent profile edit
/// cannot produce a decision based on a half-updated role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationContext {
    pub principal_id: PrincipalId,
    pub organization_id: OrganizationId,
    pub role: Role,
}

impl AuthorizationContext {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Computes authorization contexts from the Principal Directory.
#[derive(Clone)]
pub struct ContextResolver {
    directory: Arc<dyn PrincipalDirectory>,
}

impl ContextResolver {
    pub fn new(directory: Arc<dyn PrincipalDirectory>) -> Self {
        Self { directory }
    }

    /// Resolve the context for a verified principal id.
    ///
    /// Returns `MissingContext` when the principal has no profile yet, has
    /// no organization assigned (pre-bootstrap), or is deactivated. All
    /// three are routed the same way: through the Bootstrap Manager, never
    /// toward an implicit allow.
    pub fn resolve(&self, principal_id: &PrincipalId) -> Result<AuthorizationContext> {
        let principal = self.directory.get(principal_id).map_err(|e| match e {
            AuthzError::PrincipalNotFound(id) => AuthzError::MissingContext(id),
            other => other,
        })?;

        if !principal.is_active() {
            debug!(principal_id = %principal_id, "Deactivated principal has no context");
            return Err(AuthzError::MissingContext(principal_id.clone()));
        }

        let organization_id = principal
            .organization_id
            .ok_or_else(|| AuthzError::MissingContext(principal_id.clone()))?;

        debug!(
            principal_id = %principal_id,
            organization_id = %organization_id,
            role = %principal.role,
            "Resolved authorization context"
        );

        Ok(AuthorizationContext {
            principal_id: principal.id,
            organization_id,
            role: principal.role,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{InMemoryDirectory, Principal};

    fn resolver_with(principal: Principal) -> ContextResolver {
        let dir = InMemoryDirectory::new();
        dir.upsert(principal);
        ContextResolver::new(Arc::new(dir))
    }

    #[test]
    fn test_resolve_assigned_principal() {
        let resolver = resolver_with(
            Principal::new("p-1", "a@example.com", "Ada")
                .with_organization(OrganizationId::new("org-x"))
                .with_role(Role::Admin),
        );

        let ctx = resolver.resolve(&PrincipalId::new("p-1")).unwrap();
        assert_eq!(ctx.organization_id, OrganizationId::new("org-x"));
        assert!(ctx.is_admin());
    }

    #[test]
    fn test_unknown_principal_is_missing_context() {
        let resolver = ContextResolver::new(Arc::new(InMemoryDirectory::new()));
        let err = resolver.resolve(&PrincipalId::new("ghost")).unwrap_err();
        assert!(err.is_missing_context());
    }

    #[test]
    fn test_pre_bootstrap_principal_is_missing_context() {
        let resolver = resolver_with(Principal::new("p-1", "a@example.com", "Ada"));
        let err = resolver.resolve(&PrincipalId::new("p-1")).unwrap_err();
        assert!(err.is_missing_context());
    }

    #[test]
    fn test_deactivated_principal_is_missing_context() {
        let dir = InMemoryDirectory::new();
        dir.upsert(
            Principal::new("p-1", "a@example.com", "Ada")
                .with_organization(OrganizationId::new("org-x")),
        );
        dir.deactivate(&PrincipalId::new("p-1")).unwrap();

        let resolver = ContextResolver::new(Arc::new(dir));
        let err = resolver.resolve(&PrincipalId::new("p-1")).unwrap_err();
        assert!(err.is_missing_context());
    }
}
