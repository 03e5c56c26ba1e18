//! The engine facade tying the subsystems together.
//!
//! Calling application code sees three operations: `resolve_context`,
//! `authorize`, and `claim_admin`. Identity-token verification happens
//! before any of them — the engine receives an already-verified principal
//! id — and resource rows arrive pre-fetched by the storage layer; the
//! engine performs storage I/O only against the Principal Directory.

use std::sync::Arc;

use crate::bootstrap::{BootstrapManager, BootstrapState, ClaimOutcome};
use crate::config::EngineConfig;
use crate::context::{AuthorizationContext, ContextResolver};
use crate::directory::{
    InMemoryDirectory, Organization, OrganizationId, Principal, PrincipalDirectory, PrincipalId,
    ResourceRef,
};
use crate::error::Result;
use crate::policy::{Decision, Operation, PolicyEvaluator, Subject};
use crate::trusted::{TrustedCaller, TrustedChannelGate, TrustedCredential};

/// Multi-tenant authorization engine.
///
/// Cheap to clone; all components share the underlying directory.
#[derive(Clone)]
pub struct AuthorizationEngine {
    directory: Arc<dyn PrincipalDirectory>,
    resolver: ContextResolver,
    evaluator: PolicyEvaluator,
    bootstrap: BootstrapManager,
    gate: TrustedChannelGate,
}

impl AuthorizationEngine {
    /// Build an engine over a fresh in-memory directory.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_directory(config, Arc::new(InMemoryDirectory::new()))
    }

    /// Build an engine over an existing directory implementation.
    pub fn with_directory(
        config: EngineConfig,
        directory: Arc<dyn PrincipalDirectory>,
    ) -> Result<Self> {
        let gate = TrustedChannelGate::from_config(&config.trusted)?;
        Ok(Self {
            resolver: ContextResolver::new(directory.clone()),
            evaluator: PolicyEvaluator::new(),
            bootstrap: BootstrapManager::new(directory.clone(), config.tenancy),
            gate,
            directory,
        })
    }

    /// Resolve the authorization context for a verified principal id.
    ///
    /// Errors with `MissingContext` for principals that have not completed
    /// bootstrap; route those through [`provision`](Self::provision) and
    /// [`claim_admin`](Self::claim_admin).
    pub fn resolve_context(&self, principal_id: &PrincipalId) -> Result<AuthorizationContext> {
        self.resolver.resolve(principal_id)
    }

    /// Decide one operation against one resource snapshot.
    pub fn authorize(
        &self,
        subject: &Subject,
        operation: Operation,
        target: &ResourceRef,
    ) -> Decision {
        self.evaluator.authorize(subject, operation, target)
    }

    /// Claim the first-admin slot of an organization. See
    /// [`BootstrapManager::claim_admin`].
    pub fn claim_admin(
        &self,
        principal_id: &PrincipalId,
        organization_id: &OrganizationId,
    ) -> Result<ClaimOutcome> {
        self.bootstrap.claim_admin(principal_id, organization_id)
    }

    /// Provision a profile for a newly registered identity over the trusted
    /// channel.
    pub fn provision(
        &self,
        caller: &TrustedCaller,
        principal_id: PrincipalId,
        email: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Result<Principal> {
        self.bootstrap
            .provision(caller, principal_id, email, display_name)
    }

    /// Verify a system credential, minting a trusted caller on success.
    pub fn verify_trusted(&self, credential: &TrustedCredential) -> Option<TrustedCaller> {
        self.gate.verify(credential)
    }

    /// Inspect an organization's bootstrap state.
    pub fn bootstrap_state(&self, organization_id: &OrganizationId) -> BootstrapState {
        self.bootstrap.state(organization_id)
    }

    /// Register an organization (administrative creation path).
    pub fn add_organization(&self, organization: Organization) {
        self.directory.insert_organization(organization);
    }

    /// The underlying Principal Directory.
    pub fn directory(&self) -> &Arc<dyn PrincipalDirectory> {
        &self.directory
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TrustedChannelConfig, TrustedChannelEntry};
    use crate::directory::{ResourceKind, Role};
    use crate::error::AuthzError;
    use crate::policy::DenyReason;

    fn engine_with_trusted(secret: &str) -> AuthorizationEngine {
        let config = EngineConfig {
            trusted: TrustedChannelConfig {
                channels: vec![TrustedChannelEntry {
                    name: "idp-webhook".to_string(),
                    sha256: TrustedCredential::new(secret).digest_hex(),
                }],
            },
            ..EngineConfig::default()
        };
        AuthorizationEngine::new(config).unwrap()
    }

    #[test]
    fn test_full_registration_flow() {
        let engine = engine_with_trusted("hook-secret");
        engine.add_organization(Organization::new("org-x", "Acme"));

        // New identity authenticates; the webhook provisions a profile.
        let caller = engine
            .verify_trusted(&TrustedCredential::new("hook-secret"))
            .unwrap();
        engine
            .provision(&caller, PrincipalId::new("p-1"), "a@example.com", "Ada")
            .unwrap();

        // Pre-bootstrap: no context yet.
        let err = engine.resolve_context(&PrincipalId::new("p-1")).unwrap_err();
        assert!(err.is_missing_context());

        // Claim the empty admin slot, then resolve.
        let outcome = engine
            .claim_admin(&PrincipalId::new("p-1"), &OrganizationId::new("org-x"))
            .unwrap();
        assert_eq!(outcome, ClaimOutcome::Admitted);

        let ctx = engine.resolve_context(&PrincipalId::new("p-1")).unwrap();
        assert_eq!(ctx.role, Role::Admin);

        // And the context authorizes tenant-scoped work.
        let target = ResourceRef::new(
            ResourceKind::Worker,
            "w-1",
            OrganizationId::new("org-x"),
        );
        assert!(engine
            .authorize(&Subject::Principal(ctx), Operation::Create, &target)
            .is_allowed());
    }

    #[test]
    fn test_wrong_trusted_secret_rejected() {
        let engine = engine_with_trusted("hook-secret");
        assert!(engine
            .verify_trusted(&TrustedCredential::new("wrong"))
            .is_none());
    }

    #[test]
    fn test_deny_surfaces_reason() {
        let engine = engine_with_trusted("hook-secret");
        engine.add_organization(Organization::new("org-x", "Acme"));
        engine.directory().upsert(
            Principal::new("p-1", "a@example.com", "Ada")
                .with_organization(OrganizationId::new("org-x")),
        );

        let ctx = engine.resolve_context(&PrincipalId::new("p-1")).unwrap();
        let foreign = ResourceRef::new(
            ResourceKind::TimeLog,
            "t-1",
            OrganizationId::new("org-y"),
        );
        assert_eq!(
            engine.authorize(&Subject::Principal(ctx), Operation::Read, &foreign),
            Decision::Deny(DenyReason::CrossTenant)
        );
    }

    #[test]
    fn test_engine_rejects_bad_config_digest() {
        let config = EngineConfig {
            trusted: TrustedChannelConfig {
                channels: vec![TrustedChannelEntry {
                    name: "broken".to_string(),
                    sha256: "zz".to_string(),
                }],
            },
            ..EngineConfig::default()
        };
        let err = match AuthorizationEngine::new(config) {
            Ok(_) => panic!("malformed digest must be rejected"),
            Err(e) => e,
        };
        assert!(matches!(err, AuthzError::InvalidCredentialDigest { .. }));
    }

    #[test]
    fn test_bootstrap_state_inspection() {
        let engine = engine_with_trusted("hook-secret");
        engine.add_organization(Organization::new("org-x", "Acme"));
        assert_eq!(
            engine.bootstrap_state(&OrganizationId::new("org-x")),
            BootstrapState::Unprovisioned
        );
    }
}
