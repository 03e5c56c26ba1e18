//! Bootstrap Manager: first-contact provisioning and the zero-admin problem.
//!
//! A fresh deployment has no administrator to grant the first administrator.
//! Instead of emergency row edits, bootstrap is a first-class, auditable
//! state machine per organization:
//!
//! ```text
//! Unprovisioned -> HasProfile -> HasAdmin
//! ```
//!
//! Profiles are provisioned automatically on first authentication (via the
//! trusted channel); the admin slot is claimed exactly once through an
//! atomic conditional update.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::TenancyConfig;
use crate::directory::{Organization, OrganizationId, Principal, PrincipalDirectory, PrincipalId};
use crate::error::Result;
use crate::trusted::TrustedCaller;

// ═══════════════════════════════════════════════════════════════════════════════
// States and outcomes
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-organization bootstrap state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapState {
    /// No principal belongs to the organization yet.
    Unprovisioned,
    /// Profiles exist but no administrator does.
    HasProfile,
    /// Terminal state: the organization has an administrator.
    HasAdmin,
}

/// Outcome of an admin claim.
///
/// `AlreadyHasAdmin` is a successful no-op, not a failure — callers retrying
/// bootstrap see an `Ok` either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimOutcome {
    Admitted,
    AlreadyHasAdmin,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Manager
// ═══════════════════════════════════════════════════════════════════════════════

/// Provisions profiles and arbitrates first-admin claims.
#[derive(Clone)]
pub struct BootstrapManager {
    directory: Arc<dyn PrincipalDirectory>,
    tenancy: TenancyConfig,
}

impl BootstrapManager {
    pub fn new(directory: Arc<dyn PrincipalDirectory>, tenancy: TenancyConfig) -> Self {
        Self { directory, tenancy }
    }

    /// Provision a profile for a newly registered identity.
    ///
    /// Called from the identity-provider webhook or sync job, which is why a
    /// [`TrustedCaller`] is required: the principal's own context does not
    /// exist yet. Idempotent — re-provisioning an existing id returns the
    /// stored row untouched.
    ///
    /// New profiles start as `Member`. In single-tenant deployments with a
    /// configured default organization they are assigned to it immediately
    /// (creating the organization row on first use); otherwise the
    /// organization stays unset until bootstrap completes.
    pub fn provision(
        &self,
        caller: &TrustedCaller,
        principal_id: PrincipalId,
        email: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Result<Principal> {
        if let Ok(existing) = self.directory.get(&principal_id) {
            debug!(
                principal_id = %principal_id,
                channel = %caller.channel(),
                "Principal already provisioned"
            );
            return Ok(existing);
        }

        let mut principal = Principal::new(principal_id, email, display_name);

        if self.tenancy.is_single_tenant() {
            if let Some(default_org) = &self.tenancy.default_organization {
                let org_id = OrganizationId::new(default_org.clone());
                if self.directory.get_organization(&org_id).is_err() {
                    self.directory.insert_organization(Organization::new(
                        org_id.clone(),
                        self.tenancy.default_organization_name.clone(),
                    ));
                }
                principal = principal.with_organization(org_id);
            }
        }

        info!(
            principal_id = %principal.id,
            channel = %caller.channel(),
            organization_id = ?principal.organization_id,
            "Provisioned principal"
        );
        counter!("authz_provisions_total", "channel" => caller.channel().to_string())
            .increment(1);

        self.directory.upsert(principal.clone());
        Ok(principal)
    }

    /// One-time, idempotent elevation of the first administrator.
    ///
    /// Succeeds with `Admitted` only while the organization has zero active
    /// admins; every other call — including repeats by the winner — yields
    /// `AlreadyHasAdmin`. Safe under concurrent invocation: validation,
    /// slot check, and promotion are one atomic directory operation, never
    /// a read-then-write, so a rejected claim (`AlreadyAssigned`, unknown
    /// principal) leaves the slot claimable by the next caller. If the sole
    /// administrator is later deactivated the slot reopens.
    pub fn claim_admin(
        &self,
        principal_id: &PrincipalId,
        organization_id: &OrganizationId,
    ) -> Result<ClaimOutcome> {
        self.directory.get(principal_id)?;
        self.directory.get_organization(organization_id)?;

        if self.directory.try_claim_admin(organization_id, principal_id)? {
            info!(
                principal_id = %principal_id,
                organization_id = %organization_id,
                "First administrator admitted"
            );
            counter!("authz_admin_claims_total", "outcome" => "admitted").increment(1);
            Ok(ClaimOutcome::Admitted)
        } else {
            debug!(
                principal_id = %principal_id,
                organization_id = %organization_id,
                "Admin slot already claimed"
            );
            counter!("authz_admin_claims_total", "outcome" => "already_has_admin")
                .increment(1);
            Ok(ClaimOutcome::AlreadyHasAdmin)
        }
    }

    /// Inspect an organization's position in the bootstrap state machine.
    pub fn state(&self, organization_id: &OrganizationId) -> BootstrapState {
        if self.directory.admin_count(organization_id) > 0 {
            BootstrapState::HasAdmin
        } else if self.directory.member_count(organization_id) > 0 {
            BootstrapState::HasProfile
        } else {
            BootstrapState::Unprovisioned
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TenancyMode;
    use crate::directory::{InMemoryDirectory, Role};
    use crate::error::AuthzError;
    use crate::trusted::{TrustedChannelGate, TrustedCredential};

    fn trusted_caller() -> TrustedCaller {
        let mut gate = TrustedChannelGate::new();
        gate.register("test-job", &TrustedCredential::new("secret").digest_hex())
            .unwrap();
        gate.verify(&TrustedCredential::new("secret")).unwrap()
    }

    fn manager() -> (Arc<InMemoryDirectory>, BootstrapManager) {
        let dir = Arc::new(InMemoryDirectory::new());
        let mgr = BootstrapManager::new(dir.clone(), TenancyConfig::default());
        (dir, mgr)
    }

    fn single_tenant_manager() -> (Arc<InMemoryDirectory>, BootstrapManager) {
        let dir = Arc::new(InMemoryDirectory::new());
        let tenancy = TenancyConfig {
            mode: TenancyMode::SingleTenant,
            default_organization: Some("org-main".to_string()),
            default_organization_name: "Main".to_string(),
        };
        let mgr = BootstrapManager::new(dir.clone(), tenancy);
        (dir, mgr)
    }

    #[test]
    fn test_provision_creates_pre_bootstrap_member() {
        let (_, mgr) = manager();
        let p = mgr
            .provision(
                &trusted_caller(),
                PrincipalId::new("p-1"),
                "a@example.com",
                "Ada",
            )
            .unwrap();
        assert_eq!(p.role, Role::Member);
        assert!(p.organization_id.is_none());
    }

    #[test]
    fn test_provision_is_idempotent() {
        let (dir, mgr) = manager();
        let caller = trusted_caller();
        mgr.provision(&caller, PrincipalId::new("p-1"), "a@example.com", "Ada")
            .unwrap();

        // Second provision must not overwrite the stored row.
        dir.set_organization(&PrincipalId::new("p-1"), OrganizationId::new("org-x"))
            .unwrap();
        let again = mgr
            .provision(&caller, PrincipalId::new("p-1"), "other@example.com", "Ada2")
            .unwrap();
        assert_eq!(again.email, "a@example.com");
        assert_eq!(again.organization_id, Some(OrganizationId::new("org-x")));
    }

    #[test]
    fn test_single_tenant_auto_assignment() {
        let (dir, mgr) = single_tenant_manager();
        let p = mgr
            .provision(
                &trusted_caller(),
                PrincipalId::new("p-1"),
                "a@example.com",
                "Ada",
            )
            .unwrap();
        assert_eq!(p.organization_id, Some(OrganizationId::new("org-main")));

        // Default organization row was created explicitly.
        let org = dir.get_organization(&OrganizationId::new("org-main")).unwrap();
        assert_eq!(org.name, "Main");
    }

    #[test]
    fn test_claim_admin_happy_path() {
        let (dir, mgr) = manager();
        dir.insert_organization(Organization::new("org-x", "Acme"));
        mgr.provision(
            &trusted_caller(),
            PrincipalId::new("p-1"),
            "a@example.com",
            "Ada",
        )
        .unwrap();

        let outcome = mgr
            .claim_admin(&PrincipalId::new("p-1"), &OrganizationId::new("org-x"))
            .unwrap();
        assert_eq!(outcome, ClaimOutcome::Admitted);

        let p = dir.get(&PrincipalId::new("p-1")).unwrap();
        assert!(p.role.is_admin());
        assert_eq!(p.organization_id, Some(OrganizationId::new("org-x")));
    }

    #[test]
    fn test_claim_admin_second_caller_noop() {
        let (dir, mgr) = manager();
        dir.insert_organization(Organization::new("org-x", "Acme"));
        let caller = trusted_caller();
        mgr.provision(&caller, PrincipalId::new("p-1"), "a@example.com", "Ada")
            .unwrap();
        mgr.provision(&caller, PrincipalId::new("p-2"), "b@example.com", "Ben")
            .unwrap();

        let org = OrganizationId::new("org-x");
        assert_eq!(
            mgr.claim_admin(&PrincipalId::new("p-1"), &org).unwrap(),
            ClaimOutcome::Admitted
        );
        assert_eq!(
            mgr.claim_admin(&PrincipalId::new("p-2"), &org).unwrap(),
            ClaimOutcome::AlreadyHasAdmin
        );
        // Repeat by the winner is the same no-op.
        assert_eq!(
            mgr.claim_admin(&PrincipalId::new("p-1"), &org).unwrap(),
            ClaimOutcome::AlreadyHasAdmin
        );

        let p2 = dir.get(&PrincipalId::new("p-2")).unwrap();
        assert_eq!(p2.role, Role::Member);
    }

    #[test]
    fn test_claim_admin_requires_known_org_and_principal() {
        let (dir, mgr) = manager();

        let err = mgr
            .claim_admin(&PrincipalId::new("ghost"), &OrganizationId::new("org-x"))
            .unwrap_err();
        assert!(matches!(err, AuthzError::PrincipalNotFound(_)));

        mgr.provision(
            &trusted_caller(),
            PrincipalId::new("p-1"),
            "a@example.com",
            "Ada",
        )
        .unwrap();
        let err = mgr
            .claim_admin(&PrincipalId::new("p-1"), &OrganizationId::new("org-x"))
            .unwrap_err();
        assert!(matches!(err, AuthzError::OrganizationNotFound(_)));
        assert_eq!(dir.member_count(&OrganizationId::new("org-x")), 0);
    }

    #[test]
    fn test_claim_admin_rejects_cross_org_principal() {
        let (dir, mgr) = manager();
        dir.insert_organization(Organization::new("org-x", "Acme"));
        dir.insert_organization(Organization::new("org-y", "Globex"));
        dir.upsert(
            Principal::new("p-1", "a@example.com", "Ada")
                .with_organization(OrganizationId::new("org-y")),
        );

        let err = mgr
            .claim_admin(&PrincipalId::new("p-1"), &OrganizationId::new("org-x"))
            .unwrap_err();
        assert!(matches!(err, AuthzError::AlreadyAssigned { .. }));
    }

    #[test]
    fn test_rejected_claim_does_not_consume_slot() {
        let (dir, mgr) = manager();
        dir.insert_organization(Organization::new("org-x", "Acme"));
        dir.insert_organization(Organization::new("org-y", "Globex"));
        dir.upsert(
            Principal::new("p-1", "a@example.com", "Ada")
                .with_organization(OrganizationId::new("org-y")),
        );
        mgr.provision(
            &trusted_caller(),
            PrincipalId::new("p-2"),
            "b@example.com",
            "Ben",
        )
        .unwrap();
        let org = OrganizationId::new("org-x");

        // The cross-org principal is rejected...
        let err = mgr.claim_admin(&PrincipalId::new("p-1"), &org).unwrap_err();
        assert!(matches!(err, AuthzError::AlreadyAssigned { .. }));

        // ...and the slot stays open for an eligible claimant.
        assert_eq!(
            mgr.claim_admin(&PrincipalId::new("p-2"), &org).unwrap(),
            ClaimOutcome::Admitted
        );
        assert_eq!(dir.admin_count(&org), 1);
    }

    #[test]
    fn test_slot_reopens_after_sole_admin_deactivated() {
        let (dir, mgr) = manager();
        dir.insert_organization(Organization::new("org-x", "Acme"));
        let caller = trusted_caller();
        mgr.provision(&caller, PrincipalId::new("p-1"), "a@example.com", "Ada")
            .unwrap();
        mgr.provision(&caller, PrincipalId::new("p-2"), "b@example.com", "Ben")
            .unwrap();
        let org = OrganizationId::new("org-x");

        assert_eq!(
            mgr.claim_admin(&PrincipalId::new("p-1"), &org).unwrap(),
            ClaimOutcome::Admitted
        );
        dir.deactivate(&PrincipalId::new("p-1")).unwrap();

        // With zero active admins the state machine regresses and the
        // claim outcome agrees with it.
        assert_eq!(mgr.state(&org), BootstrapState::HasProfile);
        assert_eq!(
            mgr.claim_admin(&PrincipalId::new("p-2"), &org).unwrap(),
            ClaimOutcome::Admitted
        );
        assert_eq!(mgr.state(&org), BootstrapState::HasAdmin);
    }

    #[test]
    fn test_state_machine_progression() {
        let (dir, mgr) = manager();
        let org = OrganizationId::new("org-x");
        dir.insert_organization(Organization::new("org-x", "Acme"));

        assert_eq!(mgr.state(&org), BootstrapState::Unprovisioned);

        dir.upsert(
            Principal::new("p-1", "a@example.com", "Ada").with_organization(org.clone()),
        );
        assert_eq!(mgr.state(&org), BootstrapState::HasProfile);

        mgr.claim_admin(&PrincipalId::new("p-1"), &org).unwrap();
        assert_eq!(mgr.state(&org), BootstrapState::HasAdmin);
    }
}
