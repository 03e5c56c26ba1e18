//! Principal Directory storage seam and the in-memory implementation.
//!
//! The directory is the only stateful component of the engine and the only
//! table context derivation may read. It is deliberately not subject to
//! cross-tenant row filtering beyond "a principal may always read its own
//! record" — filtering it through the policy evaluator would recreate the
//! recursive permission-check cycle this engine exists to eliminate.

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::{AuthzError, Result};

use super::models::{Organization, OrganizationId, Principal, PrincipalId, PrincipalStatus, Role};

// ═══════════════════════════════════════════════════════════════════════════════
// Storage trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Durable store for principals and organizations.
///
/// All reads and writes are keyed by the immutable principal id. The trait
/// intentionally exposes nothing about resource tables, so a resolver
/// holding a `dyn PrincipalDirectory` cannot transitively query the very
/// rows the policy protects.
pub trait PrincipalDirectory: Send + Sync {
    /// Fetch a principal by id.
    fn get(&self, id: &PrincipalId) -> Result<Principal>;

    /// Insert or replace a principal row.
    fn upsert(&self, principal: Principal);

    /// Change a principal's role.
    fn set_role(&self, id: &PrincipalId, role: Role) -> Result<()>;

    /// Assign a principal's organization. Fails with `AlreadyAssigned` if
    /// the organization is already set — once non-null it never changes.
    fn set_organization(&self, id: &PrincipalId, org_id: OrganizationId) -> Result<()>;

    /// Deactivate a principal. The row is retained for referential history.
    fn deactivate(&self, id: &PrincipalId) -> Result<()>;

    /// Insert an organization row.
    fn insert_organization(&self, org: Organization);

    /// Fetch an organization by id.
    fn get_organization(&self, id: &OrganizationId) -> Result<Organization>;

    /// Number of active admins in an organization.
    fn admin_count(&self, org_id: &OrganizationId) -> usize;

    /// Number of principals assigned to an organization.
    fn member_count(&self, org_id: &OrganizationId) -> usize;

    /// Atomically claim the first-admin slot of an organization.
    ///
    /// The conditions — zero active admins in the organization, principal
    /// unassigned or already assigned to this organization — and the
    /// promotion (role to `Admin`, organization set if unset) are one
    /// atomic step, never a read-then-write. Returns `Ok(true)` for the
    /// single winner, `Ok(false)` when the organization already has an
    /// active admin. Validation failures surface as errors and leave the
    /// slot claimable.
    fn try_claim_admin(&self, org_id: &OrganizationId, id: &PrincipalId) -> Result<bool>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// In-memory implementation
// ═══════════════════════════════════════════════════════════════════════════════

/// Thread-safe in-memory directory.
///
/// Backed by `DashMap` for principals; admin claims serialize behind a
/// dedicated lock so the zero-admin check and the promotion are a single
/// step.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    principals: DashMap<PrincipalId, Principal>,
    organizations: RwLock<HashMap<OrganizationId, Organization>>,
    claim_lock: Mutex<()>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrincipalDirectory for InMemoryDirectory {
    fn get(&self, id: &PrincipalId) -> Result<Principal> {
        self.principals
            .get(id)
            .map(|p| p.clone())
            .ok_or_else(|| AuthzError::PrincipalNotFound(id.clone()))
    }

    fn upsert(&self, principal: Principal) {
        debug!(principal_id = %principal.id, "Upserting principal");
        self.principals.insert(principal.id.clone(), principal);
    }

    fn set_role(&self, id: &PrincipalId, role: Role) -> Result<()> {
        let mut entry = self
            .principals
            .get_mut(id)
            .ok_or_else(|| AuthzError::PrincipalNotFound(id.clone()))?;
        debug!(principal_id = %id, role = %role, "Setting principal role");
        entry.role = role;
        entry.updated_at = chrono::Utc::now();
        Ok(())
    }

    fn set_organization(&self, id: &PrincipalId, org_id: OrganizationId) -> Result<()> {
        let mut entry = self
            .principals
            .get_mut(id)
            .ok_or_else(|| AuthzError::PrincipalNotFound(id.clone()))?;
        if let Some(existing) = &entry.organization_id {
            warn!(
                principal_id = %id,
                existing = %existing,
                requested = %org_id,
                "Rejected organization reassignment"
            );
            return Err(AuthzError::AlreadyAssigned {
                principal: id.clone(),
                existing: existing.clone(),
            });
        }
        entry.organization_id = Some(org_id);
        entry.updated_at = chrono::Utc::now();
        Ok(())
    }

    fn deactivate(&self, id: &PrincipalId) -> Result<()> {
        let mut entry = self
            .principals
            .get_mut(id)
            .ok_or_else(|| AuthzError::PrincipalNotFound(id.clone()))?;
        entry.status = PrincipalStatus::Deactivated;
        entry.updated_at = chrono::Utc::now();
        Ok(())
    }

    fn insert_organization(&self, org: Organization) {
        debug!(organization_id = %org.id, "Inserting organization");
        self.organizations.write().insert(org.id.clone(), org);
    }

    fn get_organization(&self, id: &OrganizationId) -> Result<Organization> {
        self.organizations
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| AuthzError::OrganizationNotFound(id.clone()))
    }

    fn admin_count(&self, org_id: &OrganizationId) -> usize {
        self.principals
            .iter()
            .filter(|p| {
                p.role.is_admin()
                    && p.is_active()
                    && p.organization_id.as_ref() == Some(org_id)
            })
            .count()
    }

    fn member_count(&self, org_id: &OrganizationId) -> usize {
        self.principals
            .iter()
            .filter(|p| p.organization_id.as_ref() == Some(org_id))
            .count()
    }

    fn try_claim_admin(&self, org_id: &OrganizationId, id: &PrincipalId) -> Result<bool> {
        let _claim = self.claim_lock.lock();

        // Admins granted outside bootstrap also close the slot; the count
        // is live, so the slot reopens if the sole admin is deactivated.
        if self.admin_count(org_id) > 0 {
            return Ok(false);
        }

        let mut entry = self
            .principals
            .get_mut(id)
            .ok_or_else(|| AuthzError::PrincipalNotFound(id.clone()))?;
        match &entry.organization_id {
            Some(existing) if existing != org_id => {
                return Err(AuthzError::AlreadyAssigned {
                    principal: id.clone(),
                    existing: existing.clone(),
                });
            }
            Some(_) => {}
            None => entry.organization_id = Some(org_id.clone()),
        }
        entry.role = Role::Admin;
        entry.updated_at = chrono::Utc::now();
        Ok(true)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
