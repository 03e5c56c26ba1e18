//! Principal Directory data models: identifiers, Principal, Organization,
//! and the resource snapshot consumed by the policy evaluator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed principal identifier.
///
/// This is the stable, opaque key issued by the external identity layer.
/// All directory reads and writes are keyed by it — never by email or
/// display fields, which are mutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalId(pub String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PrincipalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PrincipalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Strongly-typed organization (tenant) identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

impl OrganizationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrganizationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrganizationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Role
// ═══════════════════════════════════════════════════════════════════════════════

/// Organization-level role of a principal.
///
/// The model is deliberately small: `Admin` controls its own tenant,
/// `Member` works within it. Finer-grained permission sets are out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Principal
// ═══════════════════════════════════════════════════════════════════════════════

/// Principal status.
///
/// Principals are never hard-deleted; deactivation preserves referential
/// history in dependent resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalStatus {
    Active,
    Deactivated,
}

/// An authenticated identity with a profile in the system.
///
/// Invariants:
/// - `id` is immutable.
/// - `organization_id` is nullable only transiently, before bootstrap
///   completes; once set it never changes (no organization transfer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub organization_id: Option<OrganizationId>,
    pub status: PrincipalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    /// Create a new pre-bootstrap principal: `Member`, no organization yet.
    pub fn new(
        id: impl Into<PrincipalId>,
        email: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            email: email.into(),
            display_name: display_name.into(),
            role: Role::Member,
            organization_id: None,
            status: PrincipalStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Assign an organization at construction time.
    pub fn with_organization(mut self, org_id: OrganizationId) -> Self {
        self.organization_id = Some(org_id);
        self
    }

    /// Set the role at construction time.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Check whether the principal is active.
    pub fn is_active(&self) -> bool {
        self.status == PrincipalStatus::Active
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Organization (tenant boundary)
// ═══════════════════════════════════════════════════════════════════════════════

/// An organization (tenant) that owns resources.
///
/// Organizations are created explicitly — by bootstrap or by an
/// administrative operation — never inferred from a resource row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(id: impl Into<OrganizationId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Resource snapshot (evaluator input)
// ═══════════════════════════════════════════════════════════════════════════════

/// The kinds of tenant-scoped resources the scheduler protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Worker,
    Task,
    Assignment,
    TimeLog,
    Profile,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Worker => "worker",
            Self::Task => "task",
            Self::Assignment => "assignment",
            Self::TimeLog => "time_log",
            Self::Profile => "profile",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A caller-supplied snapshot of the target row for one authorization check.
///
/// The surrounding application already queried the row; the evaluator never
/// performs storage I/O itself. `privileged` marks a mutation that touches
/// authorization-relevant fields (role, organization) — the self-service
/// rule allows only non-privileged updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource kind being acted on.
    pub kind: ResourceKind,
    /// Opaque row identifier. For `Profile` rows this equals the owning
    /// principal's id, which is what the self-service rule matches on.
    pub id: String,
    /// Tenant tag, required and immutable after creation.
    pub organization_id: OrganizationId,
    /// Whether the mutation touches authorization-relevant fields.
    pub privileged: bool,
}

impl ResourceRef {
    pub fn new(
        kind: ResourceKind,
        id: impl Into<String>,
        organization_id: OrganizationId,
    ) -> Self {
        Self {
            kind,
            id: id.into(),
            organization_id,
            privileged: false,
        }
    }

    /// Mark this as a mutation of authorization-relevant fields.
    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
