//! # Shiftline Authorization Engine
//!
//! Multi-tenant, role-based access control for a shared relational store.
//! Given a caller's identity and a requested operation on a tenant-scoped
//! resource, the engine decides allow/deny, derives the caller's tenant and
//! role without circular dependency, and supports safe bootstrap of the
//! first privileged account in a system that starts with zero
//! administrators.
//!
//! ## Architecture
//!
//! - **Principal Directory**: durable store mapping identities to profiles
//! - **Context Resolver**: derives `{organization, role}` from the directory
//!   alone — never from the resource tables being protected
//! - **Policy Evaluator**: pure, ordered-rule decision function
//! - **Bootstrap Manager**: idempotent first-admin state machine
//! - **Trusted-Channel Gate**: credential-based bypass for system callers
//!
//! The HTTP layer, command interpretation, resource storage, and identity
//! verification are external collaborators; they call
//! [`AuthorizationEngine`] and act on its decisions.

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod directory;
pub mod engine;
pub mod error;
pub mod policy;
pub mod trusted;

pub use engine::AuthorizationEngine;
pub use error::{AuthzError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bootstrap::{BootstrapManager, BootstrapState, ClaimOutcome};
    pub use crate::config::{
        EngineConfig, TenancyConfig, TenancyMode, TrustedChannelConfig, TrustedChannelEntry,
    };
    pub use crate::context::{AuthorizationContext, ContextResolver};
    pub use crate::directory::{
        InMemoryDirectory, LegacyProfile, Organization, OrganizationId, Principal,
        PrincipalDirectory, PrincipalId, PrincipalStatus, ResourceKind, ResourceRef, Role,
    };
    pub use crate::engine::AuthorizationEngine;
    pub use crate::error::{AuthzError, Result};
    pub use crate::policy::{
        Decision, DenyReason, Operation, PolicyError, PolicyEvaluator, Subject,
    };
    pub use crate::trusted::{TrustedCaller, TrustedChannelGate, TrustedCredential};
}
