//! Principal Directory: the durable store mapping a stable identity to its
//! profile — organization membership, display attributes, role.
//!
//! This module provides:
//! - **Models**: Principal, Organization, Role, and identifier newtypes
//! - **Storage seam**: the `PrincipalDirectory` trait plus a thread-safe
//!   in-memory implementation
//! - **Legacy adapter**: conversion to and from the old flat profile shape
//!
//! The directory owns no authorization logic; it only records facts the
//! Context Resolver and Bootstrap Manager act on.

pub mod legacy;
pub mod models;
pub mod store;

pub use legacy::LegacyProfile;
pub use models::{
    Organization, OrganizationId, Principal, PrincipalId, PrincipalStatus, ResourceKind,
    ResourceRef, Role,
};
pub use store::{InMemoryDirectory, PrincipalDirectory};
