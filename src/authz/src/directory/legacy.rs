//! Compatibility adapter for the legacy profile shape.
//!
//! The system this engine replaces kept two overlapping profile tables with
//! inconsistent fields. The canonical `Principal` is the single source of
//! truth; collaborators still speaking the old flat shape convert at the
//! boundary instead of maintaining a parallel table.

use serde::{Deserialize, Serialize};

use super::models::{OrganizationId, Principal, PrincipalStatus, Role};

/// The flat profile record external collaborators may still send or expect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyProfile {
    pub user_id: String,
    pub mail: String,
    pub full_name: String,
    pub org: Option<String>,
    pub is_admin: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl From<LegacyProfile> for Principal {
    fn from(legacy: LegacyProfile) -> Self {
        let mut principal = Principal::new(legacy.user_id, legacy.mail, legacy.full_name);
        if legacy.is_admin {
            principal.role = Role::Admin;
        }
        principal.organization_id = legacy.org.map(OrganizationId::new);
        if !legacy.enabled {
            principal.status = PrincipalStatus::Deactivated;
        }
        principal
    }
}

impl From<&Principal> for LegacyProfile {
    fn from(principal: &Principal) -> Self {
        Self {
            user_id: principal.id.as_str().to_string(),
            mail: principal.email.clone(),
            full_name: principal.display_name.clone(),
            org: principal
                .organization_id
                .as_ref()
                .map(|o| o.as_str().to_string()),
            is_admin: principal.role.is_admin(),
            enabled: principal.is_active(),
        }
    }
}
