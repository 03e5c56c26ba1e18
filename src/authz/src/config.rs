//! Configuration management.

use serde::Deserialize;

/// Main engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Tenancy configuration
    #[serde(default)]
    pub tenancy: TenancyConfig,

    /// Trusted-channel configuration
    #[serde(default)]
    pub trusted: TrustedChannelConfig,
}

/// Whether the deployment serves one organization or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenancyMode {
    SingleTenant,
    MultiTenant,
}

impl Default for TenancyMode {
    fn default() -> Self {
        Self::MultiTenant
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenancyConfig {
    /// Deployment tenancy mode
    #[serde(default)]
    pub mode: TenancyMode,

    /// Organization auto-assigned to new principals in single-tenant mode
    #[serde(default)]
    pub default_organization: Option<String>,

    /// Display name used when bootstrap creates the default organization
    #[serde(default = "default_organization_name")]
    pub default_organization_name: String,
}

impl TenancyConfig {
    pub fn is_single_tenant(&self) -> bool {
        self.mode == TenancyMode::SingleTenant
    }
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            mode: TenancyMode::default(),
            default_organization: None,
            default_organization_name: default_organization_name(),
        }
    }
}

/// One configured trusted channel: a name for audit logs and the SHA-256
/// digest of its credential (hex-encoded). Raw secrets never appear here.
#[derive(Debug, Clone, Deserialize)]
pub struct TrustedChannelEntry {
    pub name: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrustedChannelConfig {
    /// Registered system channels
    #[serde(default)]
    pub channels: Vec<TrustedChannelEntry>,
}

// Default value functions
fn default_organization_name() -> String {
    "Default Organization".to_string()
}

impl EngineConfig {
    /// Load configuration from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("SHIFTLINE").separator("__"))
            .build()?;

        let cfg: EngineConfig = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("SHIFTLINE").separator("__"))
            .build()?;

        let cfg: EngineConfig = config.try_deserialize()?;
        Ok(cfg)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
