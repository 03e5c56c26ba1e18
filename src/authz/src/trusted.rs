//! Trusted-Channel Gate: a narrow bypass for system-internal callers.
//!
//! Background sync jobs and identity-provider webhooks must write on behalf
//! of a principal before that principal's context exists. They authenticate
//! with a dedicated system credential that is a separate trust root — not a
//! role value — so no user-facing request path can escalate into it.
//! Credentials are configured as SHA-256 digests only; the raw secret never
//! lands in configuration or logs.

use metrics::counter;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::TrustedChannelConfig;
use crate::error::{AuthzError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// Credential
// ═══════════════════════════════════════════════════════════════════════════════

/// A raw secret presented by a system-internal caller.
#[derive(Clone)]
pub struct TrustedCredential(String);

impl TrustedCredential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Hex-encoded SHA-256 digest of the secret, the form stored in
    /// configuration.
    pub fn digest_hex(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl std::fmt::Debug for TrustedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the raw secret through Debug output.
        f.write_str("TrustedCredential(***)")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Trusted caller
// ═══════════════════════════════════════════════════════════════════════════════

/// Proof that a caller presented a valid trusted-channel credential.
///
/// There is no public constructor: only [`TrustedChannelGate::verify`] mints
/// values of this type, which is what keeps the bypass unreachable from
/// user-facing code paths.
#[derive(Debug, Clone)]
pub struct TrustedCaller {
    channel: String,
}

impl TrustedCaller {
    /// The configured name of the channel, for audit logs.
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Gate
// ═══════════════════════════════════════════════════════════════════════════════

/// Verifies presented credentials against the configured digest list.
#[derive(Debug, Clone, Default)]
pub struct TrustedChannelGate {
    channels: Vec<(String, [u8; 32])>,
}

impl TrustedChannelGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a gate from configuration.
    pub fn from_config(config: &TrustedChannelConfig) -> Result<Self> {
        let mut gate = Self::new();
        for entry in &config.channels {
            gate.register(&entry.name, &entry.sha256)?;
        }
        Ok(gate)
    }

    /// Register a channel by name and hex-encoded SHA-256 digest.
    pub fn register(&mut self, name: &str, digest_hex: &str) -> Result<()> {
        let bytes = hex::decode(digest_hex).map_err(|e| AuthzError::InvalidCredentialDigest {
            channel: name.to_string(),
            reason: e.to_string(),
        })?;
        let digest: [u8; 32] =
            bytes
                .try_into()
                .map_err(|_| AuthzError::InvalidCredentialDigest {
                    channel: name.to_string(),
                    reason: "digest must be 32 bytes".to_string(),
                })?;
        self.channels.push((name.to_string(), digest));
        Ok(())
    }

    /// Verify a presented credential, minting a [`TrustedCaller`] on match.
    pub fn verify(&self, credential: &TrustedCredential) -> Option<TrustedCaller> {
        let presented = Sha256::digest(credential.0.as_bytes());

        for (name, digest) in &self.channels {
            if constant_time_eq(digest, presented.as_slice()) {
                debug!(channel = %name, "Trusted-channel credential verified");
                counter!("authz_trusted_verifications_total", "outcome" => "accepted")
                    .increment(1);
                return Some(TrustedCaller {
                    channel: name.clone(),
                });
            }
        }

        warn!("Rejected trusted-channel credential");
        counter!("authz_trusted_verifications_total", "outcome" => "rejected").increment(1);
        None
    }
}

/// Compare two digests without early exit on the first mismatching byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
