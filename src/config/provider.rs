//! # Provider Configuration
//!
//! Provider-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_ARM_ENDPOINT, DEFAULT_CREATE_TIMEOUT_SECS, DEFAULT_DELETE_TIMEOUT_SECS,
    DEFAULT_LRO_POLL_INTERVAL_SECS, DEFAULT_READ_TIMEOUT_SECS, DEFAULT_UPDATE_TIMEOUT_SECS,
    MIN_LRO_POLL_INTERVAL_SECS,
};
use crate::registry::ResourceTimeouts;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ARM_SUBSCRIPTION_ID is required but is not set")]
    MissingSubscriptionId,
}

/// How the REST client obtains bearer tokens
#[derive(Clone, PartialEq, Eq)]
pub enum AuthConfig {
    /// Pre-issued bearer token (`ARM_ACCESS_TOKEN`), used for contract tests
    StaticToken(String),
    /// Azure Workload Identity for the given client ID (`ARM_CLIENT_ID`)
    WorkloadIdentity { client_id: String },
    /// Managed Identity of the host (default)
    ManagedIdentity,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaticToken(_) => f.write_str("StaticToken(<redacted>)"),
            Self::WorkloadIdentity { client_id } => f
                .debug_struct("WorkloadIdentity")
                .field("client_id", client_id)
                .finish(),
            Self::ManagedIdentity => f.write_str("ManagedIdentity"),
        }
    }
}

/// Provider feature toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    /// Refuse to create over an existing, unmanaged environment
    pub resources_should_be_imported: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            resources_should_be_imported: true,
        }
    }
}

/// Provider-level configuration
///
/// All settings except the subscription have defaults and can be overridden
/// via environment variables.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Subscription the environments live in (`ARM_SUBSCRIPTION_ID`)
    pub subscription_id: Option<String>,
    /// Resource Manager endpoint (`ARM_ENDPOINT`)
    pub endpoint: String,
    pub auth: AuthConfig,
    pub features: Features,
    /// Minimum interval between long-running operation polls (`ARM_LRO_POLL_INTERVAL_SECS`)
    pub lro_poll_interval_secs: u64,
    /// Per-operation default deadlines (`ARM_TIMEOUT_{CREATE,READ,UPDATE,DELETE}_SECS`)
    pub timeouts: ResourceTimeouts,
    /// Log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            subscription_id: None,
            endpoint: DEFAULT_ARM_ENDPOINT.to_string(),
            auth: AuthConfig::ManagedIdentity,
            features: Features::default(),
            lro_poll_interval_secs: DEFAULT_LRO_POLL_INTERVAL_SECS,
            timeouts: ResourceTimeouts::DEFAULT,
            log_level: "INFO".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let auth = if let Some(token) = lookup("ARM_ACCESS_TOKEN").filter(|t| !t.is_empty()) {
            AuthConfig::StaticToken(token)
        } else if let Some(client_id) = lookup("ARM_CLIENT_ID").filter(|c| !c.is_empty()) {
            AuthConfig::WorkloadIdentity { client_id }
        } else {
            AuthConfig::ManagedIdentity
        };

        let timeouts = ResourceTimeouts {
            create: secs_or_default(&lookup, "ARM_TIMEOUT_CREATE_SECS", DEFAULT_CREATE_TIMEOUT_SECS),
            read: secs_or_default(&lookup, "ARM_TIMEOUT_READ_SECS", DEFAULT_READ_TIMEOUT_SECS),
            update: secs_or_default(&lookup, "ARM_TIMEOUT_UPDATE_SECS", DEFAULT_UPDATE_TIMEOUT_SECS),
            delete: secs_or_default(&lookup, "ARM_TIMEOUT_DELETE_SECS", DEFAULT_DELETE_TIMEOUT_SECS),
        };

        Self {
            subscription_id: lookup("ARM_SUBSCRIPTION_ID").filter(|s| !s.is_empty()),
            endpoint: var_or_default_str(&lookup, "ARM_ENDPOINT", DEFAULT_ARM_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            auth,
            features: Features {
                resources_should_be_imported: var_or_default_bool(
                    &lookup,
                    "ARM_RESOURCES_SHOULD_BE_IMPORTED",
                    true,
                ),
            },
            lro_poll_interval_secs: var_or_default(
                &lookup,
                "ARM_LRO_POLL_INTERVAL_SECS",
                DEFAULT_LRO_POLL_INTERVAL_SECS,
            )
            .max(MIN_LRO_POLL_INTERVAL_SECS),
            timeouts,
            log_level: var_or_default_str(&lookup, "LOG_LEVEL", "INFO"),
            log_format: var_or_default_str(&lookup, "LOG_FORMAT", "text"),
        }
    }

    /// Subscription ID, required by the REST client
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSubscriptionId`] when unset.
    pub fn require_subscription_id(&self) -> Result<&str, ConfigError> {
        self.subscription_id
            .as_deref()
            .ok_or(ConfigError::MissingSubscriptionId)
    }

    /// Get long-running operation poll interval
    #[must_use]
    pub fn lro_poll_interval(&self) -> Duration {
        Duration::from_secs(self.lro_poll_interval_secs.max(MIN_LRO_POLL_INTERVAL_SECS))
    }
}

/// Read a variable or return the default value
fn var_or_default<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a variable as a boolean or return the default
fn var_or_default_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| {
            let v_lower = v.trim().to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

/// Read a variable as a string or return the default
fn var_or_default_str<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn secs_or_default<F>(lookup: &F, key: &str, default: u64) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    Duration::from_secs(var_or_default(lookup, key, default))
}
