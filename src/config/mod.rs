//! # Configuration
//!
//! - `provider`: provider-level settings loaded from environment variables

pub mod provider;

pub use provider::{AuthConfig, ConfigError, Features, ProviderConfig};
