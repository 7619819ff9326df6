//! # ARM Authentication
//!
//! Bearer tokens for Azure Resource Manager.
//!
//! Supports Workload Identity and Managed Identity through `azure_identity`,
//! plus a static token for contract tests and local debugging.

use crate::client::ApiError;
use crate::config::AuthConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use azure_core::credentials::{TokenCredential, TokenRequestOptions};
use azure_identity::{ManagedIdentityCredential, WorkloadIdentityCredential};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Source of bearer tokens for management requests
#[async_trait]
pub trait TokenSource: Send + Sync + fmt::Debug {
    async fn bearer_token(&self) -> Result<String, ApiError>;
}

/// Fixed token, never refreshed
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn bearer_token(&self) -> Result<String, ApiError> {
        Ok(self.0.clone())
    }
}

/// Token from an Azure identity credential, scoped to the ARM endpoint
pub struct AzureCredentialToken {
    credential: Arc<dyn TokenCredential>,
    scope: String,
}

impl fmt::Debug for AzureCredentialToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureCredentialToken")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl AzureCredentialToken {
    pub fn new(credential: Arc<dyn TokenCredential>, endpoint: &str) -> Self {
        Self {
            credential,
            scope: format!("{}/.default", endpoint.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl TokenSource for AzureCredentialToken {
    async fn bearer_token(&self) -> Result<String, ApiError> {
        let scopes = &[self.scope.as_str()];
        let options = Some(TokenRequestOptions::default());
        let token_response = self
            .credential
            .get_token(scopes, options)
            .await
            .map_err(|e| ApiError::Auth(e.to_string()))?;
        Ok(token_response.token.secret().to_string())
    }
}

/// Build the token source selected by the provider configuration
///
/// # Errors
///
/// Returns an error if the Azure credential cannot be constructed.
pub fn token_source(auth: &AuthConfig, endpoint: &str) -> Result<Arc<dyn TokenSource>> {
    let credential: Arc<dyn TokenCredential> = match auth {
        AuthConfig::StaticToken(token) => {
            debug!("Using static ARM access token");
            return Ok(Arc::new(StaticToken::new(token.clone())));
        }
        AuthConfig::WorkloadIdentity { client_id } => {
            info!(
                "Using Azure Workload Identity authentication with client ID: {}",
                client_id
            );
            let options = azure_identity::WorkloadIdentityCredentialOptions {
                client_id: Some(client_id.clone()),
                ..Default::default()
            };
            WorkloadIdentityCredential::new(Some(options))
                .context("Failed to create WorkloadIdentityCredential")?
        }
        AuthConfig::ManagedIdentity => {
            info!("No client ID configured, using Managed Identity");
            ManagedIdentityCredential::new(None)
                .context("Failed to create ManagedIdentityCredential")?
        }
    };

    Ok(Arc::new(AzureCredentialToken::new(credential, endpoint)))
}
