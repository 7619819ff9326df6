//! # Environments Client
//!
//! Outbound contract to the Azure Resource Manager environments API.
//!
//! The adapter only talks to [`EnvironmentsApi`]; [`rest::ArmEnvironmentsClient`]
//! is the production implementation and tests substitute an in-memory one.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub mod auth;
pub mod models;
pub mod rest;

pub use models::{EnvironmentResource, EnvironmentSku, StandardEnvironmentParameters};
pub use rest::ArmEnvironmentsClient;

/// Failures talking to the management API
///
/// "Not found" is not represented here; the trait methods report it as a value.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unexpected status {status}: {code}: {message}")]
    Http {
        status: u16,
        code: String,
        message: String,
    },

    #[error("sending request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("decoding response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("acquiring access token: {0}")]
    Auth(String),

    #[error("long-running operation failed: {0}")]
    Operation(String),
}

/// Reference to an in-flight long-running operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationHandle {
    /// The service finished synchronously; nothing to poll
    Completed,
    /// Poll an `Azure-AsyncOperation` status URL
    AsyncOperation {
        url: String,
        retry_after: Option<Duration>,
    },
    /// Poll a `Location` URL until it stops answering 202
    Location {
        url: String,
        retry_after: Option<Duration>,
    },
    /// Poll the resource itself until `provisioningState` is terminal
    ProvisioningState {
        url: String,
        retry_after: Option<Duration>,
    },
    /// Poll the resource itself until it answers 404
    UntilGone {
        url: String,
        retry_after: Option<Duration>,
    },
}

impl OperationHandle {
    /// Poll interval requested by the service, if any
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Completed => None,
            Self::AsyncOperation { retry_after, .. }
            | Self::Location { retry_after, .. }
            | Self::ProvisioningState { retry_after, .. }
            | Self::UntilGone { retry_after, .. } => *retry_after,
        }
    }
}

/// Result of polling an [`OperationHandle`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress,
    Succeeded,
    Failed(String),
    Canceled,
}

impl OperationStatus {
    /// Map an ARM `status` / `provisioningState` value
    ///
    /// Anything that is not one of the terminal states counts as in progress
    /// (`Accepted`, `Creating`, `Updating`, `Deleting`, `Running`, ...).
    #[must_use]
    pub fn from_arm_state(state: &str, error_message: Option<String>) -> Self {
        if state.eq_ignore_ascii_case("Succeeded") {
            Self::Succeeded
        } else if state.eq_ignore_ascii_case("Failed") {
            Self::Failed(error_message.unwrap_or_else(|| "operation reported Failed".to_string()))
        } else if state.eq_ignore_ascii_case("Canceled") || state.eq_ignore_ascii_case("Cancelled")
        {
            Self::Canceled
        } else {
            Self::InProgress
        }
    }
}

/// Result of a delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The service accepted the delete and is processing it asynchronously
    Accepted(OperationHandle),
    NotFound,
}

/// Management operations on Time Series Insights environments
#[async_trait]
pub trait EnvironmentsApi: Send + Sync {
    /// Subscription every request is addressed to
    fn subscription_id(&self) -> &str;

    /// Fetch an environment; `Ok(None)` when it does not exist
    async fn get(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<EnvironmentResource>, ApiError>;

    /// Submit a create-or-update request
    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        parameters: &StandardEnvironmentParameters,
    ) -> Result<OperationHandle, ApiError>;

    /// Submit a delete request
    async fn delete(&self, resource_group: &str, name: &str) -> Result<DeleteOutcome, ApiError>;

    /// Poll a long-running operation once
    async fn poll(&self, handle: &OperationHandle) -> Result<OperationStatus, ApiError>;
}
