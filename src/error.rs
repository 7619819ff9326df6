//! # Errors
//!
//! Typed failures of the environment lifecycle operations.
//!
//! "Not found" is never an error here: `read` returns `None` and `delete`
//! succeeds. Everything below aborts the current operation and leaves the
//! caller's record untouched.

use crate::client::ApiError;
use crate::registry::Operation;
use crate::resource::id::MalformedIdError;
use crate::resource::sku::SkuError;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`EnvironmentResourceAdapter`](crate::resource::EnvironmentResourceAdapter)
#[derive(Debug, Error)]
pub enum EnvironmentError {
    /// The configuration record failed validation before any remote call
    #[error("invalid value for `{field}`: {message}")]
    Validation { field: &'static str, message: String },

    /// `sku_name` could not be expanded into a tier and capacity
    #[error("expanding sku: {0}")]
    InvalidSku(#[from] SkuError),

    #[error(transparent)]
    MalformedId(#[from] MalformedIdError),

    /// The ID addresses a subscription other than the one the client is bound to
    #[error(
        "Time Series Insights Environment ID {id:?} belongs to subscription {id_subscription:?} but the provider is configured for subscription {configured:?}"
    )]
    SubscriptionMismatch {
        id: String,
        id_subscription: String,
        configured: String,
    },

    /// An unmanaged resource already occupies the name; it must be imported first
    #[error(
        "a resource with the ID {id:?} already exists - to be managed this resource needs to be imported into the state (resource type {resource_type:?})"
    )]
    AlreadyExists {
        resource_type: &'static str,
        id: String,
    },

    #[error(
        "existing resource was not a standard Time Series Insights Environment {name:?} (Resource Group {resource_group:?}), kind was {kind:?}"
    )]
    NotStandardEnvironment {
        name: String,
        resource_group: String,
        kind: Option<String>,
    },

    /// Submitting the request or the provisioning operation itself failed
    #[error(
        "{operation} of Time Series Insights Environment {name:?} (Resource Group {resource_group:?}) failed: {reason}"
    )]
    OperationFailed {
        operation: Operation,
        name: String,
        resource_group: String,
        reason: String,
    },

    /// The resource could not be confirmed after provisioning completed
    #[error(
        "retrieving Time Series Insights Environment {name:?} (Resource Group {resource_group:?}) after provisioning: {reason}"
    )]
    ReadBack {
        name: String,
        resource_group: String,
        reason: String,
    },

    #[error(
        "retrieving Time Series Insights Environment {name:?} (Resource Group {resource_group:?}): {source}"
    )]
    Read {
        name: String,
        resource_group: String,
        #[source]
        source: ApiError,
    },

    #[error(
        "deleting Time Series Insights Environment {name:?} (Resource Group {resource_group:?}): {source}"
    )]
    Delete {
        name: String,
        resource_group: String,
        #[source]
        source: ApiError,
    },

    /// The operation did not finish within its deadline; remote state may be partially applied
    #[error(
        "timed out after {timeout:?} during {operation} of Time Series Insights Environment {name:?} (Resource Group {resource_group:?})"
    )]
    Timeout {
        operation: Operation,
        name: String,
        resource_group: String,
        timeout: Duration,
    },

    /// The caller's cancellation token fired; the remote operation keeps running
    #[error(
        "{operation} of Time Series Insights Environment {name:?} (Resource Group {resource_group:?}) was cancelled"
    )]
    Cancelled {
        operation: Operation,
        name: String,
        resource_group: String,
    },
}

impl EnvironmentError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}
