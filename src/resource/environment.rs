//! # Environment Resource Adapter
//!
//! Maps [`EnvironmentConfig`] onto the environments management API.
//!
//! ## Lifecycle
//!
//! - **create / update**: validate, guard against adopting an unmanaged
//!   environment, submit the `PUT`, wait for provisioning, read back the ID
//! - **read**: fetch and decode; absence is `Ok(None)`
//! - **delete**: absence counts as success; accepted deletes are waited for
//!
//! Every remote call runs under the operation's deadline and the caller's
//! cancellation token.

use crate::client::models::{StandardEnvironmentCreationProperties, STANDARD_KIND};
use crate::client::{
    ApiError, DeleteOutcome, EnvironmentsApi, OperationHandle, StandardEnvironmentParameters,
};
use crate::config::ProviderConfig;
use crate::constants::{DEFAULT_LRO_POLL_INTERVAL_SECS, TSI_ENVIRONMENT_RESOURCE_TYPE};
use crate::error::EnvironmentError;
use crate::lro::{bounded, deadline_after, wait_for_completion, Interrupted, WaitError};
use crate::observability::metrics;
use crate::registry::{Operation, OperationContext, ResourceHandler};
use crate::resource::id::EnvironmentId;
use crate::resource::location::normalize_location;
use crate::resource::schema::EnvironmentConfig;
use crate::resource::sku::{format_sku, parse_sku};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Adapter behaviour taken from provider configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterSettings {
    /// Refuse to create over an existing environment that is not in state
    pub resources_should_be_imported: bool,
    pub poll_interval: Duration,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            resources_should_be_imported: true,
            poll_interval: Duration::from_secs(DEFAULT_LRO_POLL_INTERVAL_SECS),
        }
    }
}

impl From<&ProviderConfig> for AdapterSettings {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            resources_should_be_imported: config.features.resources_should_be_imported,
            poll_interval: config.lro_poll_interval(),
        }
    }
}

/// Lifecycle handlers for `azurerm_time_series_insights_environment`
#[derive(Clone)]
pub struct EnvironmentResourceAdapter {
    api: Arc<dyn EnvironmentsApi>,
    settings: AdapterSettings,
}

impl fmt::Debug for EnvironmentResourceAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentResourceAdapter")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl EnvironmentResourceAdapter {
    pub fn new(api: Arc<dyn EnvironmentsApi>, settings: AdapterSettings) -> Self {
        Self { api, settings }
    }

    /// Create the environment, or update it in place when `existing_id` is set
    ///
    /// # Errors
    ///
    /// - [`EnvironmentError::InvalidSku`] / [`EnvironmentError::Validation`] before any remote call,
    ///   including an update whose name or resource group differs from `existing_id`
    /// - [`EnvironmentError::SubscriptionMismatch`] if `existing_id` is in another subscription
    /// - [`EnvironmentError::AlreadyExists`] when an unmanaged environment occupies the name
    /// - [`EnvironmentError::OperationFailed`], [`EnvironmentError::ReadBack`],
    ///   [`EnvironmentError::Timeout`], [`EnvironmentError::Cancelled`] from the remote side
    pub async fn create_or_update(
        &self,
        config: &EnvironmentConfig,
        existing_id: Option<&EnvironmentId>,
        ctx: &OperationContext,
    ) -> Result<EnvironmentId, EnvironmentError> {
        let operation = if existing_id.is_some() {
            Operation::Update
        } else {
            Operation::Create
        };
        let span = match operation {
            Operation::Update => info_span!(
                "tsi.environment.update",
                environment.name = %config.name,
                resource_group = %config.resource_group_name,
            ),
            _ => info_span!(
                "tsi.environment.create",
                environment.name = %config.name,
                resource_group = %config.resource_group_name,
            ),
        };
        let start = Instant::now();

        let result = self
            .apply(operation, config, existing_id, ctx)
            .instrument(span)
            .await;
        record(operation, if result.is_ok() { "success" } else { "error" }, start);
        result
    }

    async fn apply(
        &self,
        operation: Operation,
        config: &EnvironmentConfig,
        existing_id: Option<&EnvironmentId>,
        ctx: &OperationContext,
    ) -> Result<EnvironmentId, EnvironmentError> {
        let name = config.name.as_str();
        let resource_group = config.resource_group_name.as_str();

        let sku = parse_sku(&config.sku_name)?;
        config.validate()?;
        if let Some(existing_id) = existing_id {
            self.ensure_addressable(existing_id)?;
            ensure_same_identity(config, existing_id)?;
        }

        let call = Call::start(operation, name, resource_group, ctx);

        if existing_id.is_none() && self.settings.resources_should_be_imported {
            let existing = call
                .run(self.api.get(resource_group, name))
                .await?
                .map_err(|source| call.read_error(source))?;

            if let Some(existing) = existing {
                if !existing.is_standard() {
                    return Err(call.not_standard(existing.kind));
                }
                if let Some(id) = existing.id.filter(|id| !id.is_empty()) {
                    return Err(EnvironmentError::AlreadyExists {
                        resource_type: TSI_ENVIRONMENT_RESOURCE_TYPE,
                        id,
                    });
                }
            }
        }

        let parameters = StandardEnvironmentParameters {
            location: normalize_location(&config.location),
            tags: config.tags.clone(),
            kind: STANDARD_KIND.to_string(),
            sku: sku.into(),
            properties: StandardEnvironmentCreationProperties {
                data_retention_time: config.data_retention_time.clone(),
                storage_limit_exceeded_behavior: config.storage_limit_exceeded_behavior,
            },
        };

        info!(
            "Submitting {} of Time Series Insights Environment {} with SKU {}",
            operation, name, sku
        );
        let handle = call
            .run(self.api.create_or_update(resource_group, name, &parameters))
            .await?
            .map_err(|e| call.failed(e))?;

        self.wait(&call, &handle)
            .await
            .map_err(|e| call.wait_failed(e))?;

        let resource = call
            .run(self.api.get(resource_group, name))
            .await?
            .map_err(|e| call.read_back(e))?
            .ok_or_else(|| call.read_back("environment was not found"))?;

        if !resource.is_standard() {
            return Err(call.read_back(format!(
                "resource was not a standard environment, kind was {:?}",
                resource.kind
            )));
        }

        let raw_id = resource
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| call.read_back("service returned an empty ID"))?;
        let id = EnvironmentId::parse(&raw_id)?;

        info!(
            "Time Series Insights Environment {} {} succeeded: {}",
            name, operation, id
        );
        Ok(id)
    }

    /// Fetch the current state of the environment
    ///
    /// # Errors
    ///
    /// - [`EnvironmentError::SubscriptionMismatch`] if `id` is in another subscription
    /// - [`EnvironmentError::Read`] for any failure other than not-found
    /// - [`EnvironmentError::NotStandardEnvironment`] if the ID now points at another kind
    /// - [`EnvironmentError::Timeout`] / [`EnvironmentError::Cancelled`]
    pub async fn read(
        &self,
        id: &EnvironmentId,
        ctx: &OperationContext,
    ) -> Result<Option<EnvironmentConfig>, EnvironmentError> {
        let span = tracing::debug_span!(
            "tsi.environment.read",
            environment.name = %id.name,
            resource_group = %id.resource_group,
        );
        let start = Instant::now();

        let result = self.fetch(id, ctx).instrument(span).await;
        let outcome = match &result {
            Ok(Some(_)) => "success",
            Ok(None) => "absent",
            Err(_) => "error",
        };
        record(Operation::Read, outcome, start);
        result
    }

    async fn fetch(
        &self,
        id: &EnvironmentId,
        ctx: &OperationContext,
    ) -> Result<Option<EnvironmentConfig>, EnvironmentError> {
        self.ensure_addressable(id)?;
        let call = Call::start(Operation::Read, &id.name, &id.resource_group, ctx);

        let Some(resource) = call
            .run(self.api.get(&id.resource_group, &id.name))
            .await?
            .map_err(|source| call.read_error(source))?
        else {
            info!(
                "Time Series Insights Environment {} was not found - removing from state",
                id
            );
            return Ok(None);
        };

        if !resource.is_standard() {
            return Err(call.not_standard(resource.kind));
        }

        let sku_name = format_sku(resource.sku.as_ref());
        if sku_name.is_empty() {
            warn!(
                "Time Series Insights Environment {} returned no SKU capacity; sku_name will be empty",
                id
            );
        }

        let properties = resource.properties.unwrap_or_default();
        debug!("Read Time Series Insights Environment {}", id);

        Ok(Some(EnvironmentConfig {
            name: resource.name.unwrap_or_else(|| id.name.clone()),
            location: resource
                .location
                .as_deref()
                .map(normalize_location)
                .unwrap_or_default(),
            resource_group_name: id.resource_group.clone(),
            sku_name,
            storage_limit_exceeded_behavior: properties
                .storage_limit_exceeded_behavior
                .unwrap_or_default(),
            data_retention_time: properties.data_retention_time.unwrap_or_default(),
            tags: resource.tags.unwrap_or_default(),
        }))
    }

    /// Delete the environment; already gone counts as success
    ///
    /// # Errors
    ///
    /// - [`EnvironmentError::SubscriptionMismatch`] if `id` is in another subscription
    /// - [`EnvironmentError::Delete`] for any failure other than not-found
    /// - [`EnvironmentError::Timeout`] / [`EnvironmentError::Cancelled`]
    pub async fn delete(
        &self,
        id: &EnvironmentId,
        ctx: &OperationContext,
    ) -> Result<(), EnvironmentError> {
        let span = info_span!(
            "tsi.environment.delete",
            environment.name = %id.name,
            resource_group = %id.resource_group,
        );
        let start = Instant::now();

        let result = self.remove(id, ctx).instrument(span).await;
        record(
            Operation::Delete,
            if result.is_ok() { "success" } else { "error" },
            start,
        );
        result
    }

    async fn remove(
        &self,
        id: &EnvironmentId,
        ctx: &OperationContext,
    ) -> Result<(), EnvironmentError> {
        self.ensure_addressable(id)?;
        let call = Call::start(Operation::Delete, &id.name, &id.resource_group, ctx);

        info!("Deleting Time Series Insights Environment {}", id);
        let outcome = call
            .run(self.api.delete(&id.resource_group, &id.name))
            .await?
            .map_err(|source| call.delete_error(source))?;

        match outcome {
            DeleteOutcome::NotFound => {
                debug!("Time Series Insights Environment {} was already gone", id);
            }
            DeleteOutcome::Deleted => {}
            DeleteOutcome::Accepted(handle) => {
                self.wait(&call, &handle).await.map_err(|e| match e {
                    WaitError::Failed(reason) => call.delete_error(ApiError::Operation(reason)),
                    WaitError::Api(source) => call.delete_error(source),
                    other => call.wait_failed(other),
                })?;
            }
        }

        info!("Deleted Time Series Insights Environment {}", id);
        Ok(())
    }

    /// Check an import ID without touching the remote API
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::MalformedId`] if `raw` is not an environment ID.
    pub fn validate_id(raw: &str) -> Result<EnvironmentId, EnvironmentError> {
        Ok(EnvironmentId::parse(raw)?)
    }

    /// The client can only reach environments in its own subscription
    fn ensure_addressable(&self, id: &EnvironmentId) -> Result<(), EnvironmentError> {
        let configured = self.api.subscription_id();
        if id.subscription_id.eq_ignore_ascii_case(configured) {
            return Ok(());
        }
        Err(EnvironmentError::SubscriptionMismatch {
            id: id.to_string(),
            id_subscription: id.subscription_id.clone(),
            configured: configured.to_string(),
        })
    }

    async fn wait(&self, call: &Call<'_>, handle: &OperationHandle) -> Result<(), WaitError> {
        wait_for_completion(
            self.api.as_ref(),
            handle,
            call.deadline,
            call.cancel,
            self.settings.poll_interval,
        )
        .await
    }
}

#[async_trait]
impl ResourceHandler for EnvironmentResourceAdapter {
    type Config = EnvironmentConfig;
    type Id = EnvironmentId;
    type Error = EnvironmentError;

    async fn create_or_update(
        &self,
        config: &EnvironmentConfig,
        existing_id: Option<&EnvironmentId>,
        ctx: &OperationContext,
    ) -> Result<EnvironmentId, EnvironmentError> {
        EnvironmentResourceAdapter::create_or_update(self, config, existing_id, ctx).await
    }

    async fn read(
        &self,
        id: &EnvironmentId,
        ctx: &OperationContext,
    ) -> Result<Option<EnvironmentConfig>, EnvironmentError> {
        EnvironmentResourceAdapter::read(self, id, ctx).await
    }

    async fn delete(
        &self,
        id: &EnvironmentId,
        ctx: &OperationContext,
    ) -> Result<(), EnvironmentError> {
        EnvironmentResourceAdapter::delete(self, id, ctx).await
    }

    fn validate_id(&self, raw: &str) -> Result<EnvironmentId, EnvironmentError> {
        EnvironmentResourceAdapter::validate_id(raw)
    }
}

/// Import validator registered for the environment resource type
///
/// # Errors
///
/// Returns [`EnvironmentError::MalformedId`] if `raw` is not an environment ID.
pub fn validate_environment_import_id(raw: &str) -> Result<(), EnvironmentError> {
    EnvironmentId::parse(raw)?;
    Ok(())
}

/// An update must address the environment named by its stored ID
fn ensure_same_identity(
    config: &EnvironmentConfig,
    existing_id: &EnvironmentId,
) -> Result<(), EnvironmentError> {
    if config.name != existing_id.name {
        return Err(EnvironmentError::validation(
            "name",
            format!(
                "{:?} does not match existing environment {}; changing it requires replacement",
                config.name, existing_id
            ),
        ));
    }
    if config.resource_group_name != existing_id.resource_group {
        return Err(EnvironmentError::validation(
            "resource_group_name",
            format!(
                "{:?} does not match existing environment {}; changing it requires replacement",
                config.resource_group_name, existing_id
            ),
        ));
    }
    Ok(())
}

fn record(operation: Operation, outcome: &str, start: Instant) {
    metrics::record_operation(operation.as_str(), outcome, start.elapsed().as_secs_f64());
}

/// One lifecycle operation in flight: its deadline and error context
struct Call<'a> {
    operation: Operation,
    name: &'a str,
    resource_group: &'a str,
    timeout: Duration,
    deadline: Instant,
    cancel: &'a CancellationToken,
}

impl<'a> Call<'a> {
    fn start(
        operation: Operation,
        name: &'a str,
        resource_group: &'a str,
        ctx: &'a OperationContext,
    ) -> Self {
        let timeout = ctx.timeouts.for_operation(operation);
        Self {
            operation,
            name,
            resource_group,
            timeout,
            deadline: deadline_after(timeout),
            cancel: &ctx.cancel,
        }
    }

    async fn run<F, T>(&self, fut: F) -> Result<T, EnvironmentError>
    where
        F: Future<Output = T>,
    {
        bounded(self.deadline, self.cancel, fut)
            .await
            .map_err(|interrupted| self.interrupted(interrupted))
    }

    fn interrupted(&self, interrupted: Interrupted) -> EnvironmentError {
        match interrupted {
            Interrupted::TimedOut => EnvironmentError::Timeout {
                operation: self.operation,
                name: self.name.to_string(),
                resource_group: self.resource_group.to_string(),
                timeout: self.timeout,
            },
            Interrupted::Cancelled => EnvironmentError::Cancelled {
                operation: self.operation,
                name: self.name.to_string(),
                resource_group: self.resource_group.to_string(),
            },
        }
    }

    fn wait_failed(&self, error: WaitError) -> EnvironmentError {
        match error {
            WaitError::TimedOut => self.interrupted(Interrupted::TimedOut),
            WaitError::Cancelled => self.interrupted(Interrupted::Cancelled),
            WaitError::Failed(reason) => self.failed(reason),
            WaitError::Api(source) => self.failed(source),
        }
    }

    fn failed(&self, reason: impl fmt::Display) -> EnvironmentError {
        EnvironmentError::OperationFailed {
            operation: self.operation,
            name: self.name.to_string(),
            resource_group: self.resource_group.to_string(),
            reason: reason.to_string(),
        }
    }

    fn read_back(&self, reason: impl fmt::Display) -> EnvironmentError {
        EnvironmentError::ReadBack {
            name: self.name.to_string(),
            resource_group: self.resource_group.to_string(),
            reason: reason.to_string(),
        }
    }

    fn read_error(&self, source: ApiError) -> EnvironmentError {
        EnvironmentError::Read {
            name: self.name.to_string(),
            resource_group: self.resource_group.to_string(),
            source,
        }
    }

    fn delete_error(&self, source: ApiError) -> EnvironmentError {
        EnvironmentError::Delete {
            name: self.name.to_string(),
            resource_group: self.resource_group.to_string(),
            source,
        }
    }

    fn not_standard(&self, kind: Option<String>) -> EnvironmentError {
        EnvironmentError::NotStandardEnvironment {
            name: self.name.to_string(),
            resource_group: self.resource_group.to_string(),
            kind,
        }
    }
}
