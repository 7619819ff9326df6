//! Common test utilities
//!
//! Provides rustls setup for the Pact tests and an in-memory
//! [`EnvironmentsApi`] for driving the adapter without Azure.

#![allow(dead_code, reason = "Each test binary uses a different subset")]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tsi_environment_provider::client::{
    ApiError, DeleteOutcome, EnvironmentResource, EnvironmentsApi, OperationHandle,
    OperationStatus, StandardEnvironmentParameters,
};
use tsi_environment_provider::client::models::StandardEnvironmentProperties;
use tsi_environment_provider::resource::{AdapterSettings, StorageLimitExceededBehavior};
use tsi_environment_provider::{EnvironmentConfig, EnvironmentResourceAdapter};

pub const SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000000";

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // Ignore the error if another test binary path already installed one
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

pub fn environment_id(resource_group: &str, name: &str) -> String {
    format!(
        "/subscriptions/{SUBSCRIPTION_ID}/resourceGroups/{resource_group}/providers/Microsoft.TimeSeriesInsights/environments/{name}"
    )
}

/// The configuration used by most lifecycle tests
pub fn sample_config() -> EnvironmentConfig {
    EnvironmentConfig {
        name: "env1".to_string(),
        location: "West Europe".to_string(),
        resource_group_name: "rg1".to_string(),
        sku_name: "S1_5".to_string(),
        storage_limit_exceeded_behavior: StorageLimitExceededBehavior::PurgeOldData,
        data_retention_time: "P7D".to_string(),
        tags: BTreeMap::from([("team".to_string(), "data".to_string())]),
    }
}

pub fn adapter(api: &Arc<FakeEnvironmentsApi>) -> EnvironmentResourceAdapter {
    adapter_with(api, AdapterSettings::default())
}

pub fn adapter_with(
    api: &Arc<FakeEnvironmentsApi>,
    settings: AdapterSettings,
) -> EnvironmentResourceAdapter {
    let api: Arc<dyn EnvironmentsApi> = Arc::clone(api) as Arc<dyn EnvironmentsApi>;
    EnvironmentResourceAdapter::new(api, settings)
}

/// A Standard environment as ARM would return it
pub fn standard_environment(resource_group: &str, name: &str) -> EnvironmentResource {
    EnvironmentResource {
        id: Some(environment_id(resource_group, name)),
        name: Some(name.to_string()),
        resource_type: Some("Microsoft.TimeSeriesInsights/Environments".to_string()),
        location: Some("westeurope".to_string()),
        tags: Some(BTreeMap::new()),
        kind: Some("Standard".to_string()),
        sku: Some(tsi_environment_provider::client::EnvironmentSku {
            name: "S1".to_string(),
            capacity: Some(1),
        }),
        properties: Some(StandardEnvironmentProperties {
            data_retention_time: Some("P30D".to_string()),
            storage_limit_exceeded_behavior: Some(StorageLimitExceededBehavior::PurgeOldData),
            provisioning_state: Some("Succeeded".to_string()),
            ..Default::default()
        }),
    }
}

#[derive(Default)]
struct FakeState {
    environments: HashMap<(String, String), EnvironmentResource>,
    calls: Vec<String>,
    pending_polls: usize,
    never_finish: bool,
    operation_failure: Option<String>,
    get_failure: Option<u16>,
    put_failure: Option<u16>,
    delete_failure: Option<u16>,
    async_delete: bool,
    vanish_after_put: bool,
    next_operation: usize,
}

/// In-memory environments API with scripted failures and a call log
#[derive(Default)]
pub struct FakeEnvironmentsApi {
    state: Mutex<FakeState>,
}

impl FakeEnvironmentsApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn insert(&self, resource_group: &str, resource: EnvironmentResource) {
        let name = resource.name.clone().unwrap();
        self.state()
            .environments
            .insert((resource_group.to_string(), name), resource);
    }

    pub fn environment(&self, resource_group: &str, name: &str) -> Option<EnvironmentResource> {
        self.state()
            .environments
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned()
    }

    /// Every request issued so far, e.g. `"get rg1/env1"`
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    /// Report `InProgress` this many times before succeeding
    pub fn set_pending_polls(&self, polls: usize) {
        self.state().pending_polls = polls;
    }

    pub fn set_never_finish(&self) {
        self.state().never_finish = true;
    }

    pub fn fail_operation(&self, reason: &str) {
        self.state().operation_failure = Some(reason.to_string());
    }

    pub fn fail_get(&self, status: u16) {
        self.state().get_failure = Some(status);
    }

    pub fn fail_put(&self, status: u16) {
        self.state().put_failure = Some(status);
    }

    pub fn fail_delete(&self, status: u16) {
        self.state().delete_failure = Some(status);
    }

    pub fn set_async_delete(&self) {
        self.state().async_delete = true;
    }

    /// Accept PUTs without storing the environment
    pub fn set_vanish_after_put(&self) {
        self.state().vanish_after_put = true;
    }

    fn operation_handle(state: &mut FakeState) -> OperationHandle {
        state.next_operation += 1;
        OperationHandle::AsyncOperation {
            url: format!(
                "https://management.azure.com/subscriptions/{SUBSCRIPTION_ID}/providers/Microsoft.TimeSeriesInsights/operationResults/{}",
                state.next_operation
            ),
            retry_after: None,
        }
    }
}

fn http_error(status: u16) -> ApiError {
    ApiError::Http {
        status,
        code: "InternalServerError".to_string(),
        message: "the service is having a bad day".to_string(),
    }
}

#[async_trait]
impl EnvironmentsApi for FakeEnvironmentsApi {
    fn subscription_id(&self) -> &str {
        SUBSCRIPTION_ID
    }

    async fn get(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<EnvironmentResource>, ApiError> {
        let mut state = self.state();
        state.calls.push(format!("get {resource_group}/{name}"));
        if let Some(status) = state.get_failure {
            return Err(http_error(status));
        }
        Ok(state
            .environments
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        parameters: &StandardEnvironmentParameters,
    ) -> Result<OperationHandle, ApiError> {
        let mut state = self.state();
        state.calls.push(format!("put {resource_group}/{name}"));
        if let Some(status) = state.put_failure {
            return Err(http_error(status));
        }

        if !state.vanish_after_put {
            let resource = EnvironmentResource {
                id: Some(environment_id(resource_group, name)),
                name: Some(name.to_string()),
                resource_type: Some("Microsoft.TimeSeriesInsights/Environments".to_string()),
                location: Some(parameters.location.clone()),
                tags: Some(parameters.tags.clone()),
                kind: Some(parameters.kind.clone()),
                sku: Some(parameters.sku.clone()),
                properties: Some(StandardEnvironmentProperties {
                    data_retention_time: Some(parameters.properties.data_retention_time.clone()),
                    storage_limit_exceeded_behavior: Some(
                        parameters.properties.storage_limit_exceeded_behavior,
                    ),
                    provisioning_state: Some("Succeeded".to_string()),
                    ..Default::default()
                }),
            };
            state
                .environments
                .insert((resource_group.to_string(), name.to_string()), resource);
        }

        if state.pending_polls > 0 || state.never_finish || state.operation_failure.is_some() {
            Ok(Self::operation_handle(&mut state))
        } else {
            Ok(OperationHandle::Completed)
        }
    }

    async fn delete(&self, resource_group: &str, name: &str) -> Result<DeleteOutcome, ApiError> {
        let mut state = self.state();
        state.calls.push(format!("delete {resource_group}/{name}"));
        if let Some(status) = state.delete_failure {
            return Err(http_error(status));
        }
        let removed = state
            .environments
            .remove(&(resource_group.to_string(), name.to_string()));
        if removed.is_none() {
            return Ok(DeleteOutcome::NotFound);
        }
        if state.async_delete {
            Ok(DeleteOutcome::Accepted(Self::operation_handle(&mut state)))
        } else {
            Ok(DeleteOutcome::Deleted)
        }
    }

    async fn poll(&self, _handle: &OperationHandle) -> Result<OperationStatus, ApiError> {
        let mut state = self.state();
        state.calls.push("poll".to_string());
        if let Some(reason) = state.operation_failure.clone() {
            return Ok(OperationStatus::Failed(reason));
        }
        if state.never_finish {
            return Ok(OperationStatus::InProgress);
        }
        if state.pending_polls > 0 {
            state.pending_polls -= 1;
            return Ok(OperationStatus::InProgress);
        }
        Ok(OperationStatus::Succeeded)
    }
}

/// Settings with a short poll interval
pub fn fast_settings() -> AdapterSettings {
    AdapterSettings {
        resources_should_be_imported: true,
        poll_interval: Duration::from_secs(1),
    }
}
