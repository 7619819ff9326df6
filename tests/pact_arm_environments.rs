//! Pact contract tests for the Time Series Insights environments ARM API
//!
//! These tests define the contract between the provider and Azure Resource
//! Manager. Each one starts a Pact mock server and drives
//! `ArmEnvironmentsClient` against it with a static bearer token.

#[cfg(test)]
mod common;

use common::{init_rustls, SUBSCRIPTION_ID};
use pact_consumer::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tsi_environment_provider::client::auth::StaticToken;
use tsi_environment_provider::client::models::{
    StandardEnvironmentCreationProperties, STANDARD_KIND,
};
use tsi_environment_provider::client::{
    ApiError, DeleteOutcome, EnvironmentSku, EnvironmentsApi, OperationHandle, OperationStatus,
    StandardEnvironmentParameters,
};
use tsi_environment_provider::resource::StorageLimitExceededBehavior;
use tsi_environment_provider::ArmEnvironmentsClient;

const API_VERSION: &str = "2018-08-15-preview";

fn environment_path(name: &str) -> String {
    format!(
        "/subscriptions/{SUBSCRIPTION_ID}/resourceGroups/rg1/providers/Microsoft.TimeSeriesInsights/environments/{name}"
    )
}

fn operation_path(operation: &str) -> String {
    format!(
        "/subscriptions/{SUBSCRIPTION_ID}/providers/Microsoft.TimeSeriesInsights/locations/westeurope/operationResults/{operation}"
    )
}

fn client(base_url: &str) -> ArmEnvironmentsClient {
    init_rustls();
    ArmEnvironmentsClient::new(
        base_url,
        SUBSCRIPTION_ID,
        Arc::new(StaticToken::new("test-token")),
    )
    .expect("Failed to create client")
}

/// mock_server.url() carries a trailing slash
fn base_url(mut url: String) -> String {
    if url.ends_with('/') {
        url.pop();
    }
    url
}

fn parameters() -> StandardEnvironmentParameters {
    StandardEnvironmentParameters {
        location: "westeurope".to_string(),
        tags: BTreeMap::new(),
        kind: STANDARD_KIND.to_string(),
        sku: EnvironmentSku {
            name: "S1".to_string(),
            capacity: Some(5),
        },
        properties: StandardEnvironmentCreationProperties {
            data_retention_time: "P7D".to_string(),
            storage_limit_exceeded_behavior: StorageLimitExceededBehavior::PurgeOldData,
        },
    }
}

fn environment_body(provisioning_state: &str) -> serde_json::Value {
    json!({
        "id": environment_path("env1"),
        "name": "env1",
        "type": "Microsoft.TimeSeriesInsights/Environments",
        "location": "westeurope",
        "kind": "Standard",
        "sku": { "name": "S1", "capacity": 5 },
        "tags": {},
        "properties": {
            "dataRetentionTime": "P7D",
            "storageLimitExceededBehavior": "PurgeOldData",
            "provisioningState": provisioning_state,
            "creationTime": "2024-01-01T00:00:00Z",
            "dataAccessId": "c2a1b2f0-0000-0000-0000-000000000000",
            "dataAccessFqdn": "c2a1b2f0-0000-0000-0000-000000000000.env.timeseries.azure.com"
        }
    })
}

#[tokio::test]
async fn test_arm_get_environment_contract() {
    let mut pact_builder = PactBuilder::new("TSI-Environment-Provider", "Azure-Resource-Manager");

    pact_builder.interaction("get a Time Series Insights environment", "", |mut i| {
        i.given("environment env1 exists in resource group rg1");
        i.request
            .method("GET")
            .path(environment_path("env1").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(environment_body("Succeeded"));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = client(&base_url(mock_server.url().to_string()));

    let environment = client
        .get("rg1", "env1")
        .await
        .expect("Failed to get environment")
        .expect("Environment should exist");

    assert!(environment.is_standard());
    assert_eq!(environment.provisioning_state(), Some("Succeeded"));
    assert_eq!(
        environment.sku,
        Some(EnvironmentSku {
            name: "S1".to_string(),
            capacity: Some(5)
        })
    );
}

#[tokio::test]
async fn test_arm_get_missing_environment_contract() {
    let mut pact_builder = PactBuilder::new("TSI-Environment-Provider", "Azure-Resource-Manager");

    pact_builder.interaction("get a Time Series Insights environment that does not exist", "", |mut i| {
        i.given("environment missing does not exist in resource group rg1");
        i.request
            .method("GET")
            .path(environment_path("missing").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token");
        i.response
            .status(404)
            .header("content-type", "application/json")
            .json_body(json!({
                "error": {
                    "code": "ResourceNotFound",
                    "message": "The Resource 'Microsoft.TimeSeriesInsights/environments/missing' under resource group 'rg1' was not found."
                }
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = client(&base_url(mock_server.url().to_string()));

    let environment = client
        .get("rg1", "missing")
        .await
        .expect("Not found should not be an error");
    assert!(environment.is_none());
}

#[tokio::test]
async fn test_arm_get_error_envelope_contract() {
    let mut pact_builder = PactBuilder::new("TSI-Environment-Provider", "Azure-Resource-Manager");

    pact_builder.interaction("get a Time Series Insights environment without permission", "", |mut i| {
        i.given("the caller lacks read permission on resource group rg1");
        i.request
            .method("GET")
            .path(environment_path("env1").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token");
        i.response
            .status(403)
            .header("content-type", "application/json")
            .json_body(json!({
                "error": {
                    "code": "AuthorizationFailed",
                    "message": "The client does not have authorization to perform action 'Microsoft.TimeSeriesInsights/environments/read'."
                }
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = client(&base_url(mock_server.url().to_string()));

    let err = client.get("rg1", "env1").await.unwrap_err();
    match err {
        ApiError::Http {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 403);
            assert_eq!(code, "AuthorizationFailed");
            assert!(message.contains("environments/read"));
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_arm_put_environment_synchronous_contract() {
    let mut pact_builder = PactBuilder::new("TSI-Environment-Provider", "Azure-Resource-Manager");

    pact_builder.interaction("create a Time Series Insights environment synchronously", "", |mut i| {
        i.given("resource group rg1 exists");
        i.request
            .method("PUT")
            .path(environment_path("env1").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token")
            .header("content-type", "application/json")
            .json_body(json!({
                "location": "westeurope",
                "tags": {},
                "kind": "Standard",
                "sku": { "name": "S1", "capacity": 5 },
                "properties": {
                    "dataRetentionTime": "P7D",
                    "storageLimitExceededBehavior": "PurgeOldData"
                }
            }));
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(environment_body("Succeeded"));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = client(&base_url(mock_server.url().to_string()));

    let handle = client
        .create_or_update("rg1", "env1", &parameters())
        .await
        .expect("Failed to create environment");
    assert_eq!(handle, OperationHandle::Completed);
}

#[tokio::test]
async fn test_arm_put_environment_async_contract() {
    let mut pact_builder = PactBuilder::new("TSI-Environment-Provider", "Azure-Resource-Manager");
    let status_url = format!("{}?api-version={API_VERSION}", operation_path("op-create"));

    pact_builder.interaction("create a Time Series Insights environment asynchronously", "", |mut i| {
        i.given("resource group rg1 exists and provisioning is asynchronous");
        i.request
            .method("PUT")
            .path(environment_path("env1").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token")
            .header("content-type", "application/json")
            .json_body(json!({
                "location": "westeurope",
                "tags": {},
                "kind": "Standard",
                "sku": { "name": "S1", "capacity": 5 },
                "properties": {
                    "dataRetentionTime": "P7D",
                    "storageLimitExceededBehavior": "PurgeOldData"
                }
            }));
        i.response
            .status(201)
            .header("content-type", "application/json")
            .header("Azure-AsyncOperation", status_url.as_str())
            .header("Retry-After", "5")
            .json_body(environment_body("Creating"));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = client(&base_url(mock_server.url().to_string()));

    let handle = client
        .create_or_update("rg1", "env1", &parameters())
        .await
        .expect("Failed to submit environment");
    match handle {
        OperationHandle::AsyncOperation { url, retry_after } => {
            assert_eq!(url, status_url);
            assert_eq!(retry_after, Some(Duration::from_secs(5)));
        }
        other => panic!("expected AsyncOperation handle, got {other:?}"),
    }
}

#[tokio::test]
async fn test_arm_poll_async_operation_contract() {
    let mut pact_builder = PactBuilder::new("TSI-Environment-Provider", "Azure-Resource-Manager");

    pact_builder.interaction("poll a running environment operation", "", |mut i| {
        i.given("operation op-running is still in progress");
        i.request
            .method("GET")
            .path(operation_path("op-running").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "status": "InProgress" }));
        i
    });

    pact_builder.interaction("poll a failed environment operation", "", |mut i| {
        i.given("operation op-failed has failed");
        i.request
            .method("GET")
            .path(operation_path("op-failed").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "status": "Failed",
                "error": {
                    "code": "InvalidSkuCapacity",
                    "message": "The requested capacity is not available."
                }
            }));
        i
    });

    pact_builder.interaction("poll a succeeded environment operation", "", |mut i| {
        i.given("operation op-done has succeeded");
        i.request
            .method("GET")
            .path(operation_path("op-done").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "status": "Succeeded" }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = client(&base_url(mock_server.url().to_string()));

    let handle = |operation: &str| OperationHandle::AsyncOperation {
        url: format!("{}?api-version={API_VERSION}", operation_path(operation)),
        retry_after: None,
    };

    assert_eq!(
        client.poll(&handle("op-running")).await.unwrap(),
        OperationStatus::InProgress
    );
    assert_eq!(
        client.poll(&handle("op-failed")).await.unwrap(),
        OperationStatus::Failed(
            "InvalidSkuCapacity: The requested capacity is not available.".to_string()
        )
    );
    assert_eq!(
        client.poll(&handle("op-done")).await.unwrap(),
        OperationStatus::Succeeded
    );
}

#[tokio::test]
async fn test_arm_delete_environment_contract() {
    let mut pact_builder = PactBuilder::new("TSI-Environment-Provider", "Azure-Resource-Manager");

    pact_builder.interaction("delete a Time Series Insights environment", "", |mut i| {
        i.given("environment env1 exists in resource group rg1");
        i.request
            .method("DELETE")
            .path(environment_path("env1").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token");
        i.response.status(200);
        i
    });

    pact_builder.interaction("delete a Time Series Insights environment with no content", "", |mut i| {
        i.given("environment env2 exists in resource group rg1");
        i.request
            .method("DELETE")
            .path(environment_path("env2").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token");
        i.response.status(204);
        i
    });

    pact_builder.interaction("delete a Time Series Insights environment that does not exist", "", |mut i| {
        i.given("environment missing does not exist in resource group rg1");
        i.request
            .method("DELETE")
            .path(environment_path("missing").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token");
        i.response.status(404);
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = client(&base_url(mock_server.url().to_string()));

    assert_eq!(
        client.delete("rg1", "env1").await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert_eq!(
        client.delete("rg1", "env2").await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert_eq!(
        client.delete("rg1", "missing").await.unwrap(),
        DeleteOutcome::NotFound
    );
}

#[tokio::test]
async fn test_arm_delete_environment_async_contract() {
    let mut pact_builder = PactBuilder::new("TSI-Environment-Provider", "Azure-Resource-Manager");
    let location_url = format!("{}?api-version={API_VERSION}", operation_path("op-delete"));

    pact_builder.interaction("delete a Time Series Insights environment asynchronously", "", |mut i| {
        i.given("environment env1 exists and deletion is asynchronous");
        i.request
            .method("DELETE")
            .path(environment_path("env1").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token");
        i.response
            .status(202)
            .header("Location", location_url.as_str())
            .header("Retry-After", "10");
        i
    });

    pact_builder.interaction("poll an environment deletion that is still running", "", |mut i| {
        i.given("deletion op-delete is still in progress");
        i.request
            .method("GET")
            .path(operation_path("op-delete").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token");
        i.response.status(202).header("Retry-After", "10");
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = client(&base_url(mock_server.url().to_string()));

    let outcome = client.delete("rg1", "env1").await.unwrap();
    let DeleteOutcome::Accepted(handle) = outcome else {
        panic!("expected Accepted, got {outcome:?}");
    };
    assert_eq!(
        handle,
        OperationHandle::Location {
            url: location_url.clone(),
            retry_after: Some(Duration::from_secs(10)),
        }
    );

    assert_eq!(
        client.poll(&handle).await.unwrap(),
        OperationStatus::InProgress
    );
}

#[tokio::test]
async fn test_arm_put_environment_polls_provisioning_state_contract() {
    let mut pact_builder = PactBuilder::new("TSI-Environment-Provider", "Azure-Resource-Manager");

    pact_builder.interaction("create a Time Series Insights environment without operation headers", "", |mut i| {
        i.given("resource group rg1 exists and provisioning reports only provisioningState");
        i.request
            .method("PUT")
            .path(environment_path("env1").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token")
            .header("content-type", "application/json")
            .json_body(json!({
                "location": "westeurope",
                "tags": {},
                "kind": "Standard",
                "sku": { "name": "S1", "capacity": 5 },
                "properties": {
                    "dataRetentionTime": "P7D",
                    "storageLimitExceededBehavior": "PurgeOldData"
                }
            }));
        i.response
            .status(201)
            .header("content-type", "application/json")
            .json_body(environment_body("Creating"));
        i
    });

    pact_builder.interaction("get a Time Series Insights environment that finished provisioning", "", |mut i| {
        i.given("environment env1 finished provisioning in resource group rg1");
        i.request
            .method("GET")
            .path(environment_path("env1").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(environment_body("Succeeded"));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let base = base_url(mock_server.url().to_string());
    let client = client(&base);

    let handle = client
        .create_or_update("rg1", "env1", &parameters())
        .await
        .expect("Failed to submit environment");
    assert_eq!(
        handle,
        OperationHandle::ProvisioningState {
            url: format!("{base}{}", environment_path("env1")),
            retry_after: None,
        }
    );

    assert_eq!(client.poll(&handle).await.unwrap(), OperationStatus::Succeeded);
}

#[tokio::test]
async fn test_arm_delete_environment_without_headers_polls_until_gone_contract() {
    let mut pact_builder = PactBuilder::new("TSI-Environment-Provider", "Azure-Resource-Manager");

    pact_builder.interaction("delete a Time Series Insights environment without operation headers", "", |mut i| {
        i.given("environment env1 exists and deletion is asynchronous without operation headers");
        i.request
            .method("DELETE")
            .path(environment_path("env1").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token");
        i.response.status(202);
        i
    });

    pact_builder.interaction("get a Time Series Insights environment that is still being deleted", "", |mut i| {
        i.given("environment env1 is being deleted but still reports Succeeded");
        i.request
            .method("GET")
            .path(environment_path("env1").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(environment_body("Succeeded"));
        i
    });

    pact_builder.interaction("get a Time Series Insights environment that has been deleted", "", |mut i| {
        i.given("environment env2 has been deleted from resource group rg1");
        i.request
            .method("GET")
            .path(environment_path("env2").as_str())
            .query_param("api-version", API_VERSION)
            .header("authorization", "Bearer test-token");
        i.response.status(404);
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let base = base_url(mock_server.url().to_string());
    let client = client(&base);

    let outcome = client.delete("rg1", "env1").await.unwrap();
    let DeleteOutcome::Accepted(handle) = outcome else {
        panic!("expected Accepted, got {outcome:?}");
    };
    assert_eq!(
        handle,
        OperationHandle::UntilGone {
            url: format!("{base}{}", environment_path("env1")),
            retry_after: None,
        }
    );

    // Still present, whatever its provisioningState says
    assert_eq!(client.poll(&handle).await.unwrap(), OperationStatus::InProgress);

    let gone = OperationHandle::UntilGone {
        url: format!("{base}{}", environment_path("env2")),
        retry_after: None,
    };
    assert_eq!(client.poll(&gone).await.unwrap(), OperationStatus::Succeeded);
}
