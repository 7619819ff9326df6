//! # ARM REST Client
//!
//! [`EnvironmentsApi`] over the Azure Resource Manager REST API.
//!
//! ## Long-running operations
//!
//! `PUT` and `DELETE` may complete asynchronously. The response then carries an
//! `Azure-AsyncOperation` URL (preferred), a `Location` URL, or neither. Without
//! headers a `PUT` polls the resource until `provisioningState` is terminal and
//! a `DELETE` polls it until it answers 404. `Retry-After` is kept on the
//! handle as the poll interval hint.

use crate::client::auth::{token_source, TokenSource};
use crate::client::models::{ArmErrorEnvelope, AsyncOperationStatus};
use crate::client::{
    ApiError, DeleteOutcome, EnvironmentResource, EnvironmentsApi, OperationHandle,
    OperationStatus, StandardEnvironmentParameters,
};
use crate::config::ProviderConfig;
use crate::constants::{TSI_API_VERSION, TSI_ENVIRONMENTS_SEGMENT, TSI_PROVIDER_NAMESPACE};
use crate::observability::metrics;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, field, Instrument};

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Production [`EnvironmentsApi`] implementation
#[derive(Clone)]
pub struct ArmEnvironmentsClient {
    http: reqwest::Client,
    endpoint: String,
    subscription_id: String,
    tokens: Arc<dyn TokenSource>,
}

impl fmt::Debug for ArmEnvironmentsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArmEnvironmentsClient")
            .field("endpoint", &self.endpoint)
            .field("subscription_id", &self.subscription_id)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl ArmEnvironmentsClient {
    /// Create a client for one subscription
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        subscription_id: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            subscription_id: subscription_id.into(),
            tokens,
        })
    }

    /// Create a client from provider configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription is missing or credentials cannot be built.
    pub fn from_config(config: &ProviderConfig) -> anyhow::Result<Self> {
        let subscription_id = config.require_subscription_id()?;
        let tokens = token_source(&config.auth, &config.endpoint)?;
        debug!(
            endpoint = %config.endpoint,
            subscription_id = %subscription_id,
            "Creating ARM environments client"
        );
        Self::new(config.endpoint.clone(), subscription_id, tokens)
    }

    fn environment_url(&self, resource_group: &str, name: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            self.endpoint,
            self.subscription_id,
            resource_group,
            TSI_PROVIDER_NAMESPACE,
            TSI_ENVIRONMENTS_SEGMENT,
            name
        )
    }

    /// Operation URLs may be relative to the endpoint
    fn absolute_url(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.endpoint, url)
        } else {
            url.to_string()
        }
    }

    async fn authorized(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        let token = self.tokens.bearer_token().await?;
        Ok(builder.bearer_auth(token))
    }

    async fn poll_async_operation(&self, url: &str) -> Result<OperationStatus, ApiError> {
        let request = self.authorized(self.http.get(self.absolute_url(url))).await?;
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let body = response.bytes().await?;
        let operation: AsyncOperationStatus = serde_json::from_slice(&body)?;
        let message = operation.error.map(|e| describe_error(e.code, e.message));
        Ok(OperationStatus::from_arm_state(&operation.status, message))
    }

    async fn poll_location(&self, url: &str) -> Result<OperationStatus, ApiError> {
        let request = self.authorized(self.http.get(self.absolute_url(url))).await?;
        let response = request.send().await?;
        match response.status() {
            StatusCode::ACCEPTED => Ok(OperationStatus::InProgress),
            status if status.is_success() => Ok(OperationStatus::Succeeded),
            _ => Err(error_from_response(response).await),
        }
    }

    async fn get_resource(&self, url: &str) -> Result<Response, ApiError> {
        let request = self
            .authorized(
                self.http
                    .get(self.absolute_url(url))
                    .query(&[("api-version", TSI_API_VERSION)]),
            )
            .await?;
        Ok(request.send().await?)
    }

    async fn poll_resource(&self, url: &str) -> Result<OperationStatus, ApiError> {
        let response = self.get_resource(url).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let resource = decode_resource(response).await?;
        Ok(match resource.provisioning_state() {
            Some(state) => OperationStatus::from_arm_state(state, None),
            None => OperationStatus::Succeeded,
        })
    }

    async fn poll_until_gone(&self, url: &str) -> Result<OperationStatus, ApiError> {
        let response = self.get_resource(url).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(OperationStatus::Succeeded),
            status if status.is_success() => {
                let resource = decode_resource(response).await?;
                Ok(match resource.provisioning_state() {
                    Some(state) if state.eq_ignore_ascii_case("Failed") => OperationStatus::Failed(
                        "environment reported provisioningState Failed while deleting".to_string(),
                    ),
                    _ => OperationStatus::InProgress,
                })
            }
            _ => Err(error_from_response(response).await),
        }
    }
}

#[async_trait]
impl EnvironmentsApi for ArmEnvironmentsClient {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn get(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<EnvironmentResource>, ApiError> {
        let span = tracing::debug_span!(
            "tsi.arm.environments.get",
            environment.name = name,
            resource_group = resource_group,
            http.status = field::Empty,
        );
        let span_clone = span.clone();

        observed("get", async move {
            let url = self.environment_url(resource_group, name);
            let request = self
                .authorized(self.http.get(url).query(&[("api-version", TSI_API_VERSION)]))
                .await?;
            let response = request.send().await?;
            span_clone.record("http.status", response.status().as_u16());

            match response.status() {
                StatusCode::NOT_FOUND => Ok(None),
                status if status.is_success() => decode_resource(response).await.map(Some),
                _ => Err(error_from_response(response).await),
            }
        })
        .instrument(span)
        .await
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        parameters: &StandardEnvironmentParameters,
    ) -> Result<OperationHandle, ApiError> {
        let span = tracing::info_span!(
            "tsi.arm.environments.put",
            environment.name = name,
            resource_group = resource_group,
            http.status = field::Empty,
        );
        let span_clone = span.clone();

        observed("put", async move {
            let url = self.environment_url(resource_group, name);
            let request = self
                .authorized(
                    self.http
                        .put(&url)
                        .query(&[("api-version", TSI_API_VERSION)])
                        .json(parameters),
                )
                .await?;
            let response = request.send().await?;
            span_clone.record("http.status", response.status().as_u16());

            if !response.status().is_success() {
                return Err(error_from_response(response).await);
            }

            let retry_after = retry_after(response.headers());
            if let Some(handle) = handle_from_headers(response.headers(), retry_after) {
                return Ok(handle);
            }

            let resource = decode_resource(response).await?;
            match resource.provisioning_state() {
                None => Ok(OperationHandle::Completed),
                Some(state) => match OperationStatus::from_arm_state(state, None) {
                    OperationStatus::Succeeded => Ok(OperationHandle::Completed),
                    OperationStatus::InProgress => {
                        Ok(OperationHandle::ProvisioningState { url, retry_after })
                    }
                    OperationStatus::Failed(message) => Err(ApiError::Operation(message)),
                    OperationStatus::Canceled => {
                        Err(ApiError::Operation("operation was canceled".to_string()))
                    }
                },
            }
        })
        .instrument(span)
        .await
    }

    async fn delete(&self, resource_group: &str, name: &str) -> Result<DeleteOutcome, ApiError> {
        let span = tracing::info_span!(
            "tsi.arm.environments.delete",
            environment.name = name,
            resource_group = resource_group,
            http.status = field::Empty,
        );
        let span_clone = span.clone();

        observed("delete", async move {
            let url = self.environment_url(resource_group, name);
            let request = self
                .authorized(
                    self.http
                        .delete(&url)
                        .query(&[("api-version", TSI_API_VERSION)]),
                )
                .await?;
            let response = request.send().await?;
            span_clone.record("http.status", response.status().as_u16());

            match response.status() {
                StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
                StatusCode::ACCEPTED => {
                    let retry_after = retry_after(response.headers());
                    let handle = handle_from_headers(response.headers(), retry_after)
                        .unwrap_or(OperationHandle::UntilGone { url, retry_after });
                    Ok(DeleteOutcome::Accepted(handle))
                }
                status if status.is_success() => Ok(DeleteOutcome::Deleted),
                _ => Err(error_from_response(response).await),
            }
        })
        .instrument(span)
        .await
    }

    async fn poll(&self, handle: &OperationHandle) -> Result<OperationStatus, ApiError> {
        observed("poll", async move {
            let status = match handle {
                OperationHandle::Completed => OperationStatus::Succeeded,
                OperationHandle::AsyncOperation { url, .. } => {
                    self.poll_async_operation(url).await?
                }
                OperationHandle::Location { url, .. } => self.poll_location(url).await?,
                OperationHandle::ProvisioningState { url, .. } => self.poll_resource(url).await?,
                OperationHandle::UntilGone { url, .. } => self.poll_until_gone(url).await?,
            };
            debug!(status = ?status, "Polled long-running operation");
            Ok(status)
        })
        .await
    }
}

/// Count failed requests and log their latency
async fn observed<T, F>(request: &'static str, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    let start = Instant::now();
    let result = fut.await;
    if let Err(e) = &result {
        metrics::increment_api_errors(request);
        debug!(
            request = request,
            elapsed = ?start.elapsed(),
            error = %e,
            "Management API request failed"
        );
    }
    result
}

fn handle_from_headers(
    headers: &HeaderMap,
    retry_after: Option<Duration>,
) -> Option<OperationHandle> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    if let Some(url) = header(AZURE_ASYNC_OPERATION) {
        return Some(OperationHandle::AsyncOperation { url, retry_after });
    }
    header(LOCATION.as_str()).map(|url| OperationHandle::Location { url, retry_after })
}

/// `Retry-After` in delta-seconds; HTTP dates are ignored
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

async fn decode_resource(response: Response) -> Result<EnvironmentResource, ApiError> {
    let body = response.bytes().await?;
    if body.is_empty() {
        return Ok(EnvironmentResource::default());
    }
    Ok(serde_json::from_slice(&body)?)
}

async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ArmErrorEnvelope>(&body) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => (None, None),
    };

    ApiError::Http {
        status: status.as_u16(),
        code: code.unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string()),
        message: message.unwrap_or(body),
    }
}

fn describe_error(code: Option<String>, message: Option<String>) -> String {
    match (code, message) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (Some(text), None) | (None, Some(text)) => text,
        (None, None) => "operation reported Failed".to_string(),
    }
}
