//! Wire models for the `Microsoft.TimeSeriesInsights/environments` API.

use crate::resource::schema::StorageLimitExceededBehavior;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `kind` discriminator of a Standard (S1/S2) environment
pub const STANDARD_KIND: &str = "Standard";

/// SKU as ARM encodes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSku {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i32>,
}

/// Environment as returned by `GET`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentResource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub sku: Option<EnvironmentSku>,
    #[serde(default)]
    pub properties: Option<StandardEnvironmentProperties>,
}

impl EnvironmentResource {
    /// Only Standard environments are managed by this provider
    #[must_use]
    pub fn is_standard(&self) -> bool {
        self.kind.as_deref() == Some(STANDARD_KIND)
    }

    /// `provisioningState`, if the service reported one
    #[must_use]
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.provisioning_state.as_deref())
    }
}

/// `properties` of a Standard environment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardEnvironmentProperties {
    #[serde(default)]
    pub data_retention_time: Option<String>,
    #[serde(default)]
    pub storage_limit_exceeded_behavior: Option<StorageLimitExceededBehavior>,
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data_access_id: Option<String>,
    #[serde(default)]
    pub data_access_fqdn: Option<String>,
}

/// Body of the create-or-update `PUT`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardEnvironmentParameters {
    pub location: String,
    pub tags: BTreeMap<String, String>,
    pub kind: String,
    pub sku: EnvironmentSku,
    pub properties: StandardEnvironmentCreationProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardEnvironmentCreationProperties {
    pub data_retention_time: String,
    pub storage_limit_exceeded_behavior: StorageLimitExceededBehavior,
}

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ArmErrorEnvelope {
    pub error: ArmErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ArmErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body returned by an `Azure-AsyncOperation` status URL
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AsyncOperationStatus {
    pub status: String,
    #[serde(default)]
    pub error: Option<ArmErrorBody>,
}
