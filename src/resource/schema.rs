//! # Environment Schema
//!
//! The desired-state record for a Time Series Insights Standard Environment,
//! the checks applied to it before anything is sent to ARM, and detection of
//! changes that can only be applied by replacing the resource.

use crate::constants::{
    MAX_ENVIRONMENT_NAME_LEN, MAX_RESOURCE_GROUP_NAME_LEN, MAX_TAG_COUNT, MAX_TAG_KEY_LEN,
    MAX_TAG_VALUE_LEN,
};
use crate::error::EnvironmentError;
use crate::resource::location::{locations_equal, normalize_location};
use crate::resource::sku::{is_supported_sku_name, SUPPORTED_SKU_NAMES};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

/// Fields whose change requires destroying and recreating the environment
pub const FORCE_NEW_FIELDS: &[&str] = &[
    "name",
    "location",
    "resource_group_name",
    "data_retention_time",
    "tags",
];

static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-0-9A-Za-z_.()]+$")
        .expect("Failed to compile environment name regex - this should never happen")
});

// ISO-8601 duration: PnYnMnWnDTnHnMnS, every component optional
static ISO8601_DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^P(?:\d+Y)?(?:\d+M)?(?:\d+W)?(?:\d+D)?(?:T(?:\d+H)?(?:\d+M)?(?:\d+(?:\.\d+)?S)?)?$",
    )
    .expect("Failed to compile ISO-8601 duration regex - this should never happen")
});

/// What the service does once the storage limit is reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageLimitExceededBehavior {
    #[default]
    PurgeOldData,
    PauseIngress,
}

impl StorageLimitExceededBehavior {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PurgeOldData => "PurgeOldData",
            Self::PauseIngress => "PauseIngress",
        }
    }
}

impl fmt::Display for StorageLimitExceededBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired state of an environment, as supplied by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Environment name (force-new)
    pub name: String,
    /// Azure region (force-new, compared normalized)
    pub location: String,
    /// Containing resource group (force-new)
    pub resource_group_name: String,
    /// One of `S1_1..S1_10`, `S2_1..S2_10`
    pub sku_name: String,
    #[serde(default, alias = "storage_limited_exceeded_behavior")]
    pub storage_limit_exceeded_behavior: StorageLimitExceededBehavior,
    /// ISO-8601 duration, e.g. `P30D` (force-new)
    pub data_retention_time: String,
    /// Resource tags (force-new)
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl EnvironmentConfig {
    /// Check every field against the service's constraints
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), EnvironmentError> {
        validate_environment_name(&self.name)?;
        validate_resource_group_name(&self.resource_group_name)?;

        if normalize_location(&self.location).is_empty() {
            return Err(EnvironmentError::validation(
                "location",
                "location cannot be empty",
            ));
        }

        if !is_supported_sku_name(&self.sku_name) {
            return Err(EnvironmentError::validation(
                "sku_name",
                format!(
                    "{:?} is not one of {}",
                    self.sku_name,
                    SUPPORTED_SKU_NAMES.join(", ")
                ),
            ));
        }

        validate_iso8601_duration(&self.data_retention_time)?;
        validate_tags(&self.tags)
    }

    /// Force-new fields that differ between `prior` and `self`
    ///
    /// A non-empty result means the change cannot be applied in place: the
    /// host must delete the existing environment and create a new one.
    #[must_use]
    pub fn replacement_fields(&self, prior: &EnvironmentConfig) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name != prior.name {
            fields.push("name");
        }
        if !locations_equal(&self.location, &prior.location) {
            fields.push("location");
        }
        if self.resource_group_name != prior.resource_group_name {
            fields.push("resource_group_name");
        }
        if self.data_retention_time != prior.data_retention_time {
            fields.push("data_retention_time");
        }
        if self.tags != prior.tags {
            fields.push("tags");
        }
        fields
    }

    /// Whether moving from `prior` to `self` can be done with an in-place update
    #[must_use]
    pub fn updatable_from(&self, prior: &EnvironmentConfig) -> bool {
        self.replacement_fields(prior).is_empty()
    }
}

/// Environment names are 1-90 characters of word characters, `-`, `.`, `(` and `)`
///
/// # Errors
///
/// Returns [`EnvironmentError::Validation`] for `name`.
pub fn validate_environment_name(name: &str) -> Result<(), EnvironmentError> {
    let len = name.chars().count();
    if len == 0 || len > MAX_ENVIRONMENT_NAME_LEN || !NAME_REGEX.is_match(name) {
        return Err(EnvironmentError::validation(
            "name",
            format!(
                "{name:?} must be 1 - {MAX_ENVIRONMENT_NAME_LEN} characters long, contain only word characters, underscores, hyphens, periods and parentheses"
            ),
        ));
    }
    Ok(())
}

/// Resource group names follow the ARM naming rules
///
/// # Errors
///
/// Returns [`EnvironmentError::Validation`] for `resource_group_name`.
pub fn validate_resource_group_name(resource_group: &str) -> Result<(), EnvironmentError> {
    if resource_group.is_empty() {
        return Err(EnvironmentError::validation(
            "resource_group_name",
            "resource group name cannot be empty",
        ));
    }
    if resource_group.chars().count() > MAX_RESOURCE_GROUP_NAME_LEN {
        return Err(EnvironmentError::validation(
            "resource_group_name",
            format!("{resource_group:?} may not exceed {MAX_RESOURCE_GROUP_NAME_LEN} characters"),
        ));
    }
    if !NAME_REGEX.is_match(resource_group) {
        return Err(EnvironmentError::validation(
            "resource_group_name",
            format!(
                "{resource_group:?} may only contain alphanumeric characters, dash, underscores, parentheses and periods"
            ),
        ));
    }
    if resource_group.ends_with('.') {
        return Err(EnvironmentError::validation(
            "resource_group_name",
            format!("{resource_group:?} cannot end with a period"),
        ));
    }
    Ok(())
}

/// `value` must be an ISO-8601 duration with at least one component
///
/// # Errors
///
/// Returns [`EnvironmentError::Validation`] for `data_retention_time`.
pub fn validate_iso8601_duration(value: &str) -> Result<(), EnvironmentError> {
    let has_component = value.len() > 1 && !value.ends_with('T');
    if !has_component || !ISO8601_DURATION_REGEX.is_match(value) {
        return Err(EnvironmentError::validation(
            "data_retention_time",
            format!("{value:?} is not a valid ISO-8601 duration (e.g. \"P30D\", \"PT12H\")"),
        ));
    }
    Ok(())
}

/// ARM limits: 50 tags, keys up to 512 characters, values up to 256
///
/// # Errors
///
/// Returns [`EnvironmentError::Validation`] for `tags`.
pub fn validate_tags(tags: &BTreeMap<String, String>) -> Result<(), EnvironmentError> {
    if tags.len() > MAX_TAG_COUNT {
        return Err(EnvironmentError::validation(
            "tags",
            format!(
                "a maximum of {MAX_TAG_COUNT} tags can be applied to each resource, found {}",
                tags.len()
            ),
        ));
    }
    for (key, value) in tags {
        if key.is_empty() || key.chars().count() > MAX_TAG_KEY_LEN {
            return Err(EnvironmentError::validation(
                "tags",
                format!("tag key {key:?} must be 1 - {MAX_TAG_KEY_LEN} characters"),
            ));
        }
        if value.chars().count() > MAX_TAG_VALUE_LEN {
            return Err(EnvironmentError::validation(
                "tags",
                format!("tag {key:?} value cannot exceed {MAX_TAG_VALUE_LEN} characters"),
            ));
        }
    }
    Ok(())
}
