//! # Environment ID
//!
//! Parsing and formatting of the ARM resource ID that is persisted by the
//! host between operations:
//!
//! ```text
//! /subscriptions/{subscription}/resourceGroups/{group}/providers/Microsoft.TimeSeriesInsights/environments/{name}
//! ```
//!
//! Parsing is strict so that `format(parse(s)) == s` for every accepted ID.

use crate::constants::{TSI_ENVIRONMENTS_SEGMENT, TSI_PROVIDER_NAMESPACE};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An identifier that does not address a Time Series Insights Environment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parsing Time Series Insights Environment ID {id:?}: {reason}")]
pub struct MalformedIdError {
    pub id: String,
    pub reason: String,
}

/// Remote identity of an environment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvironmentId {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

impl EnvironmentId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            name: name.into(),
        }
    }

    /// Parse a raw ARM resource ID
    ///
    /// # Errors
    ///
    /// Returns [`MalformedIdError`] if the ID is not of the form
    /// `/subscriptions/{s}/resourceGroups/{g}/providers/Microsoft.TimeSeriesInsights/environments/{n}`
    /// or any of its values is empty.
    pub fn parse(raw: &str) -> Result<Self, MalformedIdError> {
        let malformed = |reason: &str| MalformedIdError {
            id: raw.to_string(),
            reason: reason.to_string(),
        };

        let path = raw
            .strip_prefix('/')
            .ok_or_else(|| malformed("ID must start with '/'"))?;
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() != 8 {
            return Err(malformed(&format!(
                "expected 8 path segments, found {}",
                segments.len()
            )));
        }
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(malformed("ID contains an empty path segment"));
        }

        let expected_keys = [
            (0, "subscriptions"),
            (2, "resourceGroups"),
            (4, "providers"),
            (6, TSI_ENVIRONMENTS_SEGMENT),
        ];
        for (index, key) in expected_keys {
            if segments[index] != key {
                return Err(malformed(&format!(
                    "expected segment {key:?}, found {:?}",
                    segments[index]
                )));
            }
        }
        if segments[5] != TSI_PROVIDER_NAMESPACE {
            return Err(malformed(&format!(
                "expected provider {TSI_PROVIDER_NAMESPACE:?}, found {:?}",
                segments[5]
            )));
        }

        Ok(Self::new(segments[1], segments[3], segments[7]))
    }
}

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{TSI_PROVIDER_NAMESPACE}/{TSI_ENVIRONMENTS_SEGMENT}/{}",
            self.subscription_id, self.resource_group, self.name
        )
    }
}

impl FromStr for EnvironmentId {
    type Err = MalformedIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
