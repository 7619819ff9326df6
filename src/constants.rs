//! # Constants
//!
//! Shared constants used throughout the provider.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Resource type name the environment adapter is registered under
pub const TSI_ENVIRONMENT_RESOURCE_TYPE: &str = "azurerm_time_series_insights_environment";

/// ARM resource provider namespace for Time Series Insights
pub const TSI_PROVIDER_NAMESPACE: &str = "Microsoft.TimeSeriesInsights";

/// ARM resource type segment for environments
pub const TSI_ENVIRONMENTS_SEGMENT: &str = "environments";

/// Management API version spoken by the REST client
pub const TSI_API_VERSION: &str = "2018-08-15-preview";

/// Default Azure Resource Manager endpoint (public cloud)
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

/// Default create timeout (seconds)
pub const DEFAULT_CREATE_TIMEOUT_SECS: u64 = 30 * 60;

/// Default read timeout (seconds)
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 5 * 60;

/// Default update timeout (seconds)
pub const DEFAULT_UPDATE_TIMEOUT_SECS: u64 = 30 * 60;

/// Default delete timeout (seconds)
pub const DEFAULT_DELETE_TIMEOUT_SECS: u64 = 30 * 60;

/// Default interval between long-running operation polls (seconds)
/// ARM may ask for a longer interval via `Retry-After`
pub const DEFAULT_LRO_POLL_INTERVAL_SECS: u64 = 10;

/// Shortest allowed interval between long-running operation polls (seconds)
pub const MIN_LRO_POLL_INTERVAL_SECS: u64 = 1;

/// Maximum length of an environment name
pub const MAX_ENVIRONMENT_NAME_LEN: usize = 90;

/// Maximum length of a resource group name
pub const MAX_RESOURCE_GROUP_NAME_LEN: usize = 90;

/// Maximum number of tags on a single resource
pub const MAX_TAG_COUNT: usize = 50;

/// Maximum tag key length
pub const MAX_TAG_KEY_LEN: usize = 512;

/// Maximum tag value length
pub const MAX_TAG_VALUE_LEN: usize = 256;
