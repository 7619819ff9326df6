//! # Time Series Insights Environment Resource
//!
//! - `environment`: the lifecycle adapter
//! - `schema`: desired-state record, validation and force-new detection
//! - `id`: resource ID parsing and formatting
//! - `sku`: `sku_name` <-> structured SKU
//! - `location`: Azure region normalization

pub mod environment;
pub mod id;
pub mod location;
pub mod schema;
pub mod sku;

pub use environment::{AdapterSettings, EnvironmentResourceAdapter};
pub use id::{EnvironmentId, MalformedIdError};
pub use schema::{EnvironmentConfig, StorageLimitExceededBehavior};
pub use sku::{format_sku, parse_sku, Sku, SkuError, SkuTier};
