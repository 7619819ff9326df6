//! Time Series Insights Environment Provider Library
//!
//! Lifecycle handlers for Azure Time Series Insights Standard environments,
//! the ARM REST client they drive, and the provider's ambient plumbing.
//! Tests are included in the module files and under `tests/`.

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod lro;
pub mod observability;
pub mod registry;
pub mod resource;

pub use client::{ArmEnvironmentsClient, EnvironmentsApi};
pub use config::ProviderConfig;
pub use error::EnvironmentError;
pub use registry::{Operation, OperationContext, ResourceHandler, ResourceTimeouts};
pub use resource::{EnvironmentConfig, EnvironmentId, EnvironmentResourceAdapter};
