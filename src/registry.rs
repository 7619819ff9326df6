//! # Resource Registry
//!
//! Host-facing contract: the [`ResourceHandler`] trait every resource adapter
//! implements, the per-call [`OperationContext`], and the static table of
//! resource types this provider serves.

use crate::constants::{
    DEFAULT_CREATE_TIMEOUT_SECS, DEFAULT_DELETE_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS,
    DEFAULT_UPDATE_TIMEOUT_SECS, TSI_ENVIRONMENT_RESOURCE_TYPE,
};
use crate::error::EnvironmentError;
use crate::resource::environment::validate_environment_import_id;
use crate::resource::schema::FORCE_NEW_FIELDS;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Lifecycle operation, used for deadlines, errors and metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deadline for each lifecycle operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTimeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl ResourceTimeouts {
    pub const DEFAULT: Self = Self {
        create: Duration::from_secs(DEFAULT_CREATE_TIMEOUT_SECS),
        read: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
        update: Duration::from_secs(DEFAULT_UPDATE_TIMEOUT_SECS),
        delete: Duration::from_secs(DEFAULT_DELETE_TIMEOUT_SECS),
    };

    #[must_use]
    pub fn for_operation(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Create => self.create,
            Operation::Read => self.read,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }
}

impl Default for ResourceTimeouts {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Per-call deadlines and cancellation
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    pub timeouts: ResourceTimeouts,
    pub cancel: CancellationToken,
}

impl OperationContext {
    #[must_use]
    pub fn new(timeouts: ResourceTimeouts) -> Self {
        Self {
            timeouts,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: ResourceTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Lifecycle handlers the host drives for one resource type
///
/// The host calls `create_or_update` with no ID when the resource is absent
/// from its state, `read` after every mutation, `create_or_update` with the
/// stored ID when the configuration changed, and `delete` on removal.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    type Config: Send + Sync;
    type Id: Send + Sync;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn create_or_update(
        &self,
        config: &Self::Config,
        existing_id: Option<&Self::Id>,
        ctx: &OperationContext,
    ) -> Result<Self::Id, Self::Error>;

    /// `Ok(None)` means the resource no longer exists and should leave the state
    async fn read(
        &self,
        id: &Self::Id,
        ctx: &OperationContext,
    ) -> Result<Option<Self::Config>, Self::Error>;

    async fn delete(&self, id: &Self::Id, ctx: &OperationContext) -> Result<(), Self::Error>;

    fn validate_id(&self, raw: &str) -> Result<Self::Id, Self::Error>;
}

/// Static description of a resource type
#[derive(Clone, Copy)]
pub struct ResourceType {
    pub name: &'static str,
    pub timeouts: ResourceTimeouts,
    /// Attributes whose change requires destroy and recreate
    pub force_new: &'static [&'static str],
    /// Import ID validator; performs no remote calls
    pub validate_import_id: fn(&str) -> Result<(), EnvironmentError>,
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceType")
            .field("name", &self.name)
            .field("timeouts", &self.timeouts)
            .field("force_new", &self.force_new)
            .finish_non_exhaustive()
    }
}

pub static RESOURCE_TYPES: &[ResourceType] = &[ResourceType {
    name: TSI_ENVIRONMENT_RESOURCE_TYPE,
    timeouts: ResourceTimeouts::DEFAULT,
    force_new: FORCE_NEW_FIELDS,
    validate_import_id: validate_environment_import_id,
}];

/// Find a resource type by its registered name
#[must_use]
pub fn lookup(name: &str) -> Option<&'static ResourceType> {
    RESOURCE_TYPES.iter().find(|resource| resource.name == name)
}
