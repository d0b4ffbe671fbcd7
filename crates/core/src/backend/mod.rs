//! Container runtime access.

/// bollard-backed Docker adapter.
pub mod docker;
/// In-memory adapter used for demo mode and tests.
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ImageReference, ResourceKind, ResourceRecord};

pub use docker::DockerBackend;
pub use memory::MemoryBackend;

/// Errors surfaced by a [`ResourceBackend`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// The runtime client could not be acquired.
    #[error("container runtime unavailable: {0}")]
    Unavailable(String),
    /// A runtime API call failed.
    #[error(transparent)]
    Runtime(#[from] bollard::errors::Error),
    /// The runtime refused an operation on a single item.
    #[error("failed to {action} {target}: {message}")]
    Rejected {
        /// Verb describing the attempted operation.
        action: &'static str,
        /// Item the operation targeted.
        target: String,
        /// Runtime-provided reason.
        message: String,
    },
    /// An image reference could not be built from the publish settings.
    #[error("invalid image reference: {0}")]
    InvalidReference(String),
}

impl BackendError {
    /// Wrap an error with the action/target it occurred on.
    pub fn rejected(action: &'static str, target: impl Into<String>, err: impl ToString) -> Self {
        BackendError::Rejected {
            action,
            target: target.into(),
            message: err.to_string(),
        }
    }
}

/// A single failed item within a batch operation.
#[derive(Debug)]
pub struct ItemFailure {
    /// Identity of the item that failed.
    pub id: String,
    /// Why it failed.
    pub error: BackendError,
}

/// Per-item outcome of a batch operation.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Identities that completed successfully, in request order.
    pub succeeded: Vec<String>,
    /// Failures, in request order.
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    /// Record a per-item result.
    pub fn record(&mut self, id: impl Into<String>, result: Result<(), BackendError>) {
        let id = id.into();
        match result {
            Ok(()) => self.succeeded.push(id),
            Err(error) => self.failures.push(ItemFailure { id, error }),
        }
    }
}

/// Capability the console consumes to talk to the container runtime.
///
/// Implementations may block on network or runtime I/O; callers only ever
/// invoke them from background tasks.
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    /// List every resource of `kind` in backend order.
    async fn list(&self, kind: ResourceKind) -> Result<Vec<ResourceRecord>, BackendError>;

    /// Delete the given identities, reporting per-item outcomes.
    ///
    /// An `Err` means nothing was attempted (e.g. the runtime is unreachable).
    async fn delete(&self, kind: ResourceKind, ids: &[String]) -> Result<BatchReport, BackendError>;

    /// Tag `image_id` under `target`.
    async fn tag(&self, image_id: &str, target: &ImageReference) -> Result<(), BackendError>;

    /// Push `target` to its registry.
    async fn push(&self, target: &ImageReference) -> Result<(), BackendError>;

    /// Containers that are currently running.
    async fn list_running(&self) -> Result<Vec<ResourceRecord>, BackendError>;
}
