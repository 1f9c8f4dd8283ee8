//! The seam to the remote compute management API.
//!
//! The provider never talks HTTP itself. Callers hand in an implementation of
//! [`ScaleSetsClient`] which owns transport, authentication and retries.

use async_trait::async_trait;
use http::StatusCode;
use snafu::Snafu;

use crate::model::{VirtualMachineScaleSet, VirtualMachineScaleSetUpdate};

/// A request rejected by the remote API. The message is kept exactly as the
/// API returned it.
#[derive(Clone, Debug, PartialEq, Eq, Snafu)]
#[snafu(display("remote API responded with {status}: {message}"))]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }
}

/// The state of a long-running operation at the time it was polled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress,
    Succeeded,
    Failed { message: String },
}

/// A handle to an asynchronous remote action.
//
// We still need to use the async-trait crate, as async functions in traits
// cannot be used with dynamic dispatch.
#[async_trait]
pub trait LongRunningOperation: Send {
    /// Asks the remote API for the current status. Implementations must not
    /// block until the operation is done.
    async fn poll(&mut self) -> Result<OperationStatus, ApiError>;
}

/// The scale set operations of the remote compute API.
#[async_trait]
pub trait ScaleSetsClient: Send + Sync {
    async fn get(&self, resource_group: &str, name: &str)
    -> Result<VirtualMachineScaleSet, ApiError>;

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        body: VirtualMachineScaleSet,
    ) -> Result<Box<dyn LongRunningOperation>, ApiError>;

    /// Applies a partial update. Groups left unset in `body` are not touched.
    async fn update(
        &self,
        resource_group: &str,
        name: &str,
        body: VirtualMachineScaleSetUpdate,
    ) -> Result<Box<dyn LongRunningOperation>, ApiError>;

    async fn delete(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Box<dyn LongRunningOperation>, ApiError>;
}
