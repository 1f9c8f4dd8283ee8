//! Waiting for long-running operations to reach a terminal status.

use std::time::Duration;

use snafu::{ResultExt as _, Snafu, ensure};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{
    client::{ApiError, LongRunningOperation, OperationStatus},
    error::ErrorKind,
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("operation was cancelled while waiting for completion"))]
    Cancelled,

    #[snafu(display("operation did not complete before the deadline"))]
    DeadlineExceeded,

    #[snafu(display("operation failed: {message}"))]
    Failed { message: String },

    #[snafu(display("failed to poll operation status"))]
    Poll { source: ApiError },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Cancelled => ErrorKind::Cancelled,
            Error::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Error::Failed { .. } | Error::Poll { .. } => ErrorKind::RemoteOperationFailed,
        }
    }
}

/// The caller supplied limits of a single lifecycle invocation.
///
/// Cancelling the token or passing the deadline aborts the local wait only.
/// The remote operation is left running.
#[derive(Clone, Debug)]
pub struct OperationContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
    poll_interval: Duration,
}

impl OperationContext {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

    pub fn new(cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            deadline: None,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the deadline to `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Fails if the token is already cancelled or the deadline has passed.
    pub(crate) fn check(&self) -> Result<()> {
        ensure!(!self.cancellation.is_cancelled(), CancelledSnafu);
        if let Some(deadline) = self.deadline {
            ensure!(Instant::now() < deadline, DeadlineExceededSnafu);
        }
        Ok(())
    }

    /// Runs `call` to completion unless the context is interrupted first. An
    /// interrupted context never starts the call.
    pub(crate) async fn run<F: Future>(&self, call: F) -> Result<F::Output> {
        self.check()?;

        tokio::select! {
            biased;
            error = self.interrupted() => Err(error),
            output = call => Ok(output),
        }
    }

    /// Resolves once the token is cancelled or the deadline has passed.
    async fn interrupted(&self) -> Error {
        let deadline = async {
            match self.deadline {
                Some(deadline) => time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Error::Cancelled,
            () = deadline => Error::DeadlineExceeded,
        }
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

/// Polls `operation` every [`OperationContext::poll_interval`] until it
/// succeeds or fails.
///
/// Cancellation and the deadline are checked before every poll, so an already
/// cancelled context returns without contacting the remote API.
pub async fn wait_for_completion(
    mut operation: Box<dyn LongRunningOperation>,
    context: &OperationContext,
) -> Result<()> {
    let mut attempt = 0_u64;
    loop {
        attempt += 1;
        let status = tokio::select! {
            biased;
            error = context.interrupted() => return Err(error),
            status = operation.poll() => status.context(PollSnafu)?,
        };

        match status {
            OperationStatus::Succeeded => {
                debug!(attempt, "operation succeeded");
                return Ok(());
            }
            OperationStatus::Failed { message } => return FailedSnafu { message }.fail(),
            OperationStatus::InProgress => trace!(attempt, "operation still in progress"),
        }

        tokio::select! {
            biased;
            error = context.interrupted() => return Err(error),
            () = time::sleep(context.poll_interval) => {}
        }
    }
}
