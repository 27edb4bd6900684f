//! Background proposal generation.
//!
//! Generation can take tens of seconds. [`GenerationTask`] runs it on a
//! tokio task so the caller can render progress and offer a cancel button.
//! Cancellation is cooperative: the request already in flight runs to
//! completion, but its result is dropped once cancellation was requested.

use crate::constraints::Constraints;
use crate::engine::{BackendError, ProposalEngine, ProposalError};
use crate::proposal::ProposalSet;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a generation task ended, from the waiter's point of view.
#[derive(Debug)]
pub enum TaskOutcome {
    Completed(Result<ProposalSet, ProposalError>),
    /// Cancelled before the result was observed. Any late result is gone.
    Cancelled,
}

/// Handle to a running proposal generation.
pub struct GenerationTask {
    handle: JoinHandle<Result<ProposalSet, ProposalError>>,
    cancel: CancellationToken,
    started: Instant,
}

impl GenerationTask {
    /// Start generating on the current runtime.
    pub fn spawn(engine: ProposalEngine, constraints: Constraints) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(async move { engine.generate_proposal(&constraints).await });
        debug!("generation task spawned");
        Self {
            handle,
            cancel,
            started: Instant::now(),
        }
    }

    /// Token that cancels this task. Clone it into whatever owns the cancel
    /// control.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Wait for the result, calling `on_tick` with the elapsed time every
    /// `poll_interval` while the task is still running.
    pub async fn wait(
        self,
        poll_interval: Duration,
        mut on_tick: impl FnMut(Duration),
    ) -> TaskOutcome {
        let Self {
            handle,
            cancel,
            started,
        } = self;

        while !handle.is_finished() {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(poll_interval) => {
                    if !handle.is_finished() {
                        on_tick(started.elapsed());
                    }
                }
            }
        }

        if cancel.is_cancelled() {
            info!(elapsed_ms = millis(started.elapsed()), "generation cancelled");
            return TaskOutcome::Cancelled;
        }

        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "generation task did not complete");
                Err(ProposalError::Backend(BackendError::Request(format!(
                    "generation task failed: {e}"
                ))))
            }
        };

        // A cancel that lands while joining still wins.
        if cancel.is_cancelled() {
            return TaskOutcome::Cancelled;
        }
        TaskOutcome::Completed(result)
    }
}

/// Whole milliseconds for log fields, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
