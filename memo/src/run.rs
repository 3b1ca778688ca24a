//! Run driver: executes one classification turn against a resolved session.
//!
//! A turn walks the remote protocol in a fixed order:
//!
//! ```text
//! Created → MessagePosted → RunSubmitted → Polling → Finished
//! ```
//!
//! Every remote call races the caller's [`CancellationToken`] and the
//! optional turn deadline, so a turn never outlives either of them.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::assistant::{RunStatus, SharedAssistantClient};
use crate::classifier::ClassificationResult;
use crate::error::DriverError;

/// Progress of a single turn. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Nothing sent yet.
    Created,
    /// The user's content is on the session.
    MessagePosted,
    /// The remote accepted a run.
    RunSubmitted {
        /// Remote run identifier.
        run_id: String,
    },
    /// Waiting for a terminal status; holds the last one observed.
    Polling {
        /// Remote run identifier.
        run_id: String,
        /// Last non-terminal status.
        status: RunStatus,
    },
    /// A terminal status was observed.
    Finished {
        /// Remote run identifier.
        run_id: String,
        /// Terminal status.
        status: RunStatus,
    },
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::MessagePosted => f.write_str("message_posted"),
            Self::RunSubmitted { .. } => f.write_str("run_submitted"),
            Self::Polling { status, .. } | Self::Finished { status, .. } => {
                write!(f, "{status}")
            }
        }
    }
}

/// Drives the post → run → poll → fetch protocol for one session.
#[derive(Clone)]
pub struct RunDriver {
    assistant: SharedAssistantClient,
    poll_interval: Duration,
    max_wait: Option<Duration>,
}

impl fmt::Debug for RunDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunDriver")
            .field("poll_interval", &self.poll_interval)
            .field("max_wait", &self.max_wait)
            .finish_non_exhaustive()
    }
}

impl RunDriver {
    /// Create a driver. `max_wait` of `None` polls until the run ends.
    pub fn new(
        assistant: SharedAssistantClient,
        poll_interval: Duration,
        max_wait: Option<Duration>,
    ) -> Self {
        Self {
            assistant,
            poll_interval,
            max_wait,
        }
    }

    /// Delay between status polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Turn deadline, if any.
    #[must_use]
    pub const fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    /// Deadline for a turn starting now.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.max_wait.map(|wait| Instant::now() + wait)
    }

    /// Run one turn on `session_id` and parse the assistant's reply.
    ///
    /// With `cleanup` set the session is deleted afterwards, whatever the
    /// outcome; deletion failures are logged and otherwise ignored.
    ///
    /// An interrupted turn leaves its remote run behind on the session; in
    /// `reuse` mode the caller is expected to abandon the session.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] naming the step that failed. The run is
    /// never retried.
    pub async fn execute(
        &self,
        session_id: &str,
        content: &str,
        cleanup: bool,
        cancel: &CancellationToken,
    ) -> Result<ClassificationResult, DriverError> {
        self.execute_until(session_id, content, cleanup, cancel, self.deadline())
            .await
    }

    /// Like [`execute`](Self::execute), against a deadline that was started
    /// before the session was resolved.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn execute_until(
        &self,
        session_id: &str,
        content: &str,
        cleanup: bool,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<ClassificationResult, DriverError> {
        let outcome = self.turn(session_id, content, cancel, deadline).await;
        if cleanup {
            self.cleanup(session_id).await;
        }
        outcome
    }

    async fn turn(
        &self,
        session_id: &str,
        content: &str,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<ClassificationResult, DriverError> {
        let mut state = RunState::Created;

        self.interruptible(cancel, deadline, self.assistant.post_message(session_id, content))
            .await?
            .map_err(DriverError::PostMessage)?;
        state = advance(session_id, &state, RunState::MessagePosted);

        let run_id = self
            .interruptible(cancel, deadline, self.assistant.submit_run(session_id))
            .await?
            .map_err(DriverError::SubmitRun)?;
        state = advance(
            session_id,
            &state,
            RunState::RunSubmitted {
                run_id: run_id.clone(),
            },
        );

        let status = loop {
            let status = self
                .interruptible(cancel, deadline, self.assistant.run_status(session_id, &run_id))
                .await?
                .map_err(DriverError::RetrieveRun)?;

            if status.is_terminal() {
                break status;
            }
            if !matches!(&state, RunState::Polling { status: last, .. } if *last == status) {
                state = advance(
                    session_id,
                    &state,
                    RunState::Polling {
                        run_id: run_id.clone(),
                        status,
                    },
                );
            }
            self.interruptible(cancel, deadline, sleep(self.poll_interval))
                .await?;
        };
        advance(
            session_id,
            &state,
            RunState::Finished { run_id, status },
        );

        if !status.is_success() {
            return Err(DriverError::RunEnded(status));
        }

        let reply = self
            .interruptible(cancel, deadline, self.assistant.latest_reply(session_id))
            .await?
            .map_err(DriverError::FetchReply)?
            .ok_or(DriverError::NoReply)?;

        ClassificationResult::from_reply(&reply)
    }

    /// Race `fut` against cancellation and the deadline.
    ///
    /// Cancellation wins over a ready future, so a cancelled turn never
    /// starts new remote work.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Cancelled`] or [`DriverError::TimedOut`] when
    /// either fires before `fut` completes.
    pub async fn interruptible<F: Future>(
        &self,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
        fut: F,
    ) -> Result<F::Output, DriverError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(DriverError::Cancelled),
            () = until(deadline) => Err(DriverError::TimedOut(self.max_wait.unwrap_or_default())),
            output = fut => Ok(output),
        }
    }

    async fn cleanup(&self, session_id: &str) {
        match self.assistant.delete_session(session_id).await {
            Ok(()) => debug!(session_id, "deleted session"),
            Err(e) => warn!(session_id, error = %e, "failed to delete session"),
        }
    }
}

fn advance(session_id: &str, from: &RunState, to: RunState) -> RunState {
    let run_id = match &to {
        RunState::RunSubmitted { run_id }
        | RunState::Polling { run_id, .. }
        | RunState::Finished { run_id, .. } => Some(run_id.as_str()),
        RunState::Created | RunState::MessagePosted => None,
    };
    debug!(session_id, run_id, from = %from, to = %to, "run state changed");
    to
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
