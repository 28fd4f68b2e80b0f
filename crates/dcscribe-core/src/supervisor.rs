//! Per-session supervision.
//!
//! A [`SessionSupervisor`] runs connection cycles until shutdown:
//!
//! ```text
//! Idle -> Running -> Draining -> Cooldown -> Running -> ...
//!            (any state) --shutdown--> Stopped
//! ```
//!
//! Each cycle resets the store, connects, starts the planned tasks under a
//! child of the shutdown scope and waits for the first task to end. That
//! task's exit means the live connection can no longer be trusted, so the
//! cycle scope is cancelled, every sibling is drained and, after the
//! cooldown, a new cycle starts from an empty store.

use std::sync::Arc;
use std::time::Duration;

use dcscribe_db::Sink;
use dcscribe_symbology::Encyclopedia;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelScope;
use crate::stream::{Connector, StreamError};
use crate::tasks::{CycleContext, TaskPlan};

/// Wait between the end of a cycle and the next one.
pub const RESTART_COOLDOWN: Duration = Duration::from_secs(10);

/// Where a supervisor is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Not started yet.
    Idle,
    /// Connecting or running tasks.
    Running,
    /// Waiting for cancelled tasks to finish.
    Draining,
    /// Waiting before the next cycle.
    Cooldown,
    /// Shut down.
    Stopped,
}

/// Runs and restarts the task group of one session.
pub struct SessionSupervisor {
    session: Arc<str>,
    plan: TaskPlan,
    connector: Arc<dyn Connector>,
    sink: Sink,
    encyclopedia: Arc<Encyclopedia>,
    cooldown: Duration,
    state: watch::Sender<SupervisorState>,
}

impl SessionSupervisor {
    /// Create a supervisor for the session named `session`.
    pub fn new(
        session: &str,
        plan: TaskPlan,
        connector: Arc<dyn Connector>,
        sink: Sink,
        encyclopedia: Arc<Encyclopedia>,
    ) -> Self {
        let (state, _) = watch::channel(SupervisorState::Idle);
        Self {
            session: Arc::from(session),
            plan,
            connector,
            sink,
            encyclopedia,
            cooldown: RESTART_COOLDOWN,
            state,
        }
    }

    /// Replace the restart cooldown.
    #[must_use]
    pub const fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Session short name.
    pub fn session(&self) -> &str {
        &self.session
    }

    /// Follow state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    /// Run cycles until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancelScope) {
        info!(session = %self.session, tasks = ?self.plan.task_names(), "Starting session");

        while !shutdown.is_cancelled() {
            self.state.send_replace(SupervisorState::Running);
            let cycle = shutdown.child();
            self.run_cycle(&cycle).await;

            if shutdown.is_cancelled() {
                break;
            }
            self.state.send_replace(SupervisorState::Cooldown);
            info!(
                session = %self.session,
                cooldown_secs = self.cooldown.as_secs(),
                "Restarting session after cooldown"
            );
            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(self.cooldown) => {}
            }
        }

        self.state.send_replace(SupervisorState::Stopped);
        info!(session = %self.session, "Session stopped");
    }

    async fn run_cycle(&self, cycle: &CancelScope) {
        let reset = tokio::select! {
            () = cycle.cancelled() => return,
            reset = self.sink.reset() => reset,
        };
        if let Err(e) = reset {
            warn!(session = %self.session, error = %e, "Failed to reset store");
            return;
        }

        let connected = tokio::select! {
            () = cycle.cancelled() => return,
            connected = self.connector.connect() => connected,
        };
        let consumer = match connected {
            Ok(consumer) => consumer,
            Err(StreamError::Cancelled) => return,
            Err(e) if e.is_transport() => {
                warn!(session = %self.session, error = %e, "Failed to connect");
                return;
            }
            Err(e) => {
                error!(session = %self.session, error = %e, "Unexpected connect failure");
                return;
            }
        };

        if self.plan.is_empty() {
            warn!(session = %self.session, "No tasks enabled, idling until shutdown");
            cycle.cancelled().await;
            return;
        }

        let ctx = CycleContext {
            session: Arc::clone(&self.session),
            consumer,
            sink: self.sink.clone(),
            encyclopedia: Arc::clone(&self.encyclopedia),
        };
        let mut tasks = self.plan.spawn(&ctx, cycle);

        match tasks.join_next().await {
            Some(Ok(exit)) => {
                info!(
                    session = %self.session,
                    task = %exit.task,
                    "Task ended, stopping session tasks"
                );
            }
            Some(Err(e)) => {
                error!(
                    session = %self.session,
                    error = %e,
                    "Task panicked, stopping session tasks"
                );
            }
            None => {}
        }

        self.state.send_replace(SupervisorState::Draining);
        cycle.cancel();
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                debug!(session = %self.session, error = %e, "Task failed during drain");
            }
        }
        info!(session = %self.session, "Session tasks stopped");
    }
}

impl std::fmt::Debug for SessionSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSupervisor")
            .field("session", &self.session)
            .field("plan", &self.plan)
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}
