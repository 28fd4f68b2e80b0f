//! Top-level runner: one supervisor per configured session.
//!
//! [`build_supervisors`] assembles a [`SessionSupervisor`] for every
//! session in the config, using caller-supplied factories for the live
//! connection and the store so the binary decides the transports.
//! [`run_sessions`] runs them side by side until the shared shutdown
//! scope fires, then waits for every session to stop.

use std::sync::Arc;

use dcscribe_db::Sink;
use dcscribe_symbology::Encyclopedia;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::cancel::CancelScope;
use crate::config::{Config, SessionConfig};
use crate::stream::Connector;
use crate::supervisor::SessionSupervisor;
use crate::tasks::TaskPlan;

/// Build one supervisor per configured session.
pub fn build_supervisors<C, S>(
    config: &Config,
    encyclopedia: &Arc<Encyclopedia>,
    mut connector: C,
    mut sink: S,
) -> Vec<SessionSupervisor>
where
    C: FnMut(&SessionConfig) -> Arc<dyn Connector>,
    S: FnMut(&SessionConfig) -> Sink,
{
    config
        .sessions
        .iter()
        .map(|session| {
            info!(session = %session.short_name, name = %session.name, "Instantiating scribe");
            SessionSupervisor::new(
                &session.short_name,
                TaskPlan::from_specs(&session.tasks),
                connector(session),
                sink(session),
                Arc::clone(encyclopedia),
            )
        })
        .collect()
}

/// Run every supervisor until `shutdown` is cancelled and all have stopped.
///
/// Sessions are independent: one session failing never affects another.
pub async fn run_sessions(supervisors: Vec<SessionSupervisor>, shutdown: CancelScope) {
    let mut sessions = JoinSet::new();
    for supervisor in supervisors {
        sessions.spawn(supervisor.run(shutdown.clone()));
    }
    info!(count = sessions.len(), "All sessions started");

    while let Some(joined) = sessions.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "Session supervisor panicked");
        }
    }
    info!("All sessions stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use dcscribe_db::MemoryTable;

    use super::*;
    use crate::testing::{MockConnector, MockConsumer};

    const CONFIG: &str = r"
sessions:
  - name: Alpha
    short_name: alpha
    rpc: { host: a, port: 1 }
    database: { host: d, name: n, username: u }
    tasks: [{ kind: markpanels }]
  - name: Bravo
    short_name: bravo
    rpc: { host: b, port: 2 }
    database: { host: d, name: n, username: u }
    tasks: [{ kind: units, timer: 1 }]
";

    fn memory_sink() -> Sink {
        Sink::new(
            Arc::new(MemoryTable::new()),
            Arc::new(MemoryTable::new()),
            Arc::new(MemoryTable::new()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_run_independently_and_stop_together() {
        let config: Config = serde_yml::from_str(CONFIG).unwrap();
        let consumers = [
            Arc::new(MockConsumer::default()),
            Arc::new(MockConsumer::default()),
        ];
        let connectors: Vec<Arc<MockConnector>> = consumers
            .iter()
            .map(|consumer| Arc::new(MockConnector::new(Arc::clone(consumer), 0)))
            .collect();

        let mut next = connectors.iter();
        let supervisors = build_supervisors(
            &config,
            &Arc::new(Encyclopedia::default()),
            |_| Arc::clone(next.next().unwrap()) as Arc<dyn Connector>,
            |_| memory_sink(),
        );
        assert_eq!(
            supervisors.iter().map(SessionSupervisor::session).collect::<Vec<_>>(),
            vec!["alpha", "bravo"]
        );

        let shutdown = CancelScope::new();
        let run = tokio::spawn(run_sessions(supervisors, shutdown.clone()));

        // Bravo's unit stream keeps dropping; Alpha stays connected.
        tokio::time::sleep(Duration::from_secs(25)).await;
        let [alpha, bravo] = [&connectors[0], &connectors[1]]
            .map(|connector| connector.connects.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(alpha, 1);
        assert_eq!(bravo, 3);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), run)
            .await
            .unwrap()
            .unwrap();
    }
}
