//! Declarative task composition.
//!
//! A session's config lists task specs; [`TaskPlan::from_specs`] turns them
//! into the settings of the enabled task groups and [`TaskPlan::spawn`]
//! starts the concrete tasks of one connection cycle:
//!
//! | spec kind    | tasks                                                   |
//! |--------------|---------------------------------------------------------|
//! | `units`      | unit stream, unit accumulator                           |
//! | `markpanels` | mark panel stream, initial snapshot, mark panel accumulator |
//! | `airbases`   | airbase poll                                            |

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dcscribe_db::Sink;
use dcscribe_symbology::Encyclopedia;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;

use crate::accumulator::{Accumulator, FlushPolicy};
use crate::airbases::poll_airbases;
use crate::cancel::CancelScope;
use crate::config::{TaskKind, TaskSpec};
use crate::error::TaskError;
use crate::markpanels::{load_markpanels, stream_markpanels};
use crate::stream::StreamConsumer;
use crate::symbols::Symbolizer;
use crate::units::stream_units;

/// Concrete tasks of a connection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskName {
    /// Live unit stream.
    UnitStream,
    /// Unit batch accumulator.
    UnitAccumulator,
    /// Live mark panel stream.
    MarkPanelStream,
    /// Mark panel load on connect.
    MarkPanelSnapshot,
    /// Mark panel batch accumulator.
    MarkPanelAccumulator,
    /// Periodic airbase snapshot.
    AirbasePoll,
}

impl TaskName {
    /// Log name of the task.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnitStream => "unit_stream",
            Self::UnitAccumulator => "unit_accumulator",
            Self::MarkPanelStream => "markpanel_stream",
            Self::MarkPanelSnapshot => "markpanel_snapshot",
            Self::MarkPanelAccumulator => "markpanel_accumulator",
            Self::AirbasePoll => "airbase_poll",
        }
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskExit {
    /// Which task.
    pub task: TaskName,
    /// What it returned.
    pub result: Result<(), TaskError>,
}

/// Settings of the unit task group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitPlan {
    /// Accumulator flush window.
    pub flush_window: Duration,
    /// Stream poll-rate hint.
    pub poll_rate: u32,
}

/// The enabled task groups of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskPlan {
    /// Unit recording, if enabled.
    pub units: Option<UnitPlan>,
    /// Whether mark panels are recorded.
    pub markpanels: bool,
    /// Airbase poll interval, if enabled.
    pub airbases: Option<Duration>,
}

/// Everything the tasks of one connection cycle share.
#[derive(Clone)]
pub struct CycleContext {
    /// Session short name.
    pub session: Arc<str>,
    /// Live session connection for this cycle.
    pub consumer: Arc<dyn StreamConsumer>,
    /// Store tables.
    pub sink: Sink,
    /// Unit type lookup.
    pub encyclopedia: Arc<Encyclopedia>,
}

impl fmt::Debug for CycleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleContext")
            .field("session", &self.session)
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

impl TaskPlan {
    /// Build a plan from a session's task specs.
    ///
    /// Disabled specs and kinds missing from the list are left out.
    pub fn from_specs(specs: &[TaskSpec]) -> Self {
        let enabled = |kind: TaskKind| specs.iter().find(|spec| spec.kind == kind && spec.enabled);
        Self {
            units: enabled(TaskKind::Units).map(|spec| UnitPlan {
                flush_window: spec.timer(),
                poll_rate: spec.poll_rate(),
            }),
            markpanels: enabled(TaskKind::MarkPanels).is_some(),
            airbases: enabled(TaskKind::Airbases).map(TaskSpec::timer),
        }
    }

    /// Names of the tasks [`spawn`](Self::spawn) starts, in start order.
    pub fn task_names(&self) -> Vec<TaskName> {
        let mut names = Vec::new();
        if self.units.is_some() {
            names.extend([TaskName::UnitStream, TaskName::UnitAccumulator]);
        }
        if self.markpanels {
            names.extend([
                TaskName::MarkPanelStream,
                TaskName::MarkPanelSnapshot,
                TaskName::MarkPanelAccumulator,
            ]);
        }
        if self.airbases.is_some() {
            names.push(TaskName::AirbasePoll);
        }
        names
    }

    /// Whether no task is enabled.
    pub const fn is_empty(&self) -> bool {
        self.units.is_none() && !self.markpanels && self.airbases.is_none()
    }

    /// Start every enabled task under `scope`.
    ///
    /// Each task logs its own exit before reporting it through the set.
    pub fn spawn(&self, ctx: &CycleContext, scope: &CancelScope) -> JoinSet<TaskExit> {
        let mut tasks = JoinSet::new();
        let symbolizer = Symbolizer::new(Arc::clone(&ctx.session), Arc::clone(&ctx.encyclopedia));

        if let Some(units) = self.units {
            let (tx, rx) = mpsc::unbounded_channel();
            start(
                &mut tasks,
                ctx,
                TaskName::UnitStream,
                stream_units(
                    Arc::clone(&ctx.session),
                    Arc::clone(&ctx.consumer),
                    units.poll_rate,
                    tx,
                    scope.clone(),
                ),
            );
            let accumulator = Accumulator::new(
                Arc::clone(&ctx.session),
                "unit",
                FlushPolicy::new(units.flush_window),
                Arc::clone(&ctx.sink.units),
            )
            .with_prepare(Arc::new(symbolizer.clone()));
            start(
                &mut tasks,
                ctx,
                TaskName::UnitAccumulator,
                accumulator.run(rx, scope.clone()),
            );
        }

        if self.markpanels {
            let (tx, rx) = mpsc::unbounded_channel();
            start(
                &mut tasks,
                ctx,
                TaskName::MarkPanelStream,
                stream_markpanels(
                    Arc::clone(&ctx.session),
                    Arc::clone(&ctx.consumer),
                    tx.clone(),
                    scope.clone(),
                ),
            );
            start(
                &mut tasks,
                ctx,
                TaskName::MarkPanelSnapshot,
                load_markpanels(
                    Arc::clone(&ctx.session),
                    Arc::clone(&ctx.consumer),
                    tx,
                    scope.clone(),
                ),
            );
            let accumulator = Accumulator::new(
                Arc::clone(&ctx.session),
                "markpanel",
                FlushPolicy::markpanels(),
                Arc::clone(&ctx.sink.markpanels),
            );
            start(
                &mut tasks,
                ctx,
                TaskName::MarkPanelAccumulator,
                accumulator.run(rx, scope.clone()),
            );
        }

        if let Some(interval) = self.airbases {
            start(
                &mut tasks,
                ctx,
                TaskName::AirbasePoll,
                poll_airbases(
                    Arc::clone(&ctx.session),
                    Arc::clone(&ctx.consumer),
                    Arc::clone(&ctx.sink.airbases),
                    symbolizer,
                    interval,
                    scope.clone(),
                ),
            );
        }

        tasks
    }
}

fn start<F>(tasks: &mut JoinSet<TaskExit>, ctx: &CycleContext, task: TaskName, work: F)
where
    F: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    let session = Arc::clone(&ctx.session);
    tasks.spawn(async move {
        let result = work.await;
        match &result {
            Ok(()) => debug!(session = %session, task = task.as_str(), "Task finished"),
            Err(e) => e.log(&session, task.as_str()),
        }
        TaskExit { task, result }
    });
}
