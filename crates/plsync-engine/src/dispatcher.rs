//! Action dispatcher - runs configured actions once or on recurring timers
//!
//! ## One-shot
//!
//! [`ActionDispatcher::run_once`] executes actions sequentially in file order.
//! A failure is logged and counted but never prevents later actions from
//! running; the entry point decides the exit code from the [`DispatchSummary`].
//!
//! ## Scheduled
//!
//! [`ActionDispatcher::schedule`] gives every action its own timer task:
//!
//! ```text
//! schedule ──┬── timer[0] ── tick ──→ spawn run ──→ engine
//!            ├── timer[1] ── tick ──→ spawn run ──→ engine
//!            └── heartbeat (tick_seconds) until shutdown
//! ```
//!
//! Each trigger runs in its own task, so a slow run never delays another
//! action's timer. A tick that fires while the same action is still running
//! is skipped. Cancelling the shutdown token stops the timers; in-flight runs
//! are not awaited.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

use plsync_core::domain::{Action, RunId};

use crate::engine::{ReconcileReport, ReconciliationEngine};
use crate::EngineError;

/// Default heartbeat period of the scheduler loop
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

// ============================================================================
// Action state table
// ============================================================================

/// Lifecycle state of one configured action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum ActionState {
    /// Known but never scheduled or run
    Idle,
    /// Waiting for its next timer tick
    Scheduled,
    Running,
    /// Last run succeeded
    Done,
    /// Last run failed with this error
    Failed(String),
}

/// Current state plus run history of one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionStatus {
    pub state: ActionState,
    /// Completion time of the last run, successful or not
    pub last_run: Option<DateTime<Utc>>,
    pub runs: u64,
}

impl Default for ActionStatus {
    fn default() -> Self {
        Self {
            state: ActionState::Idle,
            last_run: None,
            runs: 0,
        }
    }
}

// ============================================================================
// DispatchSummary
// ============================================================================

/// A failed action from a one-shot dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionFailure {
    /// Position of the action in the action file
    pub index: usize,
    pub action: String,
    pub error: String,
}

/// Outcome of [`ActionDispatcher::run_once`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub reports: Vec<ReconcileReport>,
    pub failures: Vec<ActionFailure>,
}

impl DispatchSummary {
    /// True when no action failed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

// ============================================================================
// ActionDispatcher
// ============================================================================

/// Turns a list of actions into isolated units of work
///
/// Cloning is cheap and every clone shares the same engine and state table.
#[derive(Clone)]
pub struct ActionDispatcher {
    engine: Arc<ReconciliationEngine>,
    states: Arc<DashMap<usize, ActionStatus>>,
    tick: Duration,
}

impl ActionDispatcher {
    pub fn new(engine: Arc<ReconciliationEngine>) -> Self {
        Self {
            engine,
            states: Arc::new(DashMap::new()),
            tick: DEFAULT_TICK,
        }
    }

    /// Overrides the heartbeat period (`scheduler.tick_seconds`)
    pub fn with_tick(mut self, tick: Duration) -> Self {
        if !tick.is_zero() {
            self.tick = tick;
        }
        self
    }

    /// State of the action at `index`, if it was ever scheduled or run
    pub fn status(&self, index: usize) -> Option<ActionStatus> {
        self.states.get(&index).map(|s| s.value().clone())
    }

    /// All known action states, ordered by index
    pub fn statuses(&self) -> Vec<(usize, ActionStatus)> {
        let mut all: Vec<_> = self
            .states
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        all.sort_by_key(|(index, _)| *index);
        all
    }

    /// Runs every action once, sequentially, in order
    ///
    /// Failures are logged at `error` and recorded in the summary; they never
    /// stop later actions.
    pub async fn run_once(&self, actions: &[Action]) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        for (index, action) in actions.iter().enumerate() {
            match self.execute(index, action).await {
                Ok(report) => {
                    summary.succeeded += 1;
                    summary.reports.push(report);
                }
                Err(e) => {
                    summary.failed += 1;
                    summary.failures.push(ActionFailure {
                        index,
                        action: action.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Dispatch finished"
        );
        summary
    }

    /// Runs every action on its own recurring timer until `shutdown` fires
    ///
    /// The first run of each action happens one full interval after this is
    /// called; callers wanting an immediate pass call
    /// [`run_once`](Self::run_once) first.
    pub async fn schedule(&self, actions: Vec<Action>, shutdown: CancellationToken) {
        let count = actions.len();
        if count == 0 {
            warn!("No actions configured, scheduler will only wait for shutdown");
        }

        let mut timers = JoinSet::new();
        let mut timer_ids = HashMap::with_capacity(count);
        for (index, action) in actions.into_iter().enumerate() {
            self.set_state(index, ActionState::Scheduled);
            info!(
                index,
                action = %action,
                interval_secs = action.interval_seconds(),
                "Scheduling action"
            );
            let dispatcher = self.clone();
            let shutdown = shutdown.clone();
            let handle =
                timers.spawn(async move { dispatcher.run_timer(index, action, shutdown).await });
            timer_ids.insert(handle.id(), index);
        }

        info!(
            actions = count,
            tick_secs = self.tick.as_secs_f64(),
            "Scheduler started"
        );

        let mut heartbeat = tokio::time::interval(self.tick);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = heartbeat.tick() => {
                    trace!(running = self.running_count(), "Scheduler heartbeat");
                }
                Some(joined) = timers.join_next_with_id(), if !timers.is_empty() => {
                    self.timer_exited(&timer_ids, joined);
                }
            }
        }

        while let Some(joined) = timers.join_next_with_id().await {
            self.timer_exited(&timer_ids, joined);
        }
        info!(running = self.running_count(), "Scheduler stopped");
    }

    /// Per-action timer loop; first trigger one interval from now
    async fn run_timer(self, index: usize, action: Action, shutdown: CancellationToken) {
        let action = Arc::new(action);
        let period = action.interval();
        let Some(start) = Instant::now().checked_add(period) else {
            error!(
                index,
                action = %action,
                interval_secs = action.interval_seconds(),
                "Interval too large to schedule, action will not run"
            );
            self.set_state(
                index,
                ActionState::Failed(format!(
                    "interval of {}s is too large to schedule",
                    action.interval_seconds()
                )),
            );
            return;
        };
        let mut timer = tokio::time::interval_at(start, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => self.trigger(index, &action),
            }
        }
        debug!(index, "Action timer stopped");
    }

    /// Records how a timer task ended; a crashed timer marks its action failed
    fn timer_exited(&self, timer_ids: &HashMap<Id, usize>, joined: Result<(Id, ()), JoinError>) {
        match joined {
            Ok((id, ())) => {
                trace!(index = ?timer_ids.get(&id), "Action timer task finished");
            }
            Err(e) if e.is_cancelled() => {
                debug!(index = ?timer_ids.get(&e.id()), "Action timer task cancelled");
            }
            Err(e) => {
                let index = timer_ids.get(&e.id()).copied();
                error!(index = ?index, error = %e, "Action timer crashed, action will not run again");
                if let Some(index) = index {
                    self.set_state(index, ActionState::Failed(format!("timer stopped: {e}")));
                }
            }
        }
    }

    /// Starts a run in its own task unless the previous one is still going
    fn trigger(&self, index: usize, action: &Arc<Action>) {
        if self.is_running(index) {
            warn!(index, action = %action, "Previous run still in progress, skipping tick");
            return;
        }

        // Marked here rather than inside the task so the next tick sees it
        self.set_state(index, ActionState::Running);

        let dispatcher = self.clone();
        let action = Arc::clone(action);
        tokio::spawn(async move {
            // already logged and recorded in the state table
            let _ = dispatcher.execute(index, &action).await;
        });
    }

    async fn execute(&self, index: usize, action: &Action) -> Result<ReconcileReport, EngineError> {
        let run_id = RunId::new();
        let span = info_span!("action_run", run_id = %run_id, index, kind = %action.kind());

        async {
            self.set_state(index, ActionState::Running);
            info!(action = %action, "Running action");

            let result = self.engine.run(action).await;
            match &result {
                Ok(report) => {
                    info!(
                        destination = %report.destination,
                        fetched = report.fetched,
                        appended = report.appended,
                        duration_ms = report.duration_ms,
                        "Action completed"
                    );
                    self.finish(index, ActionState::Done);
                }
                Err(e) => {
                    error!(action = %action, error = %e, "Action failed");
                    self.finish(index, ActionState::Failed(e.to_string()));
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    fn set_state(&self, index: usize, state: ActionState) {
        self.states.entry(index).or_default().state = state;
    }

    fn finish(&self, index: usize, state: ActionState) {
        let mut status = self.states.entry(index).or_default();
        status.state = state;
        status.last_run = Some(Utc::now());
        status.runs += 1;
    }

    fn is_running(&self, index: usize) -> bool {
        self.states
            .get(&index)
            .is_some_and(|s| s.state == ActionState::Running)
    }

    fn running_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| s.state == ActionState::Running)
            .count()
    }
}
