//! Drain runs: the loop that pops the backlog head and executes it.
//!
//! Only one run holds the lane (`LaneState::active`) at a time.
//!
//! - **background run**: no target. Stops when the backlog is empty or when
//!   the head belongs to a waiting caller.
//! - **targeted run**: drains up to and including its own task, then stops.
//!
//! Targeted runs are chained: each one waits for the previously scheduled
//! run to settle before claiming the lane. Background runs are admitted only
//! when the lane is free and no targeted run is chained, so a targeted run
//! never finds the lane taken.
//!
//! A panicking task body is caught and handled like any other task failure,
//! so it never takes the run (or the lane) down with it.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio::runtime::Handle;

use super::chain::{self, ChainTail, RunHandle, RunSignal};
use super::config::QueueConfig;
use super::record::{DynWork, TaskRecord};
use super::state::{FailureAction, LaneState};
use crate::domain::{QueueError, RunId, TaskId};
use crate::impls::NoopLogger;
use crate::ports::{IdGenerator, QueueLogger};

/// How a drain run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DrainEnd {
    /// Backlog emptied.
    Drained,
    /// Head belongs to a waiting caller; left for its targeted run.
    Ceded,
    /// Targeted run executed its own task.
    Reached,
}

/// State shared by every clone of a queue and by its spawned runs.
pub(crate) struct Shared {
    pub config: QueueConfig,
    logger: Arc<dyn QueueLogger>,
    ids: Box<dyn IdGenerator>,
    state: Mutex<LaneState>,
}

/// Ownership of one run's slot in the chain, and of the lane once claimed.
///
/// Dropping it (normally or while unwinding) releases the lane if still held,
/// unregisters a targeted run, resets the chain tail if it still points here,
/// and finally settles the run's handle.
pub(crate) struct RunTicket {
    shared: Arc<Shared>,
    run_id: RunId,
    targeted: bool,
    holds_lane: bool,
    _signal: RunSignal,
}

impl RunTicket {
    /// Release the lane inside an existing critical section.
    fn release(&mut self, state: &mut LaneState) {
        if self.holds_lane {
            state.active = false;
            self.holds_lane = false;
        }
    }
}

impl Drop for RunTicket {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        if self.holds_lane {
            state.active = false;
        }
        if self.targeted {
            state.pending_targets = state.pending_targets.saturating_sub(1);
        }
        if state.tail.is(self.run_id) {
            state.tail = ChainTail::settled();
        }
        // `_signal` drops after this body, once the lock is released.
    }
}

impl Shared {
    pub(crate) fn new(config: QueueConfig, ids: Box<dyn IdGenerator>) -> Self {
        let logger = config
            .logger
            .clone()
            .unwrap_or_else(|| Arc::new(NoopLogger));
        Self {
            config,
            logger,
            ids,
            state: Mutex::new(LaneState::new()),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, LaneState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn line(&self, message: impl std::fmt::Display) -> String {
        format!("{} | {}", self.config.label, message)
    }

    fn fatal(&self, err: QueueError) -> QueueError {
        self.logger.fatal(&self.line(&err));
        err
    }

    fn capacity_check(&self, state: &LaneState) -> Result<(), QueueError> {
        if state.backlog.len() >= self.config.capacity {
            return Err(QueueError::CapacityExceeded {
                label: self.config.label.clone(),
                capacity: self.config.capacity,
            });
        }
        Ok(())
    }

    fn reject(&self, err: QueueError) -> QueueError {
        self.logger
            .error(&self.line(format_args!("rejected task: {err}")));
        err
    }

    /// Append an unattended task.
    pub(crate) fn admit(&self, work: Arc<dyn DynWork>) -> Result<TaskId, QueueError> {
        let admitted = {
            let mut state = self.lock();
            self.capacity_check(&state).map(|()| {
                let id = self.ids.generate_task_id();
                state.backlog.push_back(TaskRecord::new(id, work));
                id
            })
        };
        admitted.map_err(|err| self.reject(err))
    }

    /// Append an awaited task and chain a targeted run behind the current tail.
    ///
    /// Returns the task id, the handle to wait on, and the new run's ticket.
    pub(crate) fn admit_awaited(
        self: &Arc<Self>,
        work: Arc<dyn DynWork>,
    ) -> Result<(TaskId, RunHandle, RunTicket), QueueError> {
        let mut state = self.lock();
        if let Err(err) = self.capacity_check(&state) {
            drop(state);
            return Err(self.reject(err));
        }

        let id = self.ids.generate_task_id();
        state.backlog.push_back(TaskRecord::new(id, work));
        state.awaited.insert(id);
        state.pending_targets += 1;

        let run_id = self.ids.generate_run_id();
        let (signal, handle) = chain::link();
        let previous = std::mem::replace(&mut state.tail, ChainTail::new(run_id, handle));
        drop(state);

        let ticket = RunTicket {
            shared: Arc::clone(self),
            run_id,
            targeted: true,
            holds_lane: false,
            _signal: signal,
        };
        Ok((id, previous.handle, ticket))
    }

    /// Start a background run on `runtime` unless the lane is busy or there is nothing to drain.
    pub(crate) fn kick(self: &Arc<Self>, runtime: &Handle) {
        let (run_id, signal) = {
            let mut state = self.lock();
            if state.active || state.pending_targets > 0 || state.backlog.is_empty() {
                return;
            }
            state.active = true;
            let run_id = self.ids.generate_run_id();
            let (signal, handle) = chain::link();
            state.tail = ChainTail::new(run_id, handle);
            (run_id, signal)
        };

        let mut ticket = RunTicket {
            shared: Arc::clone(self),
            run_id,
            targeted: false,
            holds_lane: true,
            _signal: signal,
        };
        let shared = Arc::clone(self);
        runtime.spawn(async move {
            // fatal errors are already reported through the logger
            let _ = shared.drain(&mut ticket, None).await;
            drop(ticket);
        });
    }

    /// Take the lane for a targeted run.
    pub(crate) fn claim(&self, ticket: &mut RunTicket) -> Result<(), QueueError> {
        let mut state = self.lock();
        if state.active {
            drop(state);
            return Err(self.fatal(QueueError::ReentrancyViolation));
        }
        state.active = true;
        ticket.holds_lane = true;
        Ok(())
    }

    async fn pace(&self) {
        let delay = self.config.delay();
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
    }

    /// Run the drain loop. The lane must already be held through `ticket`.
    pub(crate) async fn drain(
        &self,
        ticket: &mut RunTicket,
        target: Option<TaskId>,
    ) -> Result<DrainEnd, QueueError> {
        let waited = target
            .map(|id| format!(" | waited for {id}"))
            .unwrap_or_default();

        let backlog = self.lock().backlog.len();
        self.logger
            .trace(&self.line(format_args!("run started, backlog={backlog}{waited}")));

        loop {
            let task = {
                let mut state = self.lock();

                if let Some(head) = state.foreign_awaited_head(target) {
                    match target {
                        None => {
                            ticket.release(&mut state);
                            drop(state);
                            self.logger
                                .trace(&self.line(format_args!("ceded to awaited {head}")));
                            return Ok(DrainEnd::Ceded);
                        }
                        Some(id) => {
                            drop(state);
                            return Err(self.fatal(QueueError::LostWaitedTask(id)));
                        }
                    }
                }

                if state.backlog.is_empty() {
                    ticket.release(&mut state);
                    drop(state);
                    return match target {
                        None => {
                            self.logger.trace(&self.line("backlog drained"));
                            Ok(DrainEnd::Drained)
                        }
                        Some(id) => Err(self.fatal(QueueError::LostWaitedTask(id))),
                    };
                }

                let Some(task) = state.backlog.pop_front() else {
                    drop(state);
                    return Err(self.fatal(QueueError::LostTask));
                };
                let backlog = state.backlog.len();
                drop(state);

                self.logger.trace(&self.line(format_args!(
                    "dequeued {}, backlog={backlog}{waited}",
                    task.id
                )));
                task
            };

            self.pace().await;
            let (outcome, panicked) = match execute(&task).await {
                Ok(outcome) => (outcome, false),
                Err(payload) => (Err(format!("panicked: {payload}")), true),
            };
            let task_id = task.id;
            let is_target = Some(task_id) == target;

            let mut state = self.lock();
            let action = match &outcome {
                Ok(()) => {
                    state.forget(task_id);
                    None
                }
                Err(_) if is_target => None,
                Err(_) => Some(
                    state.retry_or_drop(task, self.config.non_wait_retries_per_task),
                ),
            };
            if is_target {
                state.forget(task_id);
                ticket.release(&mut state);
            }
            drop(state);

            if let (Err(message), false) = (&outcome, is_target) {
                self.logger
                    .error(&self.line(format_args!("task {task_id} failed: {message}")));
            }
            match action {
                Some(FailureAction::Retried(n)) => self
                    .logger
                    .trace(&self.line(format_args!("retrying {task_id} (retry {n})"))),
                Some(FailureAction::Dropped) => self
                    .logger
                    .trace(&self.line(format_args!("dropped {task_id}"))),
                None => {}
            }
            self.logger
                .trace(&self.line(format_args!("finished {task_id}{waited}")));

            if is_target {
                // a panicked target never replied; its caller gets the abort instead
                if let (true, Err(message)) = (panicked, outcome) {
                    return Err(QueueError::RunAborted(format!("task {task_id} {message}")));
                }
                return Ok(DrainEnd::Reached);
            }
        }
    }
}

/// Run one task body. A panic comes back as `Err` carrying its message.
async fn execute(task: &TaskRecord) -> Result<Result<(), String>, String> {
    AssertUnwindSafe(task.work.call())
        .catch_unwind()
        .await
        .map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "non-string panic payload".to_string()
    }
}
