//! Lane state: backlog + per-task bookkeeping + chain tail.

use std::collections::{HashMap, HashSet, VecDeque};

use super::chain::ChainTail;
use super::record::TaskRecord;
use crate::domain::TaskId;

/// Everything a queue instance owns, behind one mutex.
///
/// The mutex is never held across an `.await` or while user code runs.
#[derive(Debug)]
pub(crate) struct LaneState {
    /// FIFO backlog. Appended at the tail, consumed from the head.
    pub backlog: VecDeque<TaskRecord>,

    /// Ids whose caller is blocked in `enqueue_and_wait`.
    pub awaited: HashSet<TaskId>,

    /// Failed attempts so far, unattended tasks only.
    pub attempts: HashMap<TaskId, u32>,

    /// Set while a drain run holds the lane.
    pub active: bool,

    /// Targeted runs that are chained but not finished yet.
    pub pending_targets: usize,

    pub tail: ChainTail,
}

/// What happened to an unattended task after it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureAction {
    /// Re-appended at the tail; carries the retry number (1-based).
    Retried(u32),
    Dropped,
}

impl LaneState {
    pub(crate) fn new() -> Self {
        Self {
            backlog: VecDeque::new(),
            awaited: HashSet::new(),
            attempts: HashMap::new(),
            active: false,
            pending_targets: 0,
            tail: ChainTail::settled(),
        }
    }

    /// Remove all bookkeeping for `id`.
    pub(crate) fn forget(&mut self, id: TaskId) {
        self.attempts.remove(&id);
        self.awaited.remove(&id);
    }

    /// Head task that belongs to a waiting caller other than `target`.
    pub(crate) fn foreign_awaited_head(&self, target: Option<TaskId>) -> Option<TaskId> {
        let head = self.backlog.front()?.id;
        (self.awaited.contains(&head) && Some(head) != target).then_some(head)
    }

    /// Retry `task` at the tail if it has retries left, otherwise drop it.
    pub(crate) fn retry_or_drop(&mut self, task: TaskRecord, max_retries: u32) -> FailureAction {
        let attempts = self.attempts.get(&task.id).copied().unwrap_or(0);
        if attempts < max_retries {
            self.attempts.insert(task.id, attempts + 1);
            self.backlog.push_back(task);
            FailureAction::Retried(attempts + 1)
        } else {
            self.forget(task.id);
            FailureAction::Dropped
        }
    }
}
