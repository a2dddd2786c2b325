//! Errors - エラー型と分類
//!
//! - `QueueError`: runner 自身のエラー（容量超過・不変条件違反・設定不備）
//! - `WaitError<E>`: `enqueue_and_wait` の呼び出し元が受け取るエラー

use thiserror::Error;

use super::ids::TaskId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Backlog is full; the task was not admitted.
    #[error("queue `{label}` is full (capacity={capacity})")]
    CapacityExceeded { label: String, capacity: usize },

    /// A targeted run started while another run held the lane.
    #[error("targeted run entered while the lane was already active")]
    ReentrancyViolation,

    /// A targeted run did not find its task where the chain guarantees it.
    #[error("awaited task {0} was lost")]
    LostWaitedTask(TaskId),

    /// The backlog was empty at dequeue time.
    #[error("dequeued from an empty backlog")]
    LostTask,

    #[error("invalid queue config: {0}")]
    InvalidConfig(String),

    #[error("no tokio runtime available to drive the queue")]
    NoRuntime,

    /// The run driving an awaited task panicked or was cancelled.
    #[error("drain run aborted: {0}")]
    RunAborted(String),
}

impl QueueError {
    /// Broken scheduling invariants. These are programming errors, never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            QueueError::ReentrancyViolation
                | QueueError::LostWaitedTask(_)
                | QueueError::LostTask
                | QueueError::RunAborted(_)
        )
    }
}

/// Failure observed by the caller of `enqueue_and_wait`.
#[derive(Debug, Error)]
pub enum WaitError<E> {
    /// The awaited task itself failed. Never retried.
    #[error("task failed: {0}")]
    Task(E),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl<E> WaitError<E> {
    pub fn into_task_error(self) -> Option<E> {
        match self {
            WaitError::Task(e) => Some(e),
            WaitError::Queue(_) => None,
        }
    }
}
