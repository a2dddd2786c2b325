//! TaskQueue: the public surface of the lane.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::config::QueueConfig;
use super::drain::Shared;
use super::record::{FnWork, ReplyWork};
use crate::domain::{QueueError, WaitError};
use crate::ports::{IdGenerator, UlidGenerator};

/// Strictly ordered, single-lane task runner.
///
/// Tasks run one at a time in arrival order. Clones share the same lane.
///
/// ```ignore
/// let queue = TaskQueue::new(QueueConfig::default().with_retries(2))?;
///
/// // fire-and-forget; retried on failure, never reported to the caller
/// queue.enqueue(|| async { sync_cache().await })?;
///
/// // enqueue and block on this exact task's outcome
/// let rows = queue.enqueue_and_wait(|| async { load_rows().await })?.await?;
///
/// queue.wait().await;
/// ```
#[derive(Clone)]
pub struct TaskQueue {
    shared: Arc<Shared>,
}

impl TaskQueue {
    pub fn new(config: QueueConfig) -> Result<Self, QueueError> {
        Self::with_id_generator(config, Box::new(UlidGenerator::new()))
    }

    pub fn with_id_generator(
        config: QueueConfig,
        ids: Box<dyn IdGenerator>,
    ) -> Result<Self, QueueError> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared::new(config, ids)),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// Append a fire-and-forget task.
    ///
    /// `work` must be re-callable: a failed attempt is retried by calling it
    /// again, up to `non_wait_retries_per_task` times.
    pub fn enqueue<F, Fut, T, E>(&self, work: F) -> Result<(), QueueError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let runtime = if self.shared.config.non_wait_auto_process {
            Some(current_runtime()?)
        } else {
            None
        };

        self.shared.admit(Arc::new(FnWork::new(work)))?;

        if let Some(runtime) = runtime {
            self.shared.kick(&runtime);
        }
        Ok(())
    }

    /// Append a task and get a handle resolving to its own outcome.
    ///
    /// Admission and chaining happen before this returns, so handles obtained
    /// back-to-back resolve in call order. The task runs even if the handle
    /// is dropped; its outcome is then discarded.
    pub fn enqueue_and_wait<F, Fut, T, E>(&self, work: F) -> Result<TaskHandle<T, E>, QueueError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let runtime = current_runtime()?;
        let (reply_tx, reply_rx) = oneshot::channel();
        let (task_id, previous, mut ticket) = self
            .shared
            .admit_awaited(Arc::new(ReplyWork::new(work, reply_tx)))?;

        let shared = Arc::clone(&self.shared);
        let join = runtime.spawn(async move {
            previous.wait().await;

            let end = match shared.claim(&mut ticket) {
                Ok(()) => shared.drain(&mut ticket, Some(task_id)).await,
                Err(err) => Err(err),
            };
            drop(ticket);

            if shared.config.non_wait_auto_process
                && let Ok(runtime) = Handle::try_current()
            {
                shared.kick(&runtime);
            }

            if let Err(err) = end {
                return Err(WaitError::Queue(err));
            }
            match reply_rx.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(WaitError::Task(err)),
                Err(_) => Err(WaitError::Queue(QueueError::LostWaitedTask(task_id))),
            }
        });

        Ok(TaskHandle { join })
    }

    /// Start a background drain if the lane is idle. Idempotent.
    pub fn start(&self) -> Result<(), QueueError> {
        let runtime = current_runtime()?;
        self.shared.kick(&runtime);
        Ok(())
    }

    /// Wait for the run scheduled at call time to finish.
    ///
    /// Work enqueued after this call may still be pending when it returns.
    pub async fn wait(&self) {
        let handle = self.shared.lock().tail.handle.clone();
        handle.wait().await;
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().active
    }

    /// Tasks currently in the backlog (not counting the one executing).
    pub fn len(&self) -> usize {
        self.shared.lock().backlog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("TaskQueue")
            .field("label", &self.shared.config.label)
            .field("backlog", &state.backlog.len())
            .field("active", &state.active)
            .finish()
    }
}

fn current_runtime() -> Result<Handle, QueueError> {
    Handle::try_current().map_err(|_| QueueError::NoRuntime)
}

/// Outcome of one `enqueue_and_wait` call.
///
/// Resolves with the task's value, `WaitError::Task` with its failure, or
/// `WaitError::Queue` when the runner itself failed.
pub struct TaskHandle<T, E> {
    join: JoinHandle<Result<T, WaitError<E>>>,
}

impl<T, E> TaskHandle<T, E> {
    /// True once the task has run and its outcome is ready.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = Result<T, WaitError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.join).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(err)) => Poll::Ready(Err(WaitError::Queue(QueueError::RunAborted(
                err.to_string(),
            )))),
        }
    }
}

impl<T, E> fmt::Debug for TaskHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("finished", &self.join.is_finished())
            .finish()
    }
}
