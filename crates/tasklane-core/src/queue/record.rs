//! Task record: id + type-erased work.
//!
//! The backlog stores heterogeneous closures behind `DynWork`, the same way
//! typed handlers are erased before they go into a registry.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::domain::TaskId;

/// Object-safe unit of work. `Err` carries the failure rendered for logs.
#[async_trait]
pub(crate) trait DynWork: Send + Sync {
    async fn call(&self) -> Result<(), String>;
}

/// Unattended work: re-callable, output discarded.
pub(crate) struct FnWork<F, Fut, T, E> {
    func: F,
    _marker: PhantomData<fn() -> (Fut, T, E)>,
}

impl<F, Fut, T, E> FnWork<F, Fut, T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    pub(crate) fn new(func: F) -> Self {
        Self {
            func,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut, T, E> DynWork for FnWork<F, Fut, T, E>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    async fn call(&self) -> Result<(), String> {
        match (self.func)().await {
            Ok(_) => Ok(()),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Awaited work: runs once and hands the typed outcome to the waiting caller.
pub(crate) struct ReplyWork<F, Fut, T, E> {
    func: Mutex<Option<F>>,
    reply: Mutex<Option<oneshot::Sender<Result<T, E>>>>,
    _marker: PhantomData<fn() -> Fut>,
}

impl<F, Fut, T, E> ReplyWork<F, Fut, T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    pub(crate) fn new(func: F, reply: oneshot::Sender<Result<T, E>>) -> Self {
        Self {
            func: Mutex::new(Some(func)),
            reply: Mutex::new(Some(reply)),
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut, T, E> DynWork for ReplyWork<F, Fut, T, E>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    async fn call(&self) -> Result<(), String> {
        let func = self.func.lock().unwrap_or_else(PoisonError::into_inner).take();
        debug_assert!(func.is_some(), "awaited work is executed once, by its targeted run");
        let Some(func) = func else {
            return Err("awaited work was already consumed".to_string());
        };

        let outcome = func().await;
        let failure = outcome.as_ref().err().map(ToString::to_string);

        let reply = self.reply.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(reply) = reply {
            // ignore send error: the caller dropped its handle
            let _ = reply.send(outcome);
        }

        match failure {
            Some(message) => Err(message),
            None => Ok(()),
        }
    }
}

/// One backlog entry. A retry re-appends the same record (same id, same work).
#[derive(Clone)]
pub(crate) struct TaskRecord {
    pub id: TaskId,
    pub work: Arc<dyn DynWork>,
}

impl TaskRecord {
    pub(crate) fn new(id: TaskId, work: Arc<dyn DynWork>) -> Self {
        Self { id, work }
    }
}

impl fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
