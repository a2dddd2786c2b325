//! Execution chain: completion handles of drain runs.
//!
//! A run holds a `RunSignal`; everyone who needs to wait for it holds a
//! `RunHandle`. Dropping the signal settles every handle, which also covers
//! runs that unwind from a panic.

use tokio::sync::watch;

use crate::domain::RunId;

/// Held by the run itself. Settles its handles when dropped.
#[derive(Debug)]
pub(crate) struct RunSignal {
    _tx: watch::Sender<()>,
}

/// Clonable view of one run's completion.
#[derive(Debug, Clone)]
pub(crate) struct RunHandle {
    rx: watch::Receiver<()>,
}

impl RunHandle {
    /// A handle that is already settled.
    pub(crate) fn settled() -> Self {
        let (_, rx) = watch::channel(());
        Self { rx }
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.rx.has_changed().is_err()
    }

    /// Resolves once the run's signal is gone.
    pub(crate) async fn wait(mut self) {
        // the value never changes; `changed` only errors out when the sender drops
        while self.rx.changed().await.is_ok() {}
    }
}

/// Creates a fresh signal/handle pair for a new run.
pub(crate) fn link() -> (RunSignal, RunHandle) {
    let (tx, rx) = watch::channel(());
    (RunSignal { _tx: tx }, RunHandle { rx })
}

/// The most recently scheduled run, as seen by the next `enqueue_and_wait` or `wait`.
#[derive(Debug, Clone)]
pub(crate) struct ChainTail {
    pub run_id: Option<RunId>,
    pub handle: RunHandle,
}

impl ChainTail {
    pub(crate) fn settled() -> Self {
        Self {
            run_id: None,
            handle: RunHandle::settled(),
        }
    }

    pub(crate) fn new(run_id: RunId, handle: RunHandle) -> Self {
        Self {
            run_id: Some(run_id),
            handle,
        }
    }

    pub(crate) fn is(&self, run_id: RunId) -> bool {
        self.run_id == Some(run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use ulid::Ulid;

    #[tokio::test]
    async fn placeholder_is_settled() {
        let handle = RunHandle::settled();
        assert!(handle.is_settled());
        tokio::time::timeout(Duration::from_millis(50), handle.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn handle_settles_when_signal_drops() {
        let (signal, handle) = link();
        assert!(!handle.is_settled());

        let waiter = tokio::spawn(handle.clone().wait());
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(signal);
        tokio::time::timeout(Duration::from_millis(50), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(handle.is_settled());
    }

    #[test]
    fn tail_identifies_its_run() {
        let run_id = RunId::from_ulid(Ulid::new());
        let (_signal, handle) = link();
        let tail = ChainTail::new(run_id, handle);

        assert!(tail.is(run_id));
        assert!(!tail.is(RunId::from_ulid(Ulid::new())));
        assert!(!ChainTail::settled().is(run_id));
    }
}
