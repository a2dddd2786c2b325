use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tasklane_core::impls::TracingLogger;
use tasklane_core::{QueueConfig, QueueError, QueueLogger, TaskQueue, WaitError};
use tokio::time::{Duration, sleep};
use tracing::{info, warn};

const SELECTION: i64 = 10;

/// TracingLogger に error 件数のカウントを足したもの
struct CountingLogger {
    inner: TracingLogger,
    errors: AtomicU32,
}

impl CountingLogger {
    fn new() -> Self {
        Self {
            inner: TracingLogger,
            errors: AtomicU32::new(0),
        }
    }

    fn errors(&self) -> u32 {
        self.errors.load(Ordering::SeqCst)
    }
}

impl QueueLogger for CountingLogger {
    fn log(&self, message: &str) {
        self.inner.log(message);
    }

    fn fatal(&self, message: &str) {
        self.inner.fatal(message);
    }

    fn error(&self, message: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.inner.error(message);
    }

    fn warn(&self, message: &str) {
        self.inner.warn(message);
    }

    fn trace(&self, message: &str) {
        self.inner.trace(message);
    }
}

/// 失敗を投げた回数。最後にロガー側の件数と突き合わせる
#[derive(Default)]
struct Jobs {
    thrown: AtomicU32,
    calls: AtomicU32,
}

impl Jobs {
    async fn square(&self, n: i64) -> Result<i64, String> {
        // 奇数回目は短く、偶数回目は長く
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let pause = if call % 2 == 0 { 5 } else { 40 };
        sleep(Duration::from_millis(pause)).await;
        Ok(n * n)
    }

    fn fail(&self, n: i64) -> Result<i64, String> {
        self.thrown.fetch_add(1, Ordering::SeqCst);
        Err(format!("job {n} blew up"))
    }

    /// 3 回に 1 回失敗する
    async fn flaky(&self, n: i64) -> Result<i64, String> {
        if self.calls.load(Ordering::SeqCst) % 3 == 0 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            return self.fail(n);
        }
        self.square(n).await
    }
}

fn load_config(logger: Arc<CountingLogger>) -> Result<QueueConfig, QueueError> {
    let config = match std::env::args().nth(1) {
        Some(raw) => QueueConfig::from_json(&raw)?,
        None => QueueConfig::default().with_capacity(1500).with_retries(40),
    };
    Ok(config.with_label("demo").with_logger(logger))
}

/// awaited 呼び出しの失敗は呼び出し側で数える（ロガーには出ない）
fn settle(
    outcome: Result<i64, WaitError<String>>,
    caught: &AtomicU32,
    results: &mut Vec<i64>,
) -> Result<(), QueueError> {
    match outcome {
        Ok(value) => results.push(value),
        Err(WaitError::Task(err)) => {
            warn!(error = %err, "awaited job failed");
            caught.fetch_add(1, Ordering::SeqCst);
            results.push(-3);
        }
        Err(WaitError::Queue(err)) => return Err(err),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), QueueError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // (A) ロガーとキューを用意
    let logger = Arc::new(CountingLogger::new());
    let queue = TaskQueue::new(load_config(Arc::clone(&logger))?)?;
    info!(config = ?queue.config(), "queue ready");

    let jobs = Arc::new(Jobs::default());
    let caught = AtomicU32::new(0);
    let mut results = Vec::new();

    // (B) awaited を 1 件ずつ順番に
    for n in 0..SELECTION {
        let job = Arc::clone(&jobs);
        let outcome = queue.enqueue_and_wait(move || async move { job.flaky(n).await })?.await;
        settle(outcome, &caught, &mut results)?;
    }
    queue.wait().await;
    info!(?results, "phase 1 done");

    // (C) 必ず失敗する fire-and-forget をまとめて投入（リトライ上限まで回る）
    for n in -SELECTION..0 {
        let job = Arc::clone(&jobs);
        queue.enqueue(move || {
            let job = Arc::clone(&job);
            async move { job.fail(n) }
        })?;
    }
    info!(backlog = queue.len(), "phase 2 queued");

    // (D) awaited と fire-and-forget を交互に
    for n in 0..SELECTION {
        let job = Arc::clone(&jobs);
        if n % 3 == 0 {
            queue.enqueue(move || {
                let job = Arc::clone(&job);
                async move { job.flaky(n).await }
            })?;
        } else {
            let outcome = queue.enqueue_and_wait(move || async move { job.flaky(n).await })?.await;
            settle(outcome, &caught, &mut results)?;
        }
    }
    info!(?results, "phase 3 done");

    // (E) まとめて積んでから start
    for n in 0..SELECTION {
        let job = Arc::clone(&jobs);
        queue.enqueue(move || {
            let job = Arc::clone(&job);
            async move { job.flaky(n).await }
        })?;
    }
    queue.start()?;

    queue.wait().await;

    let thrown = jobs.thrown.load(Ordering::SeqCst);
    let reported = logger.errors() + caught.load(Ordering::SeqCst);
    info!(?results, thrown, reported, running = queue.is_running(), "all phases done");
    if thrown == reported {
        info!("every failure was reported");
    } else {
        warn!(thrown, reported, "failures went unreported");
    }
    Ok(())
}
