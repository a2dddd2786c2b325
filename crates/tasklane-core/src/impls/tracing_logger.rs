//! TracingLogger - `tracing` への転送
//!
//! 各レベルを対応する `tracing` マクロに流します。
//! subscriber の設定は利用側（CLI など）が行います。

use tracing::{error, info, trace, warn};

use crate::ports::QueueLogger;

/// Forwards queue log lines to `tracing` under the `tasklane` target.
///
/// `fatal` has no tracing level of its own and is emitted as `error` with `fatal = true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl QueueLogger for TracingLogger {
    fn log(&self, message: &str) {
        info!(target: "tasklane", "{message}");
    }

    fn fatal(&self, message: &str) {
        error!(target: "tasklane", fatal = true, "{message}");
    }

    fn error(&self, message: &str) {
        error!(target: "tasklane", "{message}");
    }

    fn warn(&self, message: &str) {
        warn!(target: "tasklane", "{message}");
    }

    fn trace(&self, message: &str) {
        trace!(target: "tasklane", "{message}");
    }
}
