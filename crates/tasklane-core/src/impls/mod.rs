//! Impls - ports の実装
//!
//! - **NoopLogger**: logger 未設定時のデフォルト
//! - **TracingLogger**: `tracing` に転送（本番用）
//! - **RecordingLogger**: メモリに記録（開発・テスト用）

pub mod recording;
pub mod tracing_logger;

pub use self::recording::{LogLevel, RecordingLogger};
pub use self::tracing_logger::TracingLogger;

use crate::ports::QueueLogger;

/// Drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl QueueLogger for NoopLogger {
    fn log(&self, _message: &str) {}
}
