//! RecordingLogger - 開発・テスト用のログ記録
//!
//! 出力されたログをレベル付きでメモリに保持します。

use std::sync::{Mutex, PoisonError};

use crate::ports::QueueLogger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Log,
    Fatal,
    Error,
    Warn,
    Trace,
}

/// Keeps every line it receives, in order.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: LogLevel, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }

    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages recorded at `level`.
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.messages(level).len()
    }
}

impl QueueLogger for RecordingLogger {
    fn log(&self, message: &str) {
        self.push(LogLevel::Log, message);
    }

    fn fatal(&self, message: &str) {
        self.push(LogLevel::Fatal, message);
    }

    fn error(&self, message: &str) {
        self.push(LogLevel::Error, message);
    }

    fn warn(&self, message: &str) {
        self.push(LogLevel::Warn, message);
    }

    fn trace(&self, message: &str) {
        self.push(LogLevel::Trace, message);
    }
}
