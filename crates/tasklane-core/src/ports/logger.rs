//! QueueLogger port - ログ出力の抽象化
//!
//! `log` のみ必須。レベル付きのメソッドは任意で、実装しなければ何もしません。
//! runner はどのレベルが欠けていても動作します。

/// Logging capability consumed by the queue.
///
/// Every message arrives preformatted (`"{label} | ..."`).
pub trait QueueLogger: Send + Sync {
    fn log(&self, message: &str);

    /// Emitted right before a fatal `QueueError` is returned.
    fn fatal(&self, _message: &str) {}

    /// Capacity rejections and unattended task failures.
    fn error(&self, _message: &str) {}

    fn warn(&self, _message: &str) {}

    /// Run start, dequeue, retry and completion.
    fn trace(&self, _message: &str) {}
}
