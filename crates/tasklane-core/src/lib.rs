//! tasklane-core
//!
//! In-process, strictly ordered task lane.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, errors）
//! - **ports**: 抽象化レイヤー（QueueLogger, IdGenerator）
//! - **impls**: ports の実装（TracingLogger, RecordingLogger, NoopLogger）
//! - **queue**: TaskQueue 本体（config, backlog, drain run, chain）

pub mod domain;
pub mod impls;
pub mod ports;
pub mod queue;

pub use domain::{QueueError, TaskId, WaitError};
pub use ports::QueueLogger;
pub use queue::{QueueConfig, TaskHandle, TaskQueue};
