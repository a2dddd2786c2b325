//! Ports - 抽象化レイヤー
//!
//! runner が外部に依存する箇所（ログ出力・ID 生成）を trait として定義します。

pub mod id_generator;
pub mod logger;

pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::logger::QueueLogger;
