//! IdGenerator port - ID 生成の抽象化
//!
//! テスト容易性のために trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: プロセス内で単調増加する ULID

use std::sync::{Mutex, PoisonError};

use ulid::{Generator, Ulid};

use crate::domain::ids::{RunId, TaskId};

/// Generates ids that stay unique for the lifetime of a queue.
///
/// `Send + Sync` so a single generator can be shared by every clone of a queue.
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;

    fn generate_run_id(&self) -> RunId;
}

/// ULID generator that is monotonic within the process.
///
/// Two ids minted in the same millisecond still compare in creation order.
pub struct UlidGenerator {
    inner: Mutex<Generator>,
}

impl UlidGenerator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Generator::new()),
        }
    }

    fn next(&self) -> Ulid {
        let mut generator = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // Random part overflowed inside one millisecond: fall back to a fresh random ULID.
        generator.generate().unwrap_or_else(|_| Ulid::new())
    }
}

impl Default for UlidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for UlidGenerator {
    fn generate_task_id(&self) -> TaskId {
        TaskId::from(self.next())
    }

    fn generate_run_id(&self) -> RunId {
        RunId::from(self.next())
    }
}
