//! Domain model (IDs, errors).

pub mod errors;
pub mod ids;

pub use self::errors::{QueueError, WaitError};
pub use self::ids::{RunId, TaskId};
