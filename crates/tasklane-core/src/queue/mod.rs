//! Queue module: config, task records, drain runs and the public runner.

mod chain;
mod config;
mod drain;
mod record;
mod runner;
mod state;


pub use config::{DEFAULT_CAPACITY, DEFAULT_LABEL, QueueConfig};
pub use runner::{TaskHandle, TaskQueue};
