//! Queue configuration: defaults + caller overrides.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::QueueError;
use crate::ports::QueueLogger;

pub const DEFAULT_CAPACITY: usize = 50;
pub const DEFAULT_LABEL: &str = "TaskQueue";

/// Construction-time settings of a [`TaskQueue`](super::TaskQueue).
///
/// Immutable once the queue is built. Every field has a default, so callers
/// only set what they care about:
///
/// ```ignore
/// let config = QueueConfig::default()
///     .with_capacity(2)
///     .with_retries(3)
///     .with_logger(Arc::new(TracingLogger));
///
/// // or from JSON; omitted keys keep their defaults
/// let config = QueueConfig::from_json(r#"{ "delay_ms": 10 }"#)?;
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Pause before each task, in milliseconds.
    pub delay_ms: u64,

    /// Maximum backlog length accepted by `enqueue` / `enqueue_and_wait`.
    pub capacity: usize,

    /// Prefix of every log line.
    pub label: String,

    /// Retries for unattended tasks. Awaited tasks never retry.
    pub non_wait_retries_per_task: u32,

    /// Whether `enqueue` starts a background drain on its own.
    pub non_wait_auto_process: bool,

    #[serde(skip)]
    pub logger: Option<Arc<dyn QueueLogger>>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            delay_ms: 0,
            capacity: DEFAULT_CAPACITY,
            label: DEFAULT_LABEL.to_string(),
            non_wait_retries_per_task: 0,
            non_wait_auto_process: true,
            logger: None,
        }
    }
}

impl QueueConfig {
    /// Parse overrides from JSON on top of the defaults.
    pub fn from_json(raw: &str) -> Result<Self, QueueError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| QueueError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        if self.capacity == 0 {
            return Err(QueueError::InvalidConfig(
                "capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.non_wait_retries_per_task = retries;
        self
    }

    pub fn with_auto_process(mut self, enabled: bool) -> Self {
        self.non_wait_auto_process = enabled;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn QueueLogger>) -> Self {
        self.logger = Some(logger);
        self
    }
}

impl fmt::Debug for QueueConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueConfig")
            .field("delay_ms", &self.delay_ms)
            .field("capacity", &self.capacity)
            .field("label", &self.label)
            .field("non_wait_retries_per_task", &self.non_wait_retries_per_task)
            .field("non_wait_auto_process", &self.non_wait_auto_process)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::NoopLogger;
    use rstest::rstest;

    #[test]
    fn defaults_match_documented_values() {
        let config = QueueConfig::default();
        assert_eq!(config.delay_ms, 0);
        assert_eq!(config.capacity, 50);
        assert_eq!(config.label, "TaskQueue");
        assert_eq!(config.non_wait_retries_per_task, 0);
        assert!(config.non_wait_auto_process);
        assert!(config.logger.is_none());
    }

    #[test]
    fn json_overrides_merge_onto_defaults() {
        let config = QueueConfig::from_json(r#"{ "capacity": 1500, "non_wait_retries_per_task": 40 }"#)
            .unwrap();
        assert_eq!(config.capacity, 1500);
        assert_eq!(config.non_wait_retries_per_task, 40);
        assert_eq!(config.delay_ms, 0);
        assert_eq!(config.label, DEFAULT_LABEL);
        assert!(config.non_wait_auto_process);
    }

    #[rstest]
    #[case::zero_capacity(r#"{ "capacity": 0 }"#)]
    #[case::negative_delay(r#"{ "delay_ms": -1 }"#)]
    #[case::not_json("capacity=3")]
    fn invalid_json_is_rejected(#[case] raw: &str) {
        let err = QueueConfig::from_json(raw).unwrap_err();
        assert!(matches!(err, QueueError::InvalidConfig(_)));
    }

    #[test]
    fn builder_methods_override_fields() {
        let config = QueueConfig::default()
            .with_delay(Duration::from_millis(25))
            .with_capacity(3)
            .with_label("uploads")
            .with_retries(2)
            .with_auto_process(false)
            .with_logger(Arc::new(NoopLogger));

        assert_eq!(config.delay(), Duration::from_millis(25));
        assert_eq!(config.capacity, 3);
        assert_eq!(config.label, "uploads");
        assert_eq!(config.non_wait_retries_per_task, 2);
        assert!(!config.non_wait_auto_process);
        assert!(config.logger.is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn logger_is_not_serialized() {
        let config = QueueConfig::default().with_logger(Arc::new(NoopLogger));
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("logger").is_none());
        assert_eq!(value["capacity"], 50);
    }
}
