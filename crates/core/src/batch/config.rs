//! Configuration for the batch coordinator.

use serde::{Deserialize, Serialize};

/// Configuration for the batch coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Upper bound on jobs running at once. 0 runs every job of a batch at once.
    #[serde(default)]
    pub max_concurrent_jobs: usize,

    /// Capacity of the event broadcast. Slow subscribers lose the oldest events.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_event_buffer() -> usize {
    256
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 0,
            event_buffer: default_event_buffer(),
        }
    }
}

impl CoordinatorConfig {
    /// Caps the number of jobs running at once.
    pub fn with_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    /// Concurrency limit, if any.
    pub fn concurrency_limit(&self) -> Option<usize> {
        (self.max_concurrent_jobs > 0).then_some(self.max_concurrent_jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unlimited() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.concurrency_limit(), None);
        assert_eq!(config.event_buffer, 256);
    }

    #[test]
    fn test_limit() {
        let config = CoordinatorConfig::default().with_max_concurrent_jobs(2);
        assert_eq!(config.concurrency_limit(), Some(2));
    }
}
