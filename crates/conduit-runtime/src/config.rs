use serde::{Deserialize, Serialize};

/// Default multiple of the node count a single pass may dequeue.
pub const DEFAULT_ITERATION_FACTOR: usize = 2;

/// Configuration for the [`crate::Executor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
  /// A pass stops after `iteration_factor * node_count` dequeues.
  pub iteration_factor: usize,
}

impl Default for ExecutorConfig {
  fn default() -> Self {
    Self {
      iteration_factor: DEFAULT_ITERATION_FACTOR,
    }
  }
}

impl ExecutorConfig {
  /// Dequeue budget for a model of `node_count` nodes.
  pub fn iteration_cap(&self, node_count: usize) -> usize {
    self.iteration_factor.max(1).saturating_mul(node_count)
  }
}
