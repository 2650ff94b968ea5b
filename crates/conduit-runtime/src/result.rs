//! Pass and run reports.

use conduit_block::Outputs;
use serde::Serialize;

use crate::resolve::RunOutputs;

/// A node whose `run` failed during a pass.
#[derive(Debug, Clone, Serialize)]
pub struct NodeFailure {
  pub node_id: String,
  pub error: String,
}

/// Outcome of one downstream pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
  /// Unique id for correlating log lines.
  pub pass_id: String,
  /// Every output known at the end of the pass, keyed by node id.
  pub outputs: RunOutputs,
  /// Nodes that completed, in execution order. The firing node comes first.
  pub processed: Vec<String>,
  pub failures: Vec<NodeFailure>,
  /// True when the dequeue budget ran out before the queue drained.
  pub exhausted: bool,
}

impl PassReport {
  pub fn output(&self, node_id: &str) -> Option<&Outputs> {
    self.outputs.get(node_id)
  }

  pub fn was_processed(&self, node_id: &str) -> bool {
    self.processed.iter().any(|id| id == node_id)
  }
}

/// Outcome of running a single node and its dependencies.
#[derive(Debug, Clone, Serialize)]
pub struct NodeRunReport {
  /// Nodes run before and including the target, in execution order.
  pub order: Vec<String>,
  /// Outputs accumulated up to and including the target.
  pub outputs: RunOutputs,
  /// `None` when the target's block type is not registered.
  pub target_outputs: Option<Outputs>,
  /// The downstream pass rooted at the target, if one ran.
  pub downstream: Option<PassReport>,
}
