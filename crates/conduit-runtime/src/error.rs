//! Error types for the single-node runner.

use conduit_block::BlockError;
use thiserror::Error;

/// Errors surfaced to callers of [`crate::Executor::run_from_node`].
///
/// Downstream passes never return these; failures inside a pass are logged
/// and recorded in the pass report instead.
#[derive(Debug, Error)]
pub enum RuntimeError {
  /// The requested node is not part of the model.
  #[error("node '{node_id}' not found in model")]
  NodeNotFound { node_id: String },

  /// A block's `run` failed.
  #[error("node '{node_id}' failed: {source}")]
  NodeFailed {
    node_id: String,
    #[source]
    source: BlockError,
  },
}
