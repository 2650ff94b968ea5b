//! Single-node runs.
//!
//! Used to test one node from the editor: everything the node transitively
//! depends on runs first, then the node itself, then a downstream pass rooted
//! at it.

use std::collections::HashSet;

use conduit_block::RunContext;
use conduit_model::ConnectedModel;
use tracing::{debug, info, instrument};

use crate::error::RuntimeError;
use crate::executor::Executor;
use crate::resolve::RunOutputs;
use crate::result::NodeRunReport;

impl Executor {
  /// Run `target_id` with its upstream dependencies, then continue
  /// downstream.
  ///
  /// Unlike a downstream pass, a failure here is returned to the caller.
  #[instrument(name = "node_run", skip(self, model, ctx), fields(target_id = %target_id))]
  pub async fn run_from_node(
    &self,
    model: &ConnectedModel,
    target_id: &str,
    ctx: &RunContext,
  ) -> Result<NodeRunReport, RuntimeError> {
    let target = model
      .node(target_id)
      .ok_or_else(|| RuntimeError::NodeNotFound {
        node_id: target_id.to_string(),
      })?;

    let mut outputs = RunOutputs::new();
    let mut order = Vec::new();

    for node_id in dependency_order(model, &model.upstream_closure(target_id)) {
      let Some(node) = model.node(node_id) else {
        continue;
      };
      let Some(block) = self.registry().get(&node.block_type) else {
        debug!(node_id = %node_id, block_type = %node.block_type, "unregistered block type skipped");
        continue;
      };

      let produced = self
        .invoke(node, block.as_ref(), &outputs, ctx)
        .await
        .map_err(|source| RuntimeError::NodeFailed {
          node_id: node_id.to_string(),
          source,
        })?;
      info!(node_id = %node_id, "upstream_completed");
      outputs.insert(node_id.to_string(), produced);
      order.push(node_id.to_string());
    }

    let Some(block) = self.registry().get(&target.block_type) else {
      debug!(
        node_id = %target_id,
        block_type = %target.block_type,
        "target block type not registered"
      );
      return Ok(NodeRunReport {
        order,
        outputs,
        target_outputs: None,
        downstream: None,
      });
    };

    let produced = self
      .invoke(target, block.as_ref(), &outputs, ctx)
      .await
      .map_err(|source| RuntimeError::NodeFailed {
        node_id: target_id.to_string(),
        source,
      })?;
    info!(node_id = %target_id, "target_completed");

    outputs.insert(target_id.to_string(), produced.clone());
    order.push(target_id.to_string());

    let downstream = self.run_pass(model, target_id, outputs.clone(), ctx).await;

    Ok(NodeRunReport {
      order,
      outputs,
      target_outputs: Some(produced),
      downstream: Some(downstream),
    })
  }
}

/// Order `subset` so producers come before consumers.
///
/// Each round takes, in model order, every remaining node with no producer
/// left in the remaining set. When a cycle leaves no such node, the first
/// remaining node is taken to make progress.
fn dependency_order<'a>(model: &'a ConnectedModel, subset: &HashSet<&str>) -> Vec<&'a str> {
  let mut remaining: Vec<&'a str> = model
    .nodes()
    .iter()
    .map(|node| node.id.as_str())
    .filter(|id| subset.contains(id))
    .collect();
  let mut order = Vec::with_capacity(remaining.len());

  while !remaining.is_empty() {
    let left: HashSet<&str> = remaining.iter().copied().collect();
    let mut round: Vec<&'a str> = remaining
      .iter()
      .copied()
      .filter(|id| {
        model
          .upstream(id)
          .iter()
          .all(|producer| !left.contains(producer))
      })
      .collect();

    if round.is_empty() {
      round.push(remaining[0]);
    }

    remaining.retain(|id| !round.contains(id));
    order.extend(round);
  }

  order
}
