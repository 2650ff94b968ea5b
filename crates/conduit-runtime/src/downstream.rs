//! Downstream passes.
//!
//! A pass starts from a node that has already produced outputs (a firing
//! trigger, or the target of a single-node run) and walks forward. Every
//! direct consumer of the root is signalled. Past the root, nodes are
//! signalled only through edges that actually fired, and run one at a time in
//! the order they became ready.
//!
//! Each signalled node carries a requirement:
//! - by default it is ready as soon as any of its producers has been
//!   processed;
//! - a node with explicit input bindings is ready only once every bound
//!   producer has been processed.
//!
//! Signalled nodes that are not yet ready wait in a pending set and are
//! looked at again only when one of the producers they wait on completes.
//! A completed node is never signalled again, so a cycle cannot run a node
//! twice. A failed node is not processed: the next producer that completes
//! and fires towards it signals it again. A dequeue budget of
//! `iteration_factor * node_count` bounds those retries.

use std::collections::{HashMap, HashSet, VecDeque};

use conduit_block::{Outputs, RunContext};
use conduit_model::{ConnectedModel, ConnectedNode, OutputConnection};
use tracing::{debug, info, instrument, warn};

use crate::executor::Executor;
use crate::resolve::RunOutputs;
use crate::result::{NodeFailure, PassReport};

impl Executor {
  /// Propagate a firing of `trigger_id` through the graph.
  ///
  /// Never fails: block failures are logged and recorded in the report, and
  /// their subtrees are left unexplored while sibling branches continue.
  #[instrument(
    name = "downstream_pass",
    skip(self, model, outputs, ctx),
    fields(trigger_id = %trigger_id, agent_id = ctx.agent_id.as_deref().unwrap_or(""))
  )]
  pub async fn run_downstream(
    &self,
    model: &ConnectedModel,
    trigger_id: &str,
    outputs: Outputs,
    ctx: &RunContext,
  ) -> PassReport {
    let mut seeded = RunOutputs::new();
    seeded.insert(trigger_id.to_string(), outputs);
    self.run_pass(model, trigger_id, seeded, ctx).await
  }

  /// Run a pass rooted at `root`, whose outputs must already be in `outputs`.
  /// Only the root counts as processed when the pass starts.
  pub(crate) async fn run_pass(
    &self,
    model: &ConnectedModel,
    root: &str,
    outputs: RunOutputs,
    ctx: &RunContext,
  ) -> PassReport {
    let pass_id = uuid::Uuid::new_v4().to_string();
    let cap = self.config().iteration_cap(model.len());

    info!(
      pass_id = %pass_id,
      root = %root,
      node_count = model.len(),
      "pass_started"
    );

    let mut pass = Pass::new(root, outputs);
    let initial = model
      .node(root)
      .map(ConnectedNode::downstream_ids)
      .unwrap_or_default();
    for target in initial {
      pass.signal(model, target);
    }

    let mut dequeues = 0usize;
    while let Some(node_id) = pass.ready.pop_front() {
      if dequeues >= cap {
        pass.exhausted = true;
        warn!(
          pass_id = %pass_id,
          cap = cap,
          skipped = %node_id,
          remaining = pass.ready.len(),
          "pass iteration budget exhausted"
        );
        break;
      }
      dequeues += 1;

      let Some(node) = model.node(&node_id) else {
        continue;
      };
      let Some(block) = self.registry().get(&node.block_type) else {
        debug!(
          pass_id = %pass_id,
          node_id = %node_id,
          block_type = %node.block_type,
          "unregistered block type skipped"
        );
        continue;
      };

      match self
        .invoke(node, block.as_ref(), &pass.outputs, ctx)
        .await
      {
        Ok(produced) => {
          info!(
            pass_id = %pass_id,
            node_id = %node_id,
            outputs = %produced.to_json_string(),
            "node_completed"
          );

          let fired = fired_targets(model, node, &produced);
          pass.complete(model, &node_id, produced);
          for target in fired {
            pass.signal(model, target);
          }
        }
        Err(e) => {
          warn!(
            pass_id = %pass_id,
            node_id = %node_id,
            error = %e,
            "node_failed"
          );
          pass.fail(&node_id, e.to_string());
        }
      }
    }

    info!(
      pass_id = %pass_id,
      processed = pass.processed.len(),
      failures = pass.failures.len(),
      stalled = pass.pending.len(),
      "pass_completed"
    );

    PassReport {
      pass_id,
      outputs: pass.outputs,
      processed: pass.processed,
      failures: pass.failures,
      exhausted: pass.exhausted,
    }
  }
}

/// Mutable state of one pass.
struct Pass {
  outputs: RunOutputs,
  /// Completed nodes, in order.
  processed: Vec<String>,
  done: HashSet<String>,
  /// Nodes queued, pending or completed. Failed nodes leave this set so a
  /// later producer can signal them again.
  signalled: HashSet<String>,
  ready: VecDeque<String>,
  /// Signalled nodes still waiting on producers.
  pending: HashSet<String>,
  /// producer -> pending nodes to re-examine when it completes.
  waiters: HashMap<String, Vec<String>>,
  failures: Vec<NodeFailure>,
  exhausted: bool,
}

impl Pass {
  fn new(root: &str, outputs: RunOutputs) -> Self {
    Self {
      outputs,
      processed: vec![root.to_string()],
      done: HashSet::from([root.to_string()]),
      signalled: HashSet::from([root.to_string()]),
      ready: VecDeque::new(),
      pending: HashSet::new(),
      waiters: HashMap::new(),
      failures: Vec::new(),
      exhausted: false,
    }
  }

  fn signal(&mut self, model: &ConnectedModel, node_id: &str) {
    if !self.signalled.insert(node_id.to_string()) {
      return;
    }
    let Some(node) = model.node(node_id) else {
      return;
    };

    let missing = self.missing_producers(node);
    if missing.is_empty() {
      self.ready.push_back(node_id.to_string());
      return;
    }

    self.pending.insert(node_id.to_string());
    for producer in missing {
      self
        .waiters
        .entry(producer)
        .or_default()
        .push(node_id.to_string());
    }
  }

  fn complete(&mut self, model: &ConnectedModel, node_id: &str, produced: Outputs) {
    self.outputs.insert(node_id.to_string(), produced);
    self.processed.push(node_id.to_string());
    self.done.insert(node_id.to_string());

    let Some(waiting) = self.waiters.remove(node_id) else {
      return;
    };
    for waiter in waiting {
      if !self.pending.contains(&waiter) {
        continue;
      }
      let ready = model
        .node(&waiter)
        .is_some_and(|node| self.missing_producers(node).is_empty());
      if ready {
        self.pending.remove(&waiter);
        self.ready.push_back(waiter);
      }
    }
  }

  fn fail(&mut self, node_id: &str, error: String) {
    self.signalled.remove(node_id);
    self.failures.push(NodeFailure {
      node_id: node_id.to_string(),
      error,
    });
  }

  /// Producers `node` still waits on. Empty means ready.
  fn missing_producers(&self, node: &ConnectedNode) -> Vec<String> {
    let bound = node.bound_producers();
    if !bound.is_empty() {
      return bound
        .into_iter()
        .filter(|id| !self.done.contains(*id))
        .map(str::to_string)
        .collect();
    }

    let upstream = node.upstream_ids();
    if upstream.iter().any(|id| self.done.contains(*id)) {
      Vec::new()
    } else {
      upstream.into_iter().map(str::to_string).collect()
    }
  }
}

/// Distinct targets of `node`'s outgoing edges that fired for `produced`.
fn fired_targets<'a>(
  model: &ConnectedModel,
  node: &'a ConnectedNode,
  produced: &Outputs,
) -> Vec<&'a str> {
  let mut targets: Vec<&'a str> = Vec::new();
  for conn in &node.outputs {
    if edge_fires(model, conn, produced) && !targets.contains(&conn.target_node_id.as_str()) {
      targets.push(&conn.target_node_id);
    }
  }
  targets
}

/// A named source handle fires when that output is present and non-empty.
/// A control edge fires whenever the result has any key at all.
fn edge_fires(model: &ConnectedModel, conn: &OutputConnection, produced: &Outputs) -> bool {
  let Some(edge) = model.edge(&conn.edge_id) else {
    return !produced.is_empty();
  };
  match edge.source_handle.as_deref() {
    Some(name) if !edge.is_control() => produced.has_value(name),
    _ => !produced.is_empty(),
  }
}
