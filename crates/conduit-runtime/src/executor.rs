//! The executor shared by downstream passes, single-node runs, and trigger
//! subscriptions.

use std::fmt;
use std::sync::Arc;

use conduit_block::{
  Block, BlockError, BlockRegistry, Category, InputMap, Outputs, RunContext, WALLET_ADDRESS_FIELD,
};
use conduit_model::ConnectedNode;
use tracing::debug;

use crate::config::ExecutorConfig;
use crate::resolve::{RunOutputs, resolve_inputs};
use crate::sink::{DisplaySink, NoopSink};

/// Runs blocks against a connected model.
///
/// Cheap to clone: the registry and sink are shared. The registry is never
/// mutated after it has been handed over.
#[derive(Clone)]
pub struct Executor {
  registry: Arc<BlockRegistry>,
  config: ExecutorConfig,
  sink: Arc<dyn DisplaySink>,
}

impl Executor {
  /// Create an executor with the default configuration and a sink that
  /// discards display effects.
  pub fn new(registry: Arc<BlockRegistry>) -> Self {
    Self {
      registry,
      config: ExecutorConfig::default(),
      sink: Arc::new(NoopSink),
    }
  }

  pub fn with_config(mut self, config: ExecutorConfig) -> Self {
    self.config = config;
    self
  }

  pub fn with_sink(mut self, sink: Arc<dyn DisplaySink>) -> Self {
    self.sink = sink;
    self
  }

  pub fn registry(&self) -> &BlockRegistry {
    &self.registry
  }

  pub fn config(&self) -> ExecutorConfig {
    self.config
  }

  /// Resolve inputs for `node`, injecting the host wallet where the block
  /// asks for it.
  pub(crate) fn prepare_inputs(
    &self,
    node: &ConnectedNode,
    block: &dyn Block,
    outputs: &RunOutputs,
    ctx: &RunContext,
  ) -> InputMap {
    let mut inputs = resolve_inputs(node, block, outputs);
    if block.injects_wallet() {
      match ctx.verified_wallet() {
        Some(address) => {
          inputs.insert(WALLET_ADDRESS_FIELD.to_string(), address.to_string());
        }
        None => {
          debug!(node_id = %node.id, "no verified wallet to inject");
        }
      }
    }
    inputs
  }

  /// Run one node and, for display blocks, forward its effects to the sink.
  pub(crate) async fn invoke(
    &self,
    node: &ConnectedNode,
    block: &dyn Block,
    outputs: &RunOutputs,
    ctx: &RunContext,
  ) -> Result<Outputs, BlockError> {
    let inputs = self.prepare_inputs(node, block, outputs, ctx);
    let produced = block
      .run(inputs, ctx.clone().with_node(node.id.clone()))
      .await?;

    if block.category() == Category::Display {
      for effect in block.display_effects(&produced) {
        self.sink.apply(&node.id, effect);
      }
    }

    Ok(produced)
  }
}

impl fmt::Debug for Executor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Executor")
      .field("registry", &self.registry)
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}
