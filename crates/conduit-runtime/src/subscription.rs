//! Trigger subscriptions for an active agent.

use std::fmt;
use std::sync::Arc;

use conduit_block::{Category, FireFn, Outputs, RunContext, Subscription};
use conduit_model::ConnectedModel;
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{error, info, instrument, warn};

use crate::executor::Executor;
use crate::resolve::literal_inputs;

/// Handed to the host on every trigger firing, before the downstream pass
/// starts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerPayload {
  pub agent_id: String,
  pub node_id: String,
  pub outputs: Outputs,
}

/// Host callback receiving every [`TriggerPayload`].
pub type TriggerCallback = Arc<dyn Fn(TriggerPayload) + Send + Sync>;

/// Supplies the model to run for each firing, so edits take effect without
/// re-subscribing.
pub type ModelSupplier = Arc<dyn Fn() -> Arc<ConnectedModel> + Send + Sync>;

/// Every live trigger subscription of one agent.
///
/// Unsubscribing (or dropping) cancels them all. Passes already running
/// finish on their own.
pub struct AgentSubscription {
  agent_id: String,
  subscriptions: Vec<(String, Subscription)>,
}

impl AgentSubscription {
  pub fn agent_id(&self) -> &str {
    &self.agent_id
  }

  /// Trigger nodes with a live subscription.
  pub fn node_ids(&self) -> Vec<&str> {
    self
      .subscriptions
      .iter()
      .map(|(node_id, _)| node_id.as_str())
      .collect()
  }

  pub fn len(&self) -> usize {
    self.subscriptions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.subscriptions.is_empty()
  }

  pub fn unsubscribe(self) {
    for (_, subscription) in &self.subscriptions {
      subscription.cancel();
    }
    info!(agent_id = %self.agent_id, "agent_unsubscribed");
  }

  /// Cancel every subscription and wait for their loops to exit.
  pub async fn shutdown(self) {
    let agent_id = self.agent_id;
    futures::future::join_all(
      self
        .subscriptions
        .into_iter()
        .map(|(_, subscription)| subscription.shutdown()),
    )
    .await;
    info!(agent_id = %agent_id, "agent_unsubscribed");
  }
}

impl fmt::Debug for AgentSubscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AgentSubscription")
      .field("agent_id", &self.agent_id)
      .field("nodes", &self.node_ids())
      .finish()
  }
}

/// Everything one trigger's fire handler needs.
struct FireTarget {
  agent_id: String,
  node_id: String,
  model: Arc<ConnectedModel>,
  ctx: RunContext,
  on_trigger: TriggerCallback,
  supplier: Option<ModelSupplier>,
  runtime: Option<Handle>,
}

impl Executor {
  /// Subscribe every trigger node of `model` on behalf of `agent_id`.
  ///
  /// A trigger whose `subscribe` fails is logged and left out; the others
  /// still attach. Outside a tokio runtime no trigger can attach. Each firing
  /// calls `on_trigger` synchronously, then spawns a downstream pass on the
  /// tokio runtime that was current here.
  #[instrument(
    name = "agent_subscribe",
    skip(self, model, ctx, on_trigger, supplier),
    fields(agent_id = %agent_id)
  )]
  pub fn subscribe_to_agent(
    &self,
    agent_id: &str,
    model: Arc<ConnectedModel>,
    ctx: RunContext,
    on_trigger: TriggerCallback,
    supplier: Option<ModelSupplier>,
  ) -> AgentSubscription {
    let runtime = Handle::try_current().ok();
    if runtime.is_none() {
      warn!(agent_id = %agent_id, "no tokio runtime; spawned triggers cannot attach");
    }

    let ctx = ctx.with_agent(agent_id);
    let mut subscriptions = Vec::new();

    for node in model.nodes() {
      let Some(block) = self.registry().get(&node.block_type) else {
        continue;
      };
      if block.category() != Category::Trigger || !block.subscribes() {
        continue;
      }

      let on_fire = self.fire_handler(FireTarget {
        agent_id: agent_id.to_string(),
        node_id: node.id.clone(),
        model: model.clone(),
        ctx: ctx.clone(),
        on_trigger: on_trigger.clone(),
        supplier: supplier.clone(),
        runtime: runtime.clone(),
      });
      let inputs = literal_inputs(node, block.as_ref());

      match block.subscribe(inputs, on_fire, ctx.clone().with_node(node.id.clone())) {
        Ok(subscription) => {
          info!(agent_id = %agent_id, node_id = %node.id, block_type = %node.block_type, "trigger_subscribed");
          subscriptions.push((node.id.clone(), subscription));
        }
        Err(e) => {
          error!(agent_id = %agent_id, node_id = %node.id, error = %e, "trigger_subscribe_failed");
        }
      }
    }

    AgentSubscription {
      agent_id: agent_id.to_string(),
      subscriptions,
    }
  }

  fn fire_handler(&self, target: FireTarget) -> FireFn {
    let executor = self.clone();
    let FireTarget {
      agent_id,
      node_id,
      model,
      ctx,
      on_trigger,
      supplier,
      runtime,
    } = target;

    Arc::new(move |outputs: Outputs| {
      on_trigger(TriggerPayload {
        agent_id: agent_id.clone(),
        node_id: node_id.clone(),
        outputs: outputs.clone(),
      });

      let Some(runtime) = runtime.as_ref() else {
        return;
      };
      let model = supplier
        .as_ref()
        .map(|supply| supply())
        .unwrap_or_else(|| model.clone());
      let executor = executor.clone();
      let ctx = ctx.clone();
      let agent_id = agent_id.clone();
      let node_id = node_id.clone();

      runtime.spawn(async move {
        let report = executor
          .run_downstream(&model, &node_id, outputs, &ctx)
          .await;
        if !report.failures.is_empty() {
          warn!(
            agent_id = %agent_id,
            node_id = %node_id,
            pass_id = %report.pass_id,
            failures = report.failures.len(),
            "pass finished with failures"
          );
        }
      });
    })
  }
}
