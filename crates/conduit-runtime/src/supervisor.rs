use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use conduit_block::RunContext;
use conduit_model::ConnectedModel;
use tracing::info;

use crate::executor::Executor;
use crate::subscription::{AgentSubscription, ModelSupplier, TriggerCallback};

/// Called with the agent id whenever an agent's subscriptions are torn down,
/// so per-agent state kept outside the engine can be released.
pub type AgentCleanup = Arc<dyn Fn(&str) + Send + Sync>;

/// Keeps at most one live [`AgentSubscription`] per agent.
///
/// Activating an agent that is already active tears the old subscriptions
/// down first, so a redeploy never leaves two sets of triggers firing.
pub struct AgentSupervisor {
  executor: Executor,
  agents: HashMap<String, AgentSubscription>,
  cleanups: Vec<AgentCleanup>,
}

impl AgentSupervisor {
  pub fn new(executor: Executor) -> Self {
    Self {
      executor,
      agents: HashMap::new(),
      cleanups: Vec::new(),
    }
  }

  /// Run `cleanup` after every deactivation and every replaced activation.
  pub fn with_cleanup(mut self, cleanup: AgentCleanup) -> Self {
    self.cleanups.push(cleanup);
    self
  }

  fn release(&self, agent_id: &str) {
    for cleanup in &self.cleanups {
      cleanup(agent_id);
    }
  }

  pub fn executor(&self) -> &Executor {
    &self.executor
  }

  /// (Re)subscribe `agent_id`. Returns the number of triggers attached.
  pub fn activate(
    &mut self,
    agent_id: &str,
    model: Arc<ConnectedModel>,
    ctx: RunContext,
    on_trigger: TriggerCallback,
    supplier: Option<ModelSupplier>,
  ) -> usize {
    if let Some(previous) = self.agents.remove(agent_id) {
      info!(agent_id = %agent_id, "replacing active subscriptions");
      previous.unsubscribe();
      self.release(agent_id);
    }

    let subscription = self
      .executor
      .subscribe_to_agent(agent_id, model, ctx, on_trigger, supplier);
    let attached = subscription.len();
    self.agents.insert(agent_id.to_string(), subscription);

    info!(agent_id = %agent_id, triggers = attached, "agent_activated");
    attached
  }

  /// Returns false when the agent was not active.
  pub fn deactivate(&mut self, agent_id: &str) -> bool {
    match self.agents.remove(agent_id) {
      Some(subscription) => {
        subscription.unsubscribe();
        self.release(agent_id);
        info!(agent_id = %agent_id, "agent_deactivated");
        true
      }
      None => false,
    }
  }

  /// Deactivate every agent and wait for their subscription loops to exit.
  pub async fn deactivate_all(&mut self) {
    let active: Vec<AgentSubscription> = self.agents.drain().map(|(_, sub)| sub).collect();
    let ids: Vec<String> = active.iter().map(|sub| sub.agent_id().to_string()).collect();
    futures::future::join_all(active.into_iter().map(AgentSubscription::shutdown)).await;
    for agent_id in &ids {
      self.release(agent_id);
    }
  }

  pub fn is_active(&self, agent_id: &str) -> bool {
    self.agents.contains_key(agent_id)
  }

  /// Active agent ids, sorted.
  pub fn active_agents(&self) -> Vec<&str> {
    let mut ids: Vec<&str> = self.agents.keys().map(String::as_str).collect();
    ids.sort_unstable();
    ids
  }
}

impl fmt::Debug for AgentSupervisor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AgentSupervisor")
      .field("executor", &self.executor)
      .field("agents", &self.active_agents())
      .field("cleanups", &self.cleanups.len())
      .finish()
  }
}
