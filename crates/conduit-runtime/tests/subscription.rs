//! Trigger subscriptions and the agent supervisor.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{model, registry};
use conduit_block::RunContext;
use conduit_model::{Edge, NodeData, RawNode};
use conduit_runtime::{
  AgentCleanup, AgentSupervisor, Executor, ModelSupplier, TriggerCallback, TriggerPayload,
};

fn ticking_model(action: &str) -> conduit_model::ConnectedModel {
  model(
    vec![
      RawNode::new("t", "source", NodeData::new()),
      RawNode::new(
        action,
        "recorder",
        NodeData::new().with_field("input", "{{t.value}}"),
      ),
    ],
    vec![Edge::new("e1", "t", action).with_handles("value", "input")],
  )
}

fn collect() -> (TriggerCallback, Arc<Mutex<Vec<TriggerPayload>>>) {
  let payloads = Arc::new(Mutex::new(Vec::new()));
  let sink = payloads.clone();
  let callback: TriggerCallback = Arc::new(move |payload| sink.lock().unwrap().push(payload));
  (callback, payloads)
}

#[tokio::test]
async fn test_firings_reach_host_and_run_passes() {
  let (registry, recorder) = registry();
  let executor = Executor::new(registry);
  let (callback, payloads) = collect();

  let subscription = executor.subscribe_to_agent(
    "agent-1",
    Arc::new(ticking_model("act")),
    RunContext::new(),
    callback,
    None,
  );
  assert_eq!(subscription.node_ids(), vec!["t"]);

  tokio::time::sleep(Duration::from_millis(40)).await;
  subscription.unsubscribe();

  let payloads = payloads.lock().unwrap().clone();
  assert!(!payloads.is_empty());
  assert_eq!(payloads[0].agent_id, "agent-1");
  assert_eq!(payloads[0].node_id, "t");
  assert_eq!(payloads[0].outputs.get("value"), Some("tick"));

  let calls = recorder.calls();
  assert!(!calls.is_empty());
  assert!(calls.iter().all(|(node, inputs)| node == "act" && inputs["input"] == "tick"));
}

#[tokio::test]
async fn test_unsubscribe_stops_future_firings() {
  let (registry, _) = registry();
  let executor = Executor::new(registry);
  let (callback, payloads) = collect();

  let subscription = executor.subscribe_to_agent(
    "agent-1",
    Arc::new(ticking_model("act")),
    RunContext::new(),
    callback,
    None,
  );
  tokio::time::sleep(Duration::from_millis(20)).await;
  subscription.shutdown().await;

  let seen = payloads.lock().unwrap().len();
  tokio::time::sleep(Duration::from_millis(30)).await;
  assert_eq!(payloads.lock().unwrap().len(), seen);
}

#[tokio::test]
async fn test_failed_subscribe_skips_only_that_trigger() {
  let (registry, _) = registry();
  let executor = Executor::new(registry);
  let (callback, _) = collect();
  let model = model(
    vec![
      RawNode::new("broken", "broken_source", NodeData::new()),
      RawNode::new("t", "source", NodeData::new()),
      RawNode::new("a", "recorder", NodeData::new()),
    ],
    vec![],
  );

  let subscription =
    executor.subscribe_to_agent("agent-1", Arc::new(model), RunContext::new(), callback, None);

  assert_eq!(subscription.len(), 1);
  assert_eq!(subscription.node_ids(), vec!["t"]);
}

#[tokio::test]
async fn test_model_supplier_swaps_model_per_firing() {
  let (registry, recorder) = registry();
  let executor = Executor::new(registry);
  let (callback, _) = collect();

  let edited = Arc::new(ticking_model("edited"));
  let supplier: ModelSupplier = Arc::new(move || edited.clone());

  let subscription = executor.subscribe_to_agent(
    "agent-1",
    Arc::new(ticking_model("original")),
    RunContext::new(),
    callback,
    Some(supplier),
  );
  tokio::time::sleep(Duration::from_millis(30)).await;
  subscription.shutdown().await;

  let nodes = recorder.nodes();
  assert!(!nodes.is_empty());
  assert!(nodes.iter().all(|node| node == "edited"));
}

#[tokio::test]
async fn test_supervisor_keeps_one_registration_per_agent() {
  let (registry, _) = registry();
  let mut supervisor = AgentSupervisor::new(Executor::new(registry));
  let (callback, payloads) = collect();
  let model = Arc::new(ticking_model("act"));

  supervisor.activate("a1", model.clone(), RunContext::new(), callback.clone(), None);
  supervisor.activate("a1", model.clone(), RunContext::new(), callback.clone(), None);
  supervisor.activate("a2", model, RunContext::new(), callback, None);
  assert_eq!(supervisor.active_agents(), vec!["a1", "a2"]);

  assert!(supervisor.deactivate("a2"));
  assert!(!supervisor.deactivate("a2"));
  assert_eq!(supervisor.active_agents(), vec!["a1"]);

  tokio::time::sleep(Duration::from_millis(30)).await;
  supervisor.deactivate_all().await;
  assert!(supervisor.active_agents().is_empty());

  let seen = payloads.lock().unwrap().len();
  assert!(seen > 0);
  tokio::time::sleep(Duration::from_millis(30)).await;
  assert_eq!(payloads.lock().unwrap().len(), seen);
}

#[test]
fn test_subscribe_outside_runtime_attaches_nothing() {
  let (registry, _) = registry();
  let executor = Executor::new(registry);
  let (callback, payloads) = collect();

  let subscription = executor.subscribe_to_agent(
    "a1",
    Arc::new(ticking_model("act")),
    RunContext::new(),
    callback,
    None,
  );

  assert!(subscription.is_empty());
  assert!(payloads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_supervisor_releases_agent_state_on_teardown() {
  let (registry, _) = registry();
  let released = Arc::new(Mutex::new(Vec::<String>::new()));
  let seen = released.clone();
  let cleanup: AgentCleanup = Arc::new(move |agent_id: &str| {
    seen.lock().unwrap().push(agent_id.to_string());
  });
  let mut supervisor = AgentSupervisor::new(Executor::new(registry)).with_cleanup(cleanup);
  let (callback, _) = collect();
  let model = Arc::new(ticking_model("act"));

  supervisor.activate("a1", model.clone(), RunContext::new(), callback.clone(), None);
  supervisor.activate("a2", model.clone(), RunContext::new(), callback.clone(), None);
  assert!(released.lock().unwrap().is_empty());

  supervisor.activate("a1", model, RunContext::new(), callback, None);
  assert!(supervisor.deactivate("a2"));
  assert!(!supervisor.deactivate("missing"));
  assert_eq!(*released.lock().unwrap(), vec!["a1", "a2"]);

  supervisor.deactivate_all().await;
  assert_eq!(*released.lock().unwrap(), vec!["a1", "a2", "a1"]);
}
