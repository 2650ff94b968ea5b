//! Single-node runner behavior against mock blocks.

mod common;

use common::{model, registry};
use conduit_block::{BlockError, RunContext};
use conduit_model::{Edge, NodeData, RawNode};
use conduit_runtime::{Executor, RuntimeError};

fn recorder(id: &str, input: &str) -> RawNode {
  RawNode::new(id, "recorder", NodeData::new().with_field("input", input))
}

#[tokio::test]
async fn test_runs_dependencies_in_order() {
  let (registry, recorder_block) = registry();
  let executor = Executor::new(registry);
  let model = model(
    vec![
      recorder("x", "{{z.received}}"),
      recorder("z", "{{y.received}}"),
      recorder("y", "seed"),
    ],
    vec![Edge::new("e1", "y", "z"), Edge::new("e2", "z", "x")],
  );

  let report = executor
    .run_from_node(&model, "x", &RunContext::new())
    .await
    .unwrap();

  assert_eq!(report.order, vec!["y", "z", "x"]);
  assert_eq!(recorder_block.nodes(), vec!["y", "z", "x"]);
  assert_eq!(
    report.target_outputs.unwrap().get("received"),
    Some("seed")
  );
}

#[tokio::test]
async fn test_unknown_target_is_not_found() {
  let (registry, _) = registry();
  let executor = Executor::new(registry);
  let model = model(vec![recorder("a", "x")], vec![]);

  let err = executor
    .run_from_node(&model, "missing", &RunContext::new())
    .await
    .unwrap_err();

  assert!(matches!(err, RuntimeError::NodeNotFound { node_id } if node_id == "missing"));
}

#[tokio::test]
async fn test_upstream_failure_propagates() {
  let (registry, recorder_block) = registry();
  let executor = Executor::new(registry);
  let model = model(
    vec![
      RawNode::new("bad", "failing", NodeData::new()),
      recorder("target", "x"),
    ],
    vec![Edge::new("e1", "bad", "target")],
  );

  let err = executor
    .run_from_node(&model, "target", &RunContext::new())
    .await
    .unwrap_err();

  match err {
    RuntimeError::NodeFailed { node_id, source } => {
      assert_eq!(node_id, "bad");
      assert!(matches!(source, BlockError::Failed(_)));
    }
    other => panic!("unexpected error: {other}"),
  }
  assert!(recorder_block.calls().is_empty());
}

#[tokio::test]
async fn test_unregistered_target_yields_nothing() {
  let (registry, recorder_block) = registry();
  let executor = Executor::new(registry);
  let model = model(
    vec![
      recorder("up", "x"),
      RawNode::new("target", "mystery", NodeData::new()),
      recorder("down", "y"),
    ],
    vec![Edge::new("e1", "up", "target"), Edge::new("e2", "target", "down")],
  );

  let report = executor
    .run_from_node(&model, "target", &RunContext::new())
    .await
    .unwrap();

  assert!(report.target_outputs.is_none());
  assert!(report.downstream.is_none());
  assert_eq!(recorder_block.nodes(), vec!["up"]);
}

#[tokio::test]
async fn test_continues_downstream_with_upstream_outputs() {
  let (registry, _) = registry();
  let executor = Executor::new(registry);
  let model = model(
    vec![
      recorder("y", "seed"),
      recorder("x", "mid"),
      recorder("after", "{{y.received}}"),
    ],
    vec![Edge::new("e1", "y", "x"), Edge::new("e2", "x", "after")],
  );

  let report = executor
    .run_from_node(&model, "x", &RunContext::new())
    .await
    .unwrap();

  let downstream = report.downstream.unwrap();
  assert_eq!(downstream.processed, vec!["x", "after"]);
  assert_eq!(
    downstream.output("after").unwrap().get("received"),
    Some("seed")
  );
}

#[tokio::test]
async fn test_continuation_signals_every_consumer_of_target() {
  let (registry, recorder_block) = registry();
  let executor = Executor::new(registry);
  let model = model(
    vec![
      RawNode::new(
        "gate",
        "gate",
        NodeData::new().with_field("value", "3").with_field("bottom", "5"),
      ),
      recorder("after", "ran"),
    ],
    vec![Edge::new("e1", "gate", "after").with_handles("on_true", "exec")],
  );

  let report = executor
    .run_from_node(&model, "gate", &RunContext::new())
    .await
    .unwrap();

  assert_eq!(
    report.target_outputs.unwrap().get("passed"),
    Some("false")
  );
  assert_eq!(report.downstream.unwrap().processed, vec!["gate", "after"]);
  assert_eq!(recorder_block.nodes(), vec!["after"]);
}
