//! Mock blocks shared by the runtime integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use conduit_block::{
  Block, BlockError, BlockRegistry, Category, DisplayEffect, FireFn, InputField, InputMap,
  OutputName, Outputs, RunContext, Subscription, WALLET_ADDRESS_FIELD,
};
use conduit_model::{ConnectedModel, Edge, RawNode, build_connected_model};

/// Trigger that echoes its `value` input. Its subscription fires `{value:
/// "tick"}` every few milliseconds until cancelled.
pub struct Source;

#[async_trait]
impl Block for Source {
  fn block_type(&self) -> &str {
    "source"
  }

  fn category(&self) -> Category {
    Category::Trigger
  }

  fn inputs(&self) -> &[InputField] {
    static INPUTS: std::sync::LazyLock<Vec<InputField>> =
      std::sync::LazyLock::new(|| vec![InputField::string("value", "")]);
    &INPUTS
  }

  fn outputs(&self, _inputs: &InputMap) -> Vec<String> {
    vec!["value".to_string()]
  }

  async fn run(&self, inputs: InputMap, _ctx: RunContext) -> Result<Outputs, BlockError> {
    Ok(
      inputs
        .get("value")
        .map(|v| [("value", v.as_str())].into_iter().collect())
        .unwrap_or_default(),
    )
  }

  fn subscribes(&self) -> bool {
    true
  }

  fn subscribe(
    &self,
    _inputs: InputMap,
    on_fire: FireFn,
    _ctx: RunContext,
  ) -> Result<Subscription, BlockError> {
    Subscription::spawn(move |cancel| async move {
      let mut ticker = tokio::time::interval(Duration::from_millis(5));
      loop {
        tokio::select! {
          biased;
          _ = cancel.cancelled() => break,
          _ = ticker.tick() => on_fire([("value", "tick")].into_iter().collect()),
        }
      }
    })
  }
}

/// Trigger whose subscription always fails.
pub struct BrokenSource;

#[async_trait]
impl Block for BrokenSource {
  fn block_type(&self) -> &str {
    "broken_source"
  }

  fn category(&self) -> Category {
    Category::Trigger
  }

  fn inputs(&self) -> &[InputField] {
    &[]
  }

  fn outputs(&self, _inputs: &InputMap) -> Vec<String> {
    Vec::new()
  }

  async fn run(&self, _inputs: InputMap, _ctx: RunContext) -> Result<Outputs, BlockError> {
    Ok(Outputs::new())
  }

  fn subscribes(&self) -> bool {
    true
  }

  fn subscribe(
    &self,
    _inputs: InputMap,
    _on_fire: FireFn,
    _ctx: RunContext,
  ) -> Result<Subscription, BlockError> {
    Err(BlockError::upstream("feed unavailable"))
  }
}

#[derive(Clone, Copy)]
enum GateOutput {
  Passed,
  Value,
  OnTrue,
  OnFalse,
}

impl OutputName for GateOutput {
  fn as_str(&self) -> &'static str {
    match self {
      GateOutput::Passed => "passed",
      GateOutput::Value => "value",
      GateOutput::OnTrue => "on_true",
      GateOutput::OnFalse => "on_false",
    }
  }
}

/// Filter passing when `value > bottom`.
pub struct Gate;

#[async_trait]
impl Block for Gate {
  fn block_type(&self) -> &str {
    "gate"
  }

  fn category(&self) -> Category {
    Category::Filter
  }

  fn inputs(&self) -> &[InputField] {
    static INPUTS: std::sync::LazyLock<Vec<InputField>> = std::sync::LazyLock::new(|| {
      vec![
        InputField::number("value", "0"),
        InputField::number("bottom", "0"),
      ]
    });
    &INPUTS
  }

  fn outputs(&self, _inputs: &InputMap) -> Vec<String> {
    vec!["passed".into(), "value".into(), "on_true".into(), "on_false".into()]
  }

  async fn run(&self, inputs: InputMap, _ctx: RunContext) -> Result<Outputs, BlockError> {
    let value = parse(&inputs, "value")?;
    let bottom = parse(&inputs, "bottom")?;
    let raw = inputs.get("value").cloned().unwrap_or_default();

    let branch = if value > bottom {
      GateOutput::OnTrue
    } else {
      GateOutput::OnFalse
    };
    Ok(
      Outputs::new()
        .with(GateOutput::Passed, (value > bottom).to_string())
        .with(GateOutput::Value, raw.clone())
        .with(branch, raw),
    )
  }
}

fn parse(inputs: &InputMap, field: &str) -> Result<f64, BlockError> {
  let raw = inputs.get(field).map(String::as_str).unwrap_or_default();
  raw
    .parse()
    .map_err(|_| BlockError::invalid_input(field, format!("'{raw}' is not a number")))
}

/// Action that records every invocation and echoes its `input`.
#[derive(Clone, Default)]
pub struct Recorder {
  pub calls: Arc<Mutex<Vec<(String, InputMap)>>>,
}

impl Recorder {
  pub fn calls(&self) -> Vec<(String, InputMap)> {
    self.calls.lock().unwrap().clone()
  }

  pub fn nodes(&self) -> Vec<String> {
    self.calls().into_iter().map(|(node, _)| node).collect()
  }
}

#[async_trait]
impl Block for Recorder {
  fn block_type(&self) -> &str {
    "recorder"
  }

  fn category(&self) -> Category {
    Category::Action
  }

  fn inputs(&self) -> &[InputField] {
    static INPUTS: std::sync::LazyLock<Vec<InputField>> =
      std::sync::LazyLock::new(|| vec![InputField::string("input", "")]);
    &INPUTS
  }

  fn outputs(&self, _inputs: &InputMap) -> Vec<String> {
    vec!["received".to_string()]
  }

  async fn run(&self, inputs: InputMap, ctx: RunContext) -> Result<Outputs, BlockError> {
    let node = ctx.node_id.unwrap_or_default();
    let received = inputs.get("input").cloned().unwrap_or_default();
    self.calls.lock().unwrap().push((node.clone(), inputs));
    Ok([("received", received), ("node", node)].into_iter().collect())
  }
}

/// Action that always fails.
pub struct Failing;

#[async_trait]
impl Block for Failing {
  fn block_type(&self) -> &str {
    "failing"
  }

  fn category(&self) -> Category {
    Category::Action
  }

  fn inputs(&self) -> &[InputField] {
    &[]
  }

  fn outputs(&self, _inputs: &InputMap) -> Vec<String> {
    Vec::new()
  }

  async fn run(&self, _inputs: InputMap, _ctx: RunContext) -> Result<Outputs, BlockError> {
    Err(BlockError::failed("boom"))
  }
}

/// Action that fails on its first call and succeeds on every later one.
#[derive(Clone, Default)]
pub struct Flaky {
  pub calls: Arc<AtomicUsize>,
}

impl Flaky {
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Block for Flaky {
  fn block_type(&self) -> &str {
    "flaky"
  }

  fn category(&self) -> Category {
    Category::Action
  }

  fn inputs(&self) -> &[InputField] {
    &[]
  }

  fn outputs(&self, _inputs: &InputMap) -> Vec<String> {
    vec!["attempt".to_string()]
  }

  async fn run(&self, _inputs: InputMap, _ctx: RunContext) -> Result<Outputs, BlockError> {
    let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
    if attempt == 1 {
      return Err(BlockError::upstream("not ready yet"));
    }
    Ok([("attempt", attempt.to_string())].into_iter().collect())
  }
}

/// Display block showing its `value` input.
pub struct Show;

#[async_trait]
impl Block for Show {
  fn block_type(&self) -> &str {
    "show"
  }

  fn category(&self) -> Category {
    Category::Display
  }

  fn inputs(&self) -> &[InputField] {
    static INPUTS: std::sync::LazyLock<Vec<InputField>> =
      std::sync::LazyLock::new(|| vec![InputField::string("value", "")]);
    &INPUTS
  }

  fn outputs(&self, _inputs: &InputMap) -> Vec<String> {
    vec!["value".to_string()]
  }

  fn display_effects(&self, outputs: &Outputs) -> Vec<DisplayEffect> {
    outputs
      .get("value")
      .map(|v| vec![DisplayEffect::Value(v.to_string())])
      .unwrap_or_default()
  }

  async fn run(&self, inputs: InputMap, _ctx: RunContext) -> Result<Outputs, BlockError> {
    let value = inputs.get("value").cloned().unwrap_or_default();
    Ok([("value", value)].into_iter().collect())
  }
}

/// Action reporting the wallet address it was given.
pub struct WalletEcho;

#[async_trait]
impl Block for WalletEcho {
  fn block_type(&self) -> &str {
    "wallet_echo"
  }

  fn category(&self) -> Category {
    Category::Action
  }

  fn inputs(&self) -> &[InputField] {
    static INPUTS: std::sync::LazyLock<Vec<InputField>> =
      std::sync::LazyLock::new(|| vec![InputField::string(WALLET_ADDRESS_FIELD, "")]);
    &INPUTS
  }

  fn outputs(&self, _inputs: &InputMap) -> Vec<String> {
    vec!["wallet".to_string()]
  }

  fn injects_wallet(&self) -> bool {
    true
  }

  async fn run(&self, inputs: InputMap, _ctx: RunContext) -> Result<Outputs, BlockError> {
    let wallet = inputs
      .get(WALLET_ADDRESS_FIELD)
      .cloned()
      .unwrap_or_default();
    Ok([("wallet", wallet)].into_iter().collect())
  }
}

/// Registry with every mock block. The recorder is returned so tests can
/// inspect its calls.
pub fn registry() -> (Arc<BlockRegistry>, Recorder) {
  registry_with(|_| {})
}

/// Like [`registry`], with extra blocks registered by `extend`.
pub fn registry_with(extend: impl FnOnce(&mut BlockRegistry)) -> (Arc<BlockRegistry>, Recorder) {
  let recorder = Recorder::default();
  let mut registry = BlockRegistry::new();
  registry.register(Source);
  registry.register(BrokenSource);
  registry.register(Gate);
  registry.register(recorder.clone());
  registry.register(Failing);
  registry.register(Show);
  registry.register(WalletEcho);
  extend(&mut registry);
  (Arc::new(registry), recorder)
}

pub fn model(nodes: Vec<RawNode>, edges: Vec<Edge>) -> ConnectedModel {
  build_connected_model(nodes, edges).expect("model should build")
}

pub fn outputs(pairs: &[(&str, &str)]) -> Outputs {
  pairs.iter().copied().collect()
}
