use std::time::Duration;

use async_trait::async_trait;
use conduit_block::{
  Block, BlockError, Category, FireFn, InputField, InputMap, OutputName, Outputs, RunContext,
  Subscription,
};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::input::{now_ms, positive};

#[derive(Debug, Clone, Copy)]
enum IntervalOutput {
  Tick,
  Timestamp,
}

impl OutputName for IntervalOutput {
  fn as_str(&self) -> &'static str {
    match self {
      IntervalOutput::Tick => "tick",
      IntervalOutput::Timestamp => "timestamp",
    }
  }
}

fn tick(count: u64) -> Outputs {
  Outputs::new()
    .with(IntervalOutput::Tick, count.to_string())
    .with(IntervalOutput::Timestamp, now_ms().to_string())
}

/// Fires every `interval_ms` milliseconds, starting one period after
/// subscribing.
pub struct IntervalTrigger {
  inputs: Vec<InputField>,
}

impl IntervalTrigger {
  pub const TYPE: &'static str = "interval";

  pub fn new() -> Self {
    Self {
      inputs: vec![InputField::number("interval_ms", "1000")],
    }
  }
}

impl Default for IntervalTrigger {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Block for IntervalTrigger {
  fn block_type(&self) -> &str {
    Self::TYPE
  }

  fn category(&self) -> Category {
    Category::Trigger
  }

  fn inputs(&self) -> &[InputField] {
    &self.inputs
  }

  fn outputs(&self, _inputs: &InputMap) -> Vec<String> {
    [IntervalOutput::Tick, IntervalOutput::Timestamp]
      .iter()
      .map(|o| o.as_str().to_string())
      .collect()
  }

  async fn run(&self, _inputs: InputMap, _ctx: RunContext) -> Result<Outputs, BlockError> {
    Ok(tick(1))
  }

  fn subscribes(&self) -> bool {
    true
  }

  fn subscribe(
    &self,
    inputs: InputMap,
    on_fire: FireFn,
    ctx: RunContext,
  ) -> Result<Subscription, BlockError> {
    let period = Duration::from_millis(positive(&inputs, "interval_ms")? as u64);
    if period.is_zero() {
      return Err(BlockError::invalid_input("interval_ms", "must be at least 1ms"));
    }

    Subscription::spawn(move |cancel| async move {
      let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      let mut count = 0u64;
      loop {
        tokio::select! {
          biased;
          _ = cancel.cancelled() => break,
          _ = ticker.tick() => {
            count += 1;
            on_fire(tick(count));
          }
        }
      }
      debug!(node_id = ?ctx.node_id, ticks = count, "interval stopped");
    })
  }
}
