//! Rolling-volume trigger.
//!
//! Polls a host [`VolumeSource`] and accumulates samples in a window that
//! belongs to one (agent, node) pair. Windows live in a shared
//! [`RollingWindows`] store so a manual `run` and the live subscription of the
//! same node see the same samples, while other agents never interfere.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use conduit_block::{
  Block, BlockError, Category, FireFn, InputField, InputMap, OutputName, Outputs, RunContext,
  Subscription,
};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::input::{now_ms, positive, text};

/// Host-supplied volume feed.
#[async_trait]
pub trait VolumeSource: Send + Sync {
  /// Volume traded for `symbol` since the previous poll.
  async fn poll(&self, symbol: &str) -> Result<f64, BlockError>;
}

/// Totals of one window after eviction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSummary {
  pub total: f64,
  pub samples: usize,
}

type WindowKey = (String, String);

/// Per-(agent, node) rolling windows of `(timestamp_ms, volume)` samples.
#[derive(Clone, Default)]
pub struct RollingWindows {
  windows: Arc<Mutex<HashMap<WindowKey, VecDeque<(i64, f64)>>>>,
}

impl RollingWindows {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<WindowKey, VecDeque<(i64, f64)>>> {
    self.windows.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Add a sample, drop samples older than `window_ms`, and summarize.
  pub fn record(
    &self,
    agent_id: &str,
    node_id: &str,
    at_ms: i64,
    volume: f64,
    window_ms: i64,
  ) -> WindowSummary {
    let mut windows = self.lock();
    let window = windows
      .entry((agent_id.to_string(), node_id.to_string()))
      .or_default();
    window.push_back((at_ms, volume));
    summarize(window, at_ms, window_ms)
  }

  /// Summary as of `now_ms` without adding a sample.
  pub fn summary(&self, agent_id: &str, node_id: &str, now_ms: i64, window_ms: i64) -> WindowSummary {
    let mut windows = self.lock();
    match windows.get_mut(&(agent_id.to_string(), node_id.to_string())) {
      Some(window) => summarize(window, now_ms, window_ms),
      None => WindowSummary {
        total: 0.0,
        samples: 0,
      },
    }
  }

  /// Forget every sample of one window.
  pub fn reset(&self, agent_id: &str, node_id: &str) {
    self
      .lock()
      .remove(&(agent_id.to_string(), node_id.to_string()));
  }

  /// Forget every window belonging to `agent_id`.
  pub fn clear_agent(&self, agent_id: &str) {
    self.lock().retain(|(agent, _), _| agent != agent_id);
  }

  /// A hook that forgets an agent's windows, for hosts to run when the
  /// agent is deactivated or redeployed.
  pub fn agent_cleanup(&self) -> Arc<dyn Fn(&str) + Send + Sync> {
    let windows = self.clone();
    Arc::new(move |agent_id: &str| windows.clear_agent(agent_id))
  }

  /// Number of live windows.
  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

fn summarize(window: &mut VecDeque<(i64, f64)>, now_ms: i64, window_ms: i64) -> WindowSummary {
  let cutoff = now_ms.saturating_sub(window_ms);
  while window.front().is_some_and(|&(at, _)| at <= cutoff) {
    window.pop_front();
  }
  WindowSummary {
    total: window.iter().map(|&(_, volume)| volume).sum(),
    samples: window.len(),
  }
}

#[derive(Debug, Clone, Copy)]
enum VolumeOutput {
  Symbol,
  Volume,
  Samples,
}

impl OutputName for VolumeOutput {
  fn as_str(&self) -> &'static str {
    match self {
      VolumeOutput::Symbol => "symbol",
      VolumeOutput::Volume => "volume",
      VolumeOutput::Samples => "samples",
    }
  }
}

fn report(symbol: &str, summary: WindowSummary) -> Outputs {
  Outputs::new()
    .with(VolumeOutput::Symbol, symbol)
    .with(VolumeOutput::Volume, summary.total.to_string())
    .with(VolumeOutput::Samples, summary.samples.to_string())
}

/// Settings shared by `run` and `subscribe`.
struct WindowSettings {
  symbol: String,
  interval: Duration,
  window_ms: i64,
  threshold: f64,
}

impl WindowSettings {
  fn parse(inputs: &InputMap) -> Result<Self, BlockError> {
    let symbol = text(inputs, "symbol").trim().to_string();
    if symbol.is_empty() {
      return Err(BlockError::invalid_input("symbol", "symbol is required"));
    }
    let interval = Duration::from_millis(positive(inputs, "interval_ms")? as u64);
    if interval.is_zero() {
      return Err(BlockError::invalid_input("interval_ms", "must be at least 1ms"));
    }
    Ok(Self {
      symbol,
      interval,
      window_ms: positive(inputs, "window_ms")? as i64,
      threshold: positive(inputs, "threshold")?,
    })
  }
}

fn window_key(ctx: &RunContext) -> (String, String) {
  (
    ctx.agent_id.clone().unwrap_or_default(),
    ctx.node_id.clone().unwrap_or_default(),
  )
}

/// Fires when the volume traded for `symbol` within the last `window_ms`
/// reaches `threshold`. The window starts over after each firing.
pub struct VolumeWindowTrigger {
  source: Arc<dyn VolumeSource>,
  windows: RollingWindows,
  inputs: Vec<InputField>,
}

impl VolumeWindowTrigger {
  pub const TYPE: &'static str = "volume_window";

  pub fn new(source: Arc<dyn VolumeSource>, windows: RollingWindows) -> Self {
    Self {
      source,
      windows,
      inputs: vec![
        InputField::string("symbol", ""),
        InputField::number("interval_ms", "5000"),
        InputField::number("window_ms", "60000"),
        InputField::number("threshold", "1"),
      ],
    }
  }
}

#[async_trait]
impl Block for VolumeWindowTrigger {
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
    [VolumeOutput::Symbol, VolumeOutput::Volume, VolumeOutput::Samples]
      .iter()
      .map(|o| o.as_str().to_string())
      .collect()
  }

  /// Poll once and report the window, whether or not it crossed the
  /// threshold.
  async fn run(&self, inputs: InputMap, ctx: RunContext) -> Result<Outputs, BlockError> {
    let settings = WindowSettings::parse(&inputs)?;
    let volume = self.source.poll(&settings.symbol).await?;
    let (agent_id, node_id) = window_key(&ctx);
    let summary = self
      .windows
      .record(&agent_id, &node_id, now_ms(), volume, settings.window_ms);
    Ok(report(&settings.symbol, summary))
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
    let settings = WindowSettings::parse(&inputs)?;
    let source = self.source.clone();
    let windows = self.windows.clone();
    let (agent_id, node_id) = window_key(&ctx);

    Subscription::spawn(move |cancel| async move {
      let mut ticker = tokio::time::interval_at(Instant::now() + settings.interval, settings.interval);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

      loop {
        tokio::select! {
          biased;
          _ = cancel.cancelled() => break,
          _ = ticker.tick() => {}
        }

        let volume = match source.poll(&settings.symbol).await {
          Ok(volume) => volume,
          Err(e) => {
            warn!(agent_id = %agent_id, node_id = %node_id, error = %e, "volume poll failed");
            continue;
          }
        };
        if cancel.is_cancelled() {
          break;
        }

        let summary = windows.record(&agent_id, &node_id, now_ms(), volume, settings.window_ms);
        if summary.total >= settings.threshold {
          debug!(agent_id = %agent_id, node_id = %node_id, total = summary.total, "volume threshold reached");
          windows.reset(&agent_id, &node_id);
          on_fire(report(&settings.symbol, summary));
        }
      }
    })
  }
}
