use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::RunContext;
use crate::error::BlockError;
use crate::outputs::{InputMap, Outputs};
use crate::subscription::{FireFn, Subscription};

/// The role a block plays in a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
  /// Attaches to an external event source and fires the graph.
  Trigger,
  /// Decides whether values continue downstream.
  Filter,
  /// Performs work (quotes, messages, transactions).
  Action,
  /// Pushes values to the host's display surfaces.
  Display,
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Category::Trigger => "trigger",
      Category::Filter => "filter",
      Category::Action => "action",
      Category::Display => "display",
    };
    f.write_str(name)
  }
}

/// Declared type of an input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
  String,
  Number,
  Boolean,
  /// Accepts the producer's entire output bag, serialized as a JSON object.
  Object,
}

/// One declared input of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputField {
  pub name: String,
  pub field_type: FieldType,
  #[serde(default)]
  pub default: String,
}

impl InputField {
  pub fn new(name: impl Into<String>, field_type: FieldType, default: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      field_type,
      default: default.into(),
    }
  }

  pub fn string(name: impl Into<String>, default: impl Into<String>) -> Self {
    Self::new(name, FieldType::String, default)
  }

  pub fn number(name: impl Into<String>, default: impl Into<String>) -> Self {
    Self::new(name, FieldType::Number, default)
  }

  pub fn boolean(name: impl Into<String>, default: bool) -> Self {
    Self::new(name, FieldType::Boolean, default.to_string())
  }

  pub fn object(name: impl Into<String>) -> Self {
    Self::new(name, FieldType::Object, "{}")
  }
}

/// A single time-series sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
  pub timestamp_ms: i64,
  pub value: f64,
}

/// A side effect a display block asks the host to render.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEffect {
  /// Replace the block's single displayed value.
  Value(String),
  /// Append a point to the block's time series.
  Point(SeriesPoint),
  /// Append a point to one series of a multi-series chart.
  SeriesPoint { series: usize, point: SeriesPoint },
}

/// The contract every block implements.
///
/// `run` may suspend on network I/O. Bounding how long it takes is the
/// block's own concern; the engine enforces no timeouts.
#[async_trait]
pub trait Block: Send + Sync {
  /// Unique registry key, e.g. `"threshold"`.
  fn block_type(&self) -> &str;

  fn category(&self) -> Category;

  /// Declared input fields, in display order.
  fn inputs(&self) -> &[InputField];

  /// Output names this block produces for the given inputs.
  fn outputs(&self, inputs: &InputMap) -> Vec<String>;

  /// Whether the executor should inject the host's verified wallet address
  /// into the reserved wallet field before running.
  fn injects_wallet(&self) -> bool {
    false
  }

  /// Side effects for display blocks, derived from a successful run.
  fn display_effects(&self, _outputs: &Outputs) -> Vec<DisplayEffect> {
    Vec::new()
  }

  async fn run(&self, inputs: InputMap, ctx: RunContext) -> Result<Outputs, BlockError>;

  /// Whether [`Block::subscribe`] is implemented.
  fn subscribes(&self) -> bool {
    false
  }

  /// Attach to the block's event source. `on_fire` is called once per event
  /// until the returned [`Subscription`] is cancelled or dropped.
  fn subscribe(
    &self,
    _inputs: InputMap,
    _on_fire: FireFn,
    _ctx: RunContext,
  ) -> Result<Subscription, BlockError> {
    Err(BlockError::NotSubscribable {
      block_type: self.block_type().to_string(),
    })
  }
}
