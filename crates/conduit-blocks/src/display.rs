//! Display blocks.
//!
//! These only describe what to show; the executor forwards their
//! [`DisplayEffect`]s to the host's display sink.

use async_trait::async_trait;
use conduit_block::{
  Block, BlockError, Category, DisplayEffect, InputField, InputMap, OutputName, Outputs,
  RunContext, SeriesPoint,
};

use crate::input::{now_ms, number, text};

/// Number of series a [`MultiChart`] plots.
pub const MULTI_CHART_SERIES: usize = 3;

#[derive(Debug, Clone, Copy)]
enum DisplayOutput {
  Value,
  Timestamp,
}

impl OutputName for DisplayOutput {
  fn as_str(&self) -> &'static str {
    match self {
      DisplayOutput::Value => "value",
      DisplayOutput::Timestamp => "timestamp",
    }
  }
}

/// Shows its `value` input as-is.
pub struct DisplayValue {
  inputs: Vec<InputField>,
}

impl DisplayValue {
  pub const TYPE: &'static str = "display_value";

  pub fn new() -> Self {
    Self {
      inputs: vec![InputField::string("value", "")],
    }
  }
}

impl Default for DisplayValue {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Block for DisplayValue {
  fn block_type(&self) -> &str {
    Self::TYPE
  }

  fn category(&self) -> Category {
    Category::Display
  }

  fn inputs(&self) -> &[InputField] {
    &self.inputs
  }

  fn outputs(&self, _inputs: &InputMap) -> Vec<String> {
    vec![DisplayOutput::Value.as_str().to_string()]
  }

  fn display_effects(&self, outputs: &Outputs) -> Vec<DisplayEffect> {
    outputs
      .get(DisplayOutput::Value.as_str())
      .map(|value| vec![DisplayEffect::Value(value.to_string())])
      .unwrap_or_default()
  }

  async fn run(&self, inputs: InputMap, _ctx: RunContext) -> Result<Outputs, BlockError> {
    Ok(Outputs::new().with(DisplayOutput::Value, text(&inputs, "value")))
  }
}

/// Appends `value` to a time series, stamped with the current time.
pub struct Chart {
  inputs: Vec<InputField>,
}

impl Chart {
  pub const TYPE: &'static str = "chart";

  pub fn new() -> Self {
    Self {
      inputs: vec![InputField::number("value", "")],
    }
  }
}

impl Default for Chart {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Block for Chart {
  fn block_type(&self) -> &str {
    Self::TYPE
  }

  fn category(&self) -> Category {
    Category::Display
  }

  fn inputs(&self) -> &[InputField] {
    &self.inputs
  }

  fn outputs(&self, _inputs: &InputMap) -> Vec<String> {
    vec![
      DisplayOutput::Value.as_str().to_string(),
      DisplayOutput::Timestamp.as_str().to_string(),
    ]
  }

  fn display_effects(&self, outputs: &Outputs) -> Vec<DisplayEffect> {
    point(outputs.get("value"), outputs.get("timestamp"))
      .map(|p| vec![DisplayEffect::Point(p)])
      .unwrap_or_default()
  }

  async fn run(&self, inputs: InputMap, _ctx: RunContext) -> Result<Outputs, BlockError> {
    let value = number(&inputs, "value")?;
    Ok(
      Outputs::new()
        .with(DisplayOutput::Value, value.to_string())
        .with(DisplayOutput::Timestamp, now_ms().to_string()),
    )
  }
}

fn point(value: Option<&str>, timestamp: Option<&str>) -> Option<SeriesPoint> {
  Some(SeriesPoint {
    value: value?.parse().ok()?,
    timestamp_ms: timestamp?.parse().ok()?,
  })
}

fn series_field(index: usize) -> String {
  format!("series_{}", index + 1)
}

/// Plots up to three series at once. Empty series inputs are skipped, so a
/// chart can be fed by fewer producers.
pub struct MultiChart {
  inputs: Vec<InputField>,
}

impl MultiChart {
  pub const TYPE: &'static str = "multi_chart";

  pub fn new() -> Self {
    Self {
      inputs: (0..MULTI_CHART_SERIES)
        .map(|i| InputField::number(series_field(i), ""))
        .collect(),
    }
  }
}

impl Default for MultiChart {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Block for MultiChart {
  fn block_type(&self) -> &str {
    Self::TYPE
  }

  fn category(&self) -> Category {
    Category::Display
  }

  fn inputs(&self) -> &[InputField] {
    &self.inputs
  }

  fn outputs(&self, _inputs: &InputMap) -> Vec<String> {
    let mut names: Vec<String> = (0..MULTI_CHART_SERIES).map(series_field).collect();
    names.push(DisplayOutput::Timestamp.as_str().to_string());
    names
  }

  fn display_effects(&self, outputs: &Outputs) -> Vec<DisplayEffect> {
    let timestamp = outputs.get(DisplayOutput::Timestamp.as_str());
    (0..MULTI_CHART_SERIES)
      .filter_map(|series| {
        point(outputs.get(&series_field(series)), timestamp)
          .map(|point| DisplayEffect::SeriesPoint { series, point })
      })
      .collect()
  }

  async fn run(&self, inputs: InputMap, _ctx: RunContext) -> Result<Outputs, BlockError> {
    let mut outputs = Outputs::new();
    for series in 0..MULTI_CHART_SERIES {
      let field = series_field(series);
      if text(&inputs, &field).trim().is_empty() {
        continue;
      }
      let value = number(&inputs, &field)?;
      outputs.insert(field, value.to_string());
    }
    outputs.set(DisplayOutput::Timestamp, now_ms().to_string());
    Ok(outputs)
  }
}
