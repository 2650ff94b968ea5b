use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use conduit_block::{
  Block, BlockError, Category, InputField, InputMap, OutputName, Outputs, RunContext,
};

use crate::input::{number, text};

#[derive(Debug, Clone, Copy)]
enum ThresholdOutput {
  Passed,
  Value,
  OnTrue,
  OnFalse,
}

impl OutputName for ThresholdOutput {
  fn as_str(&self) -> &'static str {
    match self {
      ThresholdOutput::Passed => "passed",
      ThresholdOutput::Value => "value",
      ThresholdOutput::OnTrue => "on_true",
      ThresholdOutput::OnFalse => "on_false",
    }
  }
}

/// Comparison applied by [`ThresholdFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
  GreaterThan,
  LessThan,
  GreaterOrEqual,
  LessOrEqual,
  Equal,
  NotEqual,
  /// `bottom <= value <= top`
  Between,
}

impl Operator {
  pub fn evaluate(self, value: f64, bottom: f64, top: f64) -> bool {
    match self {
      Operator::GreaterThan => value > bottom,
      Operator::LessThan => value < bottom,
      Operator::GreaterOrEqual => value >= bottom,
      Operator::LessOrEqual => value <= bottom,
      Operator::Equal => value == bottom,
      Operator::NotEqual => value != bottom,
      Operator::Between => bottom <= value && value <= top,
    }
  }

  fn as_str(self) -> &'static str {
    match self {
      Operator::GreaterThan => "greater_than",
      Operator::LessThan => "less_than",
      Operator::GreaterOrEqual => "greater_or_equal",
      Operator::LessOrEqual => "less_or_equal",
      Operator::Equal => "equal",
      Operator::NotEqual => "not_equal",
      Operator::Between => "between",
    }
  }
}

impl FromStr for Operator {
  type Err = BlockError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "greater_than" => Ok(Operator::GreaterThan),
      "less_than" => Ok(Operator::LessThan),
      "greater_or_equal" => Ok(Operator::GreaterOrEqual),
      "less_or_equal" => Ok(Operator::LessOrEqual),
      "equal" => Ok(Operator::Equal),
      "not_equal" => Ok(Operator::NotEqual),
      "between" => Ok(Operator::Between),
      other => Err(BlockError::invalid_input(
        "operator",
        format!("unknown operator '{other}'"),
      )),
    }
  }
}

impl fmt::Display for Operator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Compares a numeric `value` against `bottom` (and `top` for `between`).
///
/// Besides `passed`, exactly one of `on_true` / `on_false` carries the value,
/// so edges leaving those handles only fire on their branch.
pub struct ThresholdFilter {
  inputs: Vec<InputField>,
}

impl ThresholdFilter {
  pub const TYPE: &'static str = "threshold";

  pub fn new() -> Self {
    Self {
      inputs: vec![
        InputField::number("value", "0"),
        InputField::string("operator", Operator::GreaterThan.as_str()),
        InputField::number("bottom", "0"),
        InputField::number("top", "0"),
      ],
    }
  }
}

impl Default for ThresholdFilter {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Block for ThresholdFilter {
  fn block_type(&self) -> &str {
    Self::TYPE
  }

  fn category(&self) -> Category {
    Category::Filter
  }

  fn inputs(&self) -> &[InputField] {
    &self.inputs
  }

  fn outputs(&self, _inputs: &InputMap) -> Vec<String> {
    [
      ThresholdOutput::Passed,
      ThresholdOutput::Value,
      ThresholdOutput::OnTrue,
      ThresholdOutput::OnFalse,
    ]
    .iter()
    .map(|o| o.as_str().to_string())
    .collect()
  }

  async fn run(&self, inputs: InputMap, _ctx: RunContext) -> Result<Outputs, BlockError> {
    let operator: Operator = text(&inputs, "operator").parse()?;
    let value = number(&inputs, "value")?;
    let bottom = number(&inputs, "bottom")?;
    let top = if operator == Operator::Between {
      number(&inputs, "top")?
    } else {
      0.0
    };

    let passed = operator.evaluate(value, bottom, top);
    let raw = text(&inputs, "value").trim().to_string();
    let branch = if passed {
      ThresholdOutput::OnTrue
    } else {
      ThresholdOutput::OnFalse
    };

    Ok(
      Outputs::new()
        .with(ThresholdOutput::Passed, passed.to_string())
        .with(ThresholdOutput::Value, raw.clone())
        .with(branch, raw),
    )
  }
}
