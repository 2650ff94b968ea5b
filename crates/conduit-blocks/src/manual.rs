use async_trait::async_trait;
use conduit_block::{
  Block, BlockError, Category, InputField, InputMap, OutputName, Outputs, RunContext,
};

use crate::input::text;

#[derive(Debug, Clone, Copy)]
enum ManualOutput {
  Value,
}

impl OutputName for ManualOutput {
  fn as_str(&self) -> &'static str {
    match self {
      ManualOutput::Value => "value",
    }
  }
}

/// Trigger fired by hand from the host. It has no event source of its own;
/// running it passes its `value` input through.
pub struct ManualTrigger {
  inputs: Vec<InputField>,
}

impl ManualTrigger {
  pub const TYPE: &'static str = "manual";

  pub fn new() -> Self {
    Self {
      inputs: vec![InputField::string("value", "")],
    }
  }
}

impl Default for ManualTrigger {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Block for ManualTrigger {
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
    vec![ManualOutput::Value.as_str().to_string()]
  }

  async fn run(&self, inputs: InputMap, _ctx: RunContext) -> Result<Outputs, BlockError> {
    Ok(Outputs::new().with(ManualOutput::Value, text(&inputs, "value")))
  }
}
