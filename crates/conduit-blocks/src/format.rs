//! Message formatting with minijinja.
//!
//! The template renders against the `data` bag. Its keys are available both
//! at the top level and under `data`:
//!
//! ```text
//! {{ symbol | upper }} crossed {{ data.price }}
//! ```
//!
//! Templates must use spaces inside the braces (`{{ price }}`). A template
//! consisting of exactly `{{node.output}}` is a node reference and is
//! substituted before the block ever sees it.

use async_trait::async_trait;
use conduit_block::{
  Block, BlockError, Category, InputField, InputMap, OutputName, Outputs, RunContext,
};
use minijinja::{Environment, Value};

use crate::input::text;

#[derive(Debug, Clone, Copy)]
enum FormatOutput {
  Message,
}

impl OutputName for FormatOutput {
  fn as_str(&self) -> &'static str {
    match self {
      FormatOutput::Message => "message",
    }
  }
}

pub struct FormatMessage {
  inputs: Vec<InputField>,
}

impl FormatMessage {
  pub const TYPE: &'static str = "format";

  pub fn new() -> Self {
    Self {
      inputs: vec![InputField::string("template", ""), InputField::object("data")],
    }
  }
}

impl Default for FormatMessage {
  fn default() -> Self {
    Self::new()
  }
}

/// Build the render context from the `data` bag.
fn context(inputs: &InputMap) -> Result<serde_json::Map<String, serde_json::Value>, BlockError> {
  let raw = text(inputs, "data").trim();
  let bag = if raw.is_empty() {
    serde_json::Map::new()
  } else {
    match serde_json::from_str::<serde_json::Value>(raw) {
      Ok(serde_json::Value::Object(map)) => map,
      Ok(_) => return Err(BlockError::invalid_input("data", "expected a JSON object")),
      Err(e) => return Err(BlockError::invalid_input("data", e.to_string())),
    }
  };

  let mut ctx = bag.clone();
  ctx.insert("data".to_string(), serde_json::Value::Object(bag));
  Ok(ctx)
}

#[async_trait]
impl Block for FormatMessage {
  fn block_type(&self) -> &str {
    Self::TYPE
  }

  fn category(&self) -> Category {
    Category::Action
  }

  fn inputs(&self) -> &[InputField] {
    &self.inputs
  }

  fn outputs(&self, _inputs: &InputMap) -> Vec<String> {
    vec![FormatOutput::Message.as_str().to_string()]
  }

  async fn run(&self, inputs: InputMap, _ctx: RunContext) -> Result<Outputs, BlockError> {
    let ctx = context(&inputs)?;
    let env = Environment::new();
    let message = env
      .render_str(text(&inputs, "template"), Value::from_serialize(&ctx))
      .map_err(|e| BlockError::invalid_input("template", e.to_string()))?;

    Ok(Outputs::new().with(FormatOutput::Message, message))
  }
}
