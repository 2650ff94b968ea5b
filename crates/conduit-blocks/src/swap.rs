use std::sync::Arc;

use async_trait::async_trait;
use conduit_block::{
  Block, BlockError, Category, InputField, InputMap, OutputName, Outputs, RunContext,
  WALLET_ADDRESS_FIELD,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::input::{positive, text};

/// What the block asks a [`QuoteProvider`] for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
  pub from_token: String,
  pub to_token: String,
  /// Amount of `from_token`, as entered.
  pub amount: String,
  pub wallet_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
  pub amount_out: String,
  pub price: String,
  /// Provider-specific route description.
  pub route: String,
}

/// Host-supplied swap quoting service.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
  async fn quote(&self, request: QuoteRequest) -> Result<Quote, BlockError>;
}

#[derive(Debug, Clone, Copy)]
enum SwapOutput {
  AmountOut,
  Price,
  Route,
}

impl OutputName for SwapOutput {
  fn as_str(&self) -> &'static str {
    match self {
      SwapOutput::AmountOut => "amount_out",
      SwapOutput::Price => "price",
      SwapOutput::Route => "route",
    }
  }
}

/// Requests a swap quote for the connected wallet.
pub struct SwapQuote {
  provider: Arc<dyn QuoteProvider>,
  inputs: Vec<InputField>,
}

impl SwapQuote {
  pub const TYPE: &'static str = "swap_quote";

  pub fn new(provider: Arc<dyn QuoteProvider>) -> Self {
    Self {
      provider,
      inputs: vec![
        InputField::string("from_token", ""),
        InputField::string("to_token", ""),
        InputField::number("amount", "0"),
        InputField::string(WALLET_ADDRESS_FIELD, ""),
      ],
    }
  }
}

#[async_trait]
impl Block for SwapQuote {
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
    [SwapOutput::AmountOut, SwapOutput::Price, SwapOutput::Route]
      .iter()
      .map(|o| o.as_str().to_string())
      .collect()
  }

  fn injects_wallet(&self) -> bool {
    true
  }

  async fn run(&self, inputs: InputMap, ctx: RunContext) -> Result<Outputs, BlockError> {
    let wallet_address = text(&inputs, WALLET_ADDRESS_FIELD);
    if wallet_address.is_empty() {
      return Err(BlockError::MissingCapability("wallet address".to_string()));
    }

    let from_token = text(&inputs, "from_token");
    let to_token = text(&inputs, "to_token");
    for (field, value) in [("from_token", from_token), ("to_token", to_token)] {
      if value.is_empty() {
        return Err(BlockError::invalid_input(field, "token is required"));
      }
    }
    positive(&inputs, "amount")?;

    let request = QuoteRequest {
      from_token: from_token.to_string(),
      to_token: to_token.to_string(),
      amount: text(&inputs, "amount").trim().to_string(),
      wallet_address: wallet_address.to_string(),
    };
    debug!(node_id = ?ctx.node_id, from = %request.from_token, to = %request.to_token, "requesting quote");

    let quote = self.provider.quote(request).await?;
    Ok(
      Outputs::new()
        .with(SwapOutput::AmountOut, quote.amount_out)
        .with(SwapOutput::Price, quote.price)
        .with(SwapOutput::Route, quote.route),
    )
  }
}
