//! Host-supplied context threaded through every block call.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BlockError;

/// Reserved input field that receives the host's wallet address.
pub const WALLET_ADDRESS_FIELD: &str = "wallet_address";

/// Capability to submit a transaction on behalf of the connected wallet.
#[async_trait]
pub trait TransactionSender: Send + Sync {
  /// Submit the transaction and return its hash.
  async fn send_transaction(&self, tx: serde_json::Value) -> Result<String, BlockError>;
}

/// Capability to sign EIP-712 style typed data with the connected wallet.
#[async_trait]
pub trait TypedDataSigner: Send + Sync {
  async fn sign_typed_data(&self, typed_data: serde_json::Value) -> Result<String, BlockError>;
}

/// Optional capabilities and identifiers supplied by the host.
///
/// The executors never invent these values; they forward whatever the host
/// put here. The subscription manager fills in `agent_id` and `node_id` for
/// the context it passes to `subscribe`.
#[derive(Clone, Default)]
pub struct RunContext {
  pub wallet_address: Option<String>,
  pub sender: Option<Arc<dyn TransactionSender>>,
  pub signer: Option<Arc<dyn TypedDataSigner>>,
  pub node_id: Option<String>,
  pub agent_id: Option<String>,
}

impl RunContext {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_wallet(mut self, address: impl Into<String>) -> Self {
    self.wallet_address = Some(address.into());
    self
  }

  pub fn with_sender(mut self, sender: Arc<dyn TransactionSender>) -> Self {
    self.sender = Some(sender);
    self
  }

  pub fn with_signer(mut self, signer: Arc<dyn TypedDataSigner>) -> Self {
    self.signer = Some(signer);
    self
  }

  pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
    self.agent_id = Some(agent_id.into());
    self
  }

  pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
    self.node_id = Some(node_id.into());
    self
  }

  /// The wallet address, if present and well-formed.
  pub fn verified_wallet(&self) -> Option<&str> {
    self
      .wallet_address
      .as_deref()
      .filter(|address| is_well_formed_address(address))
  }
}

impl fmt::Debug for RunContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RunContext")
      .field("wallet_address", &self.wallet_address)
      .field("sender", &self.sender.is_some())
      .field("signer", &self.signer.is_some())
      .field("node_id", &self.node_id)
      .field("agent_id", &self.agent_id)
      .finish()
  }
}

/// `0x` followed by exactly 40 hex digits.
pub fn is_well_formed_address(address: &str) -> bool {
  let Some(hex) = address
    .strip_prefix("0x")
    .or_else(|| address.strip_prefix("0X"))
  else {
    return false;
  };
  hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
  use super::*;

  const ADDRESS: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

  #[test]
  fn test_well_formed_address() {
    assert!(is_well_formed_address(ADDRESS));
    assert!(!is_well_formed_address("52908400098527886E0F7030069857D2E4169EE7"));
    assert!(!is_well_formed_address("0x1234"));
    assert!(!is_well_formed_address(
      "0xZZ908400098527886E0F7030069857D2E4169EE7"
    ));
  }

  #[test]
  fn test_verified_wallet_filters_malformed() {
    let ctx = RunContext::new().with_wallet("not-an-address");
    assert_eq!(ctx.verified_wallet(), None);

    let ctx = RunContext::new().with_wallet(ADDRESS);
    assert_eq!(ctx.verified_wallet(), Some(ADDRESS));
  }

  #[test]
  fn test_debug_hides_capabilities() {
    let ctx = RunContext::new().with_agent("agent-1");
    let rendered = format!("{:?}", ctx);
    assert!(rendered.contains("agent-1"));
    assert!(rendered.contains("sender: false"));
  }
}
