use thiserror::Error;

/// Errors a block can report from `run` or `subscribe`.
#[derive(Debug, Error)]
pub enum BlockError {
  /// An input could not be interpreted (bad number, unknown operator, ...).
  #[error("invalid input '{field}': {message}")]
  InvalidInput { field: String, message: String },

  /// The host did not supply a capability the block needs.
  #[error("missing capability: {0}")]
  MissingCapability(String),

  /// `subscribe` was called on a block that has no event source.
  #[error("block '{block_type}' does not support subscriptions")]
  NotSubscribable { block_type: String },

  /// An external collaborator (quote service, data feed, ...) failed.
  #[error("upstream service error: {message}")]
  Upstream { message: String },

  /// Any other block-specific failure.
  #[error("{0}")]
  Failed(String),
}

impl BlockError {
  pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self::InvalidInput {
      field: field.into(),
      message: message.into(),
    }
  }

  pub fn upstream(message: impl Into<String>) -> Self {
    Self::Upstream {
      message: message.into(),
    }
  }

  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed(message.into())
  }
}
