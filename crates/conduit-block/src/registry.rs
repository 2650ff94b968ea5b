use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::block::Block;

/// Catalog of block implementations keyed by block type.
///
/// Built once at startup, then shared by reference. Nothing mutates it after
/// it has been handed to an executor.
#[derive(Clone, Default)]
pub struct BlockRegistry {
  blocks: HashMap<String, Arc<dyn Block>>,
}

impl BlockRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a block. A block with the same type replaces the previous
  /// definition, which is returned.
  pub fn register<B: Block + 'static>(&mut self, block: B) -> Option<Arc<dyn Block>> {
    self.register_arc(Arc::new(block))
  }

  pub fn register_arc(&mut self, block: Arc<dyn Block>) -> Option<Arc<dyn Block>> {
    let block_type = block.block_type().to_string();
    let previous = self.blocks.insert(block_type.clone(), block);
    if previous.is_some() {
      debug!(block_type = %block_type, "block definition replaced");
    }
    previous
  }

  pub fn get(&self, block_type: &str) -> Option<Arc<dyn Block>> {
    self.blocks.get(block_type).cloned()
  }

  pub fn contains(&self, block_type: &str) -> bool {
    self.blocks.contains_key(block_type)
  }

  pub fn len(&self) -> usize {
    self.blocks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.blocks.is_empty()
  }

  /// Registered block types, sorted.
  pub fn block_types(&self) -> Vec<&str> {
    let mut types: Vec<&str> = self.blocks.keys().map(String::as_str).collect();
    types.sort_unstable();
    types
  }
}

impl fmt::Debug for BlockRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BlockRegistry")
      .field("block_types", &self.block_types())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use async_trait::async_trait;

  use super::*;
  use crate::{BlockError, Category, InputField, InputMap, Outputs, RunContext};

  struct Constant {
    block_type: &'static str,
    value: &'static str,
  }

  #[async_trait]
  impl Block for Constant {
    fn block_type(&self) -> &str {
      self.block_type
    }

    fn category(&self) -> Category {
      Category::Action
    }

    fn inputs(&self) -> &[InputField] {
      &[]
    }

    fn outputs(&self, _inputs: &InputMap) -> Vec<String> {
      vec!["value".to_string()]
    }

    async fn run(&self, _inputs: InputMap, _ctx: RunContext) -> Result<Outputs, BlockError> {
      Ok([("value", self.value)].into_iter().collect())
    }
  }

  #[test]
  fn test_get_unknown_type() {
    let registry = BlockRegistry::new();
    assert!(registry.get("missing").is_none());
    assert!(registry.is_empty());
  }

  #[tokio::test]
  async fn test_reregister_last_write_wins() {
    let mut registry = BlockRegistry::new();
    assert!(
      registry
        .register(Constant {
          block_type: "constant",
          value: "first",
        })
        .is_none()
    );
    let previous = registry.register(Constant {
      block_type: "constant",
      value: "second",
    });
    assert!(previous.is_some());
    assert_eq!(registry.len(), 1);

    let block = registry.get("constant").unwrap();
    let outputs = block.run(InputMap::new(), RunContext::new()).await.unwrap();
    assert_eq!(outputs.get("value"), Some("second"));
  }

  #[test]
  fn test_block_types_sorted() {
    let mut registry = BlockRegistry::new();
    registry.register(Constant {
      block_type: "zeta",
      value: "",
    });
    registry.register(Constant {
      block_type: "alpha",
      value: "",
    });

    assert_eq!(registry.block_types(), vec!["alpha", "zeta"]);
  }

  #[test]
  fn test_default_subscribe_is_rejected() {
    let block = Constant {
      block_type: "constant",
      value: "",
    };
    assert!(!block.subscribes());
    let result = block.subscribe(InputMap::new(), Arc::new(|_: Outputs| {}), RunContext::new());
    assert!(matches!(result, Err(BlockError::NotSubscribable { .. })));
  }
}
