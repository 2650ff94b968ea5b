use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
  #[error("duplicate node id: {node_id}")]
  DuplicateNodeId { node_id: String },

  #[error("invalid model document: {0}")]
  Json(#[from] serde_json::Error),
}
