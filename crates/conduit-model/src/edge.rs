use serde::{Deserialize, Serialize};

/// Source handle for control-only edges. Such an edge carries no named
/// value; it fires whenever the source produced any output at all.
pub const CONTROL_HANDLE: &str = "exec";

/// A raw editor edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
  pub id: String,
  pub source: String,
  pub target: String,
  #[serde(default)]
  pub source_handle: Option<String>,
  #[serde(default)]
  pub target_handle: Option<String>,
}

impl Edge {
  pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      source: source.into(),
      target: target.into(),
      source_handle: None,
      target_handle: None,
    }
  }

  pub fn with_handles(
    mut self,
    source_handle: impl Into<String>,
    target_handle: impl Into<String>,
  ) -> Self {
    self.source_handle = Some(source_handle.into());
    self.target_handle = Some(target_handle.into());
    self
  }

  /// Edges without a source handle, or with the reserved control handle,
  /// are control edges.
  pub fn is_control(&self) -> bool {
    self
      .source_handle
      .as_deref()
      .is_none_or(|handle| handle == CONTROL_HANDLE)
  }
}
