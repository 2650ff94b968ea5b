use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::FieldValue;

/// Explicit data binding from one input to a producer's named output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
  pub source_node_id: String,
  pub source_output: String,
}

/// Stored configuration of a node.
///
/// Field values sit at the top level of the `data` object, keyed by input
/// name. Bindings live under the reserved `inputBindings` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
  #[serde(
    default,
    rename = "inputBindings",
    skip_serializing_if = "BTreeMap::is_empty"
  )]
  pub bindings: BTreeMap<String, Binding>,
  #[serde(flatten)]
  pub fields: BTreeMap<String, FieldValue>,
}

impl NodeData {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store a field, parsing placeholder syntax.
  pub fn with_field(mut self, name: impl Into<String>, raw: impl Into<String>) -> Self {
    self.fields.insert(name.into(), FieldValue::parse(raw));
    self
  }

  pub fn with_binding(
    mut self,
    input: impl Into<String>,
    source_node_id: impl Into<String>,
    source_output: impl Into<String>,
  ) -> Self {
    self.bindings.insert(
      input.into(),
      Binding {
        source_node_id: source_node_id.into(),
        source_output: source_output.into(),
      },
    );
    self
  }

  pub fn field(&self, name: &str) -> Option<&FieldValue> {
    self.fields.get(name)
  }

  pub fn binding(&self, name: &str) -> Option<&Binding> {
    self.bindings.get(name)
  }
}

/// A node as saved by the editor, before connections are derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
  pub id: String,
  #[serde(rename = "type")]
  pub block_type: String,
  #[serde(default)]
  pub data: NodeData,
}

impl RawNode {
  pub fn new(id: impl Into<String>, block_type: impl Into<String>, data: NodeData) -> Self {
    Self {
      id: id.into(),
      block_type: block_type.into(),
      data,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputConnection {
  pub source_node_id: String,
  #[serde(default)]
  pub source_handle: Option<String>,
  pub edge_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConnection {
  pub target_node_id: String,
  #[serde(default)]
  pub target_handle: Option<String>,
  pub edge_id: String,
}

/// A node with its incoming and outgoing connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedNode {
  pub id: String,
  #[serde(rename = "type")]
  pub block_type: String,
  #[serde(default)]
  pub data: NodeData,
  #[serde(default)]
  pub inputs: Vec<InputConnection>,
  #[serde(default)]
  pub outputs: Vec<OutputConnection>,
}

impl ConnectedNode {
  /// Distinct producer ids, in connection order.
  pub fn upstream_ids(&self) -> Vec<&str> {
    let mut ids: Vec<&str> = Vec::with_capacity(self.inputs.len());
    for conn in &self.inputs {
      if !ids.contains(&conn.source_node_id.as_str()) {
        ids.push(&conn.source_node_id);
      }
    }
    ids
  }

  /// Distinct consumer ids, in connection order.
  pub fn downstream_ids(&self) -> Vec<&str> {
    let mut ids: Vec<&str> = Vec::with_capacity(self.outputs.len());
    for conn in &self.outputs {
      if !ids.contains(&conn.target_node_id.as_str()) {
        ids.push(&conn.target_node_id);
      }
    }
    ids
  }

  /// Distinct producers named by explicit input bindings.
  pub fn bound_producers(&self) -> Vec<&str> {
    let mut ids: Vec<&str> = Vec::with_capacity(self.data.bindings.len());
    for binding in self.data.bindings.values() {
      if !ids.contains(&binding.source_node_id.as_str()) {
        ids.push(&binding.source_node_id);
      }
    }
    ids
  }

  pub fn to_raw(&self) -> RawNode {
    RawNode {
      id: self.id.clone(),
      block_type: self.block_type.clone(),
      data: self.data.clone(),
    }
  }
}
