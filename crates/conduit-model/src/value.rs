//! Stored field values.
//!
//! A value stored in a node's data is either a literal string or a
//! whole-string reference of the form `{{<nodeId>.<outputName>}}`. There is
//! no partial interpolation: `"price is {{a.b}}"` is a literal.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
  Literal(String),
  Reference { node_id: String, output: String },
}

impl FieldValue {
  /// Parse raw stored text.
  pub fn parse(raw: impl Into<String>) -> Self {
    let raw = raw.into();
    match parse_reference(&raw) {
      Some((node_id, output)) => FieldValue::Reference {
        node_id: node_id.to_string(),
        output: output.to_string(),
      },
      None => FieldValue::Literal(raw),
    }
  }

  pub fn literal(value: impl Into<String>) -> Self {
    FieldValue::Literal(value.into())
  }

  pub fn reference(node_id: impl Into<String>, output: impl Into<String>) -> Self {
    FieldValue::Reference {
      node_id: node_id.into(),
      output: output.into(),
    }
  }

  /// An empty literal counts as unset.
  pub fn is_empty(&self) -> bool {
    matches!(self, FieldValue::Literal(s) if s.is_empty())
  }

  /// The stored text, with references rendered back as placeholders.
  pub fn to_raw(&self) -> String {
    self.to_string()
  }

  fn from_json(value: serde_json::Value) -> Self {
    match value {
      serde_json::Value::String(s) => FieldValue::parse(s),
      serde_json::Value::Null => FieldValue::Literal(String::new()),
      serde_json::Value::Bool(b) => FieldValue::Literal(b.to_string()),
      serde_json::Value::Number(n) => FieldValue::Literal(n.to_string()),
      other => FieldValue::Literal(other.to_string()),
    }
  }
}

impl fmt::Display for FieldValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FieldValue::Literal(s) => f.write_str(s),
      FieldValue::Reference { node_id, output } => write!(f, "{{{{{}.{}}}}}", node_id, output),
    }
  }
}

impl Serialize for FieldValue {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.to_raw())
  }
}

impl<'de> Deserialize<'de> for FieldValue {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(FieldValue::from_json(value))
  }
}

/// Split `{{node.output}}` into its parts. The node id runs up to the first
/// dot; neither part may be empty, contain braces, or contain whitespace.
fn parse_reference(raw: &str) -> Option<(&str, &str)> {
  let inner = raw.strip_prefix("{{")?.strip_suffix("}}")?;
  if inner.contains(['{', '}']) || inner.chars().any(char::is_whitespace) {
    return None;
  }
  let (node_id, output) = inner.split_once('.')?;
  if node_id.is_empty() || output.is_empty() {
    return None;
  }
  Some((node_id, output))
}
