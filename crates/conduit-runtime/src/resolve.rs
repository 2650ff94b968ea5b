//! Input resolution.
//!
//! Turns a node's stored field values plus the outputs produced so far in a
//! pass into the concrete [`InputMap`] for one block invocation. Only the
//! fields a block declares are resolved; anything else stored on the node is
//! ignored.

use std::collections::HashMap;

use conduit_block::{Block, FieldType, InputField, InputMap, Outputs};
use conduit_model::{Binding, ConnectedNode, FieldValue};

/// Outputs produced during one pass, keyed by node id.
pub type RunOutputs = HashMap<String, Outputs>;

/// Resolve every declared input of `block` for `node`.
pub fn resolve_inputs(node: &ConnectedNode, block: &dyn Block, outputs: &RunOutputs) -> InputMap {
  block
    .inputs()
    .iter()
    .map(|field| (field.name.clone(), resolve_field(node, field, outputs)))
    .collect()
}

/// Inputs from stored values and defaults alone, as used when subscribing
/// triggers.
pub fn literal_inputs(node: &ConnectedNode, block: &dyn Block) -> InputMap {
  resolve_inputs(node, block, &RunOutputs::new())
}

fn resolve_field(node: &ConnectedNode, field: &InputField, outputs: &RunOutputs) -> String {
  match node.data.field(&field.name) {
    Some(FieldValue::Reference { node_id, output }) => outputs
      .get(node_id)
      .and_then(|produced| produced.get(output))
      .map(str::to_string)
      .unwrap_or_else(|| FieldValue::reference(node_id, output).to_raw()),
    Some(FieldValue::Literal(value)) if !value.is_empty() => value.clone(),
    _ => node
      .data
      .binding(&field.name)
      .and_then(|binding| bound_value(field, binding, outputs))
      .unwrap_or_else(|| field.default.clone()),
  }
}

/// The value a binding supplies, if the producer has one that suits the
/// field's declared type.
fn bound_value(field: &InputField, binding: &Binding, outputs: &RunOutputs) -> Option<String> {
  let produced = outputs.get(&binding.source_node_id)?;
  match field.field_type {
    FieldType::Object => Some(produced.to_json_string()),
    FieldType::Number => produced
      .get(&binding.source_output)
      .filter(|value| is_positive_number(value))
      .map(str::to_string),
    FieldType::String | FieldType::Boolean => {
      produced.get(&binding.source_output).map(str::to_string)
    }
  }
}

fn is_positive_number(value: &str) -> bool {
  value
    .trim()
    .parse::<f64>()
    .is_ok_and(|n| n.is_finite() && n > 0.0)
}
