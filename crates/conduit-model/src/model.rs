use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::edge::Edge;
use crate::error::ModelError;
use crate::node::{ConnectedNode, InputConnection, OutputConnection, RawNode};

/// Version written into every model built by this crate.
pub const MODEL_VERSION: &str = "1.0";

/// A normalized, read-only workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ModelDocument", into = "ModelDocument")]
pub struct ConnectedModel {
  version: String,
  exported_at: DateTime<Utc>,
  nodes: Vec<ConnectedNode>,
  edges: Vec<Edge>,
  /// node_id -> position in `nodes`.
  node_index: HashMap<String, usize>,
  /// edge_id -> position in `edges`. The first edge wins on duplicate ids.
  edge_index: HashMap<String, usize>,
}

/// Wire form of a [`ConnectedModel`].
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelDocument {
  #[serde(default = "default_version")]
  version: String,
  #[serde(default = "Utc::now")]
  exported_at: DateTime<Utc>,
  nodes: Vec<ConnectedNode>,
  #[serde(default)]
  edges: Vec<Edge>,
}

fn default_version() -> String {
  MODEL_VERSION.to_string()
}

/// Build a connected model stamped with the current time.
pub fn build_connected_model(
  nodes: Vec<RawNode>,
  edges: Vec<Edge>,
) -> Result<ConnectedModel, ModelError> {
  build_connected_model_at(nodes, edges, Utc::now())
}

/// Build a connected model with an explicit export timestamp.
///
/// Edges whose endpoints are not both present are skipped when deriving
/// connections but stay in the edge list.
pub fn build_connected_model_at(
  nodes: Vec<RawNode>,
  edges: Vec<Edge>,
  exported_at: DateTime<Utc>,
) -> Result<ConnectedModel, ModelError> {
  let node_index = index_nodes(nodes.iter().map(|n| n.id.as_str()))?;

  let mut connected: Vec<ConnectedNode> = nodes
    .into_iter()
    .map(|node| ConnectedNode {
      id: node.id,
      block_type: node.block_type,
      data: node.data,
      inputs: Vec::new(),
      outputs: Vec::new(),
    })
    .collect();

  for edge in &edges {
    let (Some(&source), Some(&target)) = (node_index.get(&edge.source), node_index.get(&edge.target))
    else {
      debug!(
        edge_id = %edge.id,
        source = %edge.source,
        target = %edge.target,
        "dangling edge skipped"
      );
      continue;
    };

    connected[source].outputs.push(OutputConnection {
      target_node_id: edge.target.clone(),
      target_handle: edge.target_handle.clone(),
      edge_id: edge.id.clone(),
    });
    connected[target].inputs.push(InputConnection {
      source_node_id: edge.source.clone(),
      source_handle: edge.source_handle.clone(),
      edge_id: edge.id.clone(),
    });
  }

  Ok(ConnectedModel {
    version: MODEL_VERSION.to_string(),
    exported_at,
    nodes: connected,
    edge_index: index_edges(&edges),
    edges,
    node_index,
  })
}

fn index_nodes<'a>(
  ids: impl Iterator<Item = &'a str>,
) -> Result<HashMap<String, usize>, ModelError> {
  let mut index = HashMap::new();
  for (position, id) in ids.enumerate() {
    if index.insert(id.to_string(), position).is_some() {
      return Err(ModelError::DuplicateNodeId {
        node_id: id.to_string(),
      });
    }
  }
  Ok(index)
}

fn index_edges(edges: &[Edge]) -> HashMap<String, usize> {
  let mut index = HashMap::with_capacity(edges.len());
  for (position, edge) in edges.iter().enumerate() {
    index.entry(edge.id.clone()).or_insert(position);
  }
  index
}

impl TryFrom<ModelDocument> for ConnectedModel {
  type Error = ModelError;

  fn try_from(doc: ModelDocument) -> Result<Self, Self::Error> {
    let node_index = index_nodes(doc.nodes.iter().map(|n| n.id.as_str()))?;

    let mut nodes = doc.nodes;
    for node in &mut nodes {
      node
        .inputs
        .retain(|conn| node_index.contains_key(&conn.source_node_id));
      node
        .outputs
        .retain(|conn| node_index.contains_key(&conn.target_node_id));
    }

    Ok(Self {
      version: doc.version,
      exported_at: doc.exported_at,
      nodes,
      edge_index: index_edges(&doc.edges),
      edges: doc.edges,
      node_index,
    })
  }
}

impl From<ConnectedModel> for ModelDocument {
  fn from(model: ConnectedModel) -> Self {
    Self {
      version: model.version,
      exported_at: model.exported_at,
      nodes: model.nodes,
      edges: model.edges,
    }
  }
}

impl ConnectedModel {
  pub fn version(&self) -> &str {
    &self.version
  }

  pub fn exported_at(&self) -> DateTime<Utc> {
    self.exported_at
  }

  /// Nodes in their saved order.
  pub fn nodes(&self) -> &[ConnectedNode] {
    &self.nodes
  }

  pub fn edges(&self) -> &[Edge] {
    &self.edges
  }

  pub fn node(&self, node_id: &str) -> Option<&ConnectedNode> {
    self.node_index.get(node_id).map(|&i| &self.nodes[i])
  }

  pub fn edge(&self, edge_id: &str) -> Option<&Edge> {
    self.edge_index.get(edge_id).map(|&i| &self.edges[i])
  }

  pub fn contains(&self, node_id: &str) -> bool {
    self.node_index.contains_key(node_id)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Distinct producers feeding `node_id`.
  pub fn upstream(&self, node_id: &str) -> Vec<&str> {
    self
      .node(node_id)
      .map(ConnectedNode::upstream_ids)
      .unwrap_or_default()
  }

  /// Distinct consumers fed by `node_id`.
  pub fn downstream(&self, node_id: &str) -> Vec<&str> {
    self
      .node(node_id)
      .map(ConnectedNode::downstream_ids)
      .unwrap_or_default()
  }

  /// Every node reachable by following outgoing connections from `start`,
  /// `start` included, in breadth-first order.
  pub fn forward_reachable(&self, start: &str) -> Vec<&str> {
    let Some(start) = self.node(start) else {
      return Vec::new();
    };

    let mut seen: HashSet<&str> = HashSet::from([start.id.as_str()]);
    let mut order = vec![start.id.as_str()];
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
      for id in node.downstream_ids() {
        if seen.insert(id) {
          if let Some(next) = self.node(id) {
            order.push(next.id.as_str());
            queue.push_back(next);
          }
        }
      }
    }

    order
  }

  /// Every node `target` transitively depends on. The target itself is
  /// never part of the closure, even when it sits on a cycle.
  pub fn upstream_closure(&self, target: &str) -> HashSet<&str> {
    let mut closure: HashSet<&str> = HashSet::new();
    let Some(target) = self.node(target) else {
      return closure;
    };

    let mut stack: Vec<&ConnectedNode> = vec![target];
    while let Some(node) = stack.pop() {
      for id in node.upstream_ids() {
        if id == target.id || !closure.insert(id) {
          continue;
        }
        if let Some(producer) = self.node(id) {
          stack.push(producer);
        }
      }
    }

    closure
  }

  /// Project back to the editor's flat node and edge lists.
  pub fn to_raw(&self) -> (Vec<RawNode>, Vec<Edge>) {
    (
      self.nodes.iter().map(ConnectedNode::to_raw).collect(),
      self.edges.clone(),
    )
  }

  pub fn from_json(json: &str) -> Result<Self, ModelError> {
    Ok(serde_json::from_str(json)?)
  }

  pub fn to_json_pretty(&self) -> Result<String, ModelError> {
    Ok(serde_json::to_string_pretty(self)?)
  }
}
