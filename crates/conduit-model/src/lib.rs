//! Conduit Model
//!
//! This crate provides the connected graph representation conduit executes.
//! The editor saves a flat list of nodes and edges; [`build_connected_model`]
//! normalizes it so every node carries explicit incoming and outgoing
//! connection lists, and parses every stored field value once into a
//! [`FieldValue`].
//!
//! Key properties of a [`ConnectedModel`]:
//! - Node ids are unique
//! - Every connection corresponds to an edge whose endpoints both exist
//! - The original edge list is kept verbatim for round-trip fidelity
//! - It is immutable once built and cheap to share behind an `Arc`
//!
//! The persisted JSON form is:
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "exportedAt": "2026-01-01T00:00:00Z",
//!   "nodes": [{ "id": "t", "type": "manual", "data": {}, "inputs": [], "outputs": [] }],
//!   "edges": [{ "id": "e1", "source": "t", "target": "f", "sourceHandle": "value", "targetHandle": "value" }]
//! }
//! ```

mod edge;
mod error;
mod model;
mod node;
mod value;

pub use edge::{CONTROL_HANDLE, Edge};
pub use error::ModelError;
pub use model::{ConnectedModel, MODEL_VERSION, build_connected_model, build_connected_model_at};
pub use node::{Binding, ConnectedNode, InputConnection, NodeData, OutputConnection, RawNode};
pub use value::FieldValue;
