//! Display side effects.
//!
//! Display blocks never touch the host's surfaces directly. They describe
//! effects, and the executor forwards those to a [`DisplaySink`] the host
//! installs: a UI store, a websocket, a log line, or nothing at all.

use conduit_block::{DisplayEffect, SeriesPoint};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Effects forwarded to a [`ChannelSink`] consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayEvent {
  /// Replace a node's displayed value.
  Value { node_id: String, value: String },

  /// Append a point to a node's time series.
  Point { node_id: String, point: SeriesPoint },

  /// Append a point to one series of a node's multi-series chart.
  SeriesPoint {
    node_id: String,
    series: usize,
    point: SeriesPoint,
  },
}

/// Receiver of display side effects.
pub trait DisplaySink: Send + Sync {
  fn update_value(&self, node_id: &str, value: &str);

  fn append_point(&self, node_id: &str, point: SeriesPoint);

  fn append_series_point(&self, node_id: &str, series: usize, point: SeriesPoint);

  /// Route one effect to the matching method.
  fn apply(&self, node_id: &str, effect: DisplayEffect) {
    match effect {
      DisplayEffect::Value(value) => self.update_value(node_id, &value),
      DisplayEffect::Point(point) => self.append_point(node_id, point),
      DisplayEffect::SeriesPoint { series, point } => {
        self.append_series_point(node_id, series, point)
      }
    }
  }
}

/// Discards every effect.
#[derive(Debug, Clone, Default)]
pub struct NoopSink;

impl DisplaySink for NoopSink {
  fn update_value(&self, _node_id: &str, _value: &str) {}

  fn append_point(&self, _node_id: &str, _point: SeriesPoint) {}

  fn append_series_point(&self, _node_id: &str, _series: usize, _point: SeriesPoint) {}
}

/// Forwards effects to an unbounded channel.
///
/// Unbounded so a slow consumer never stalls a pass. Send errors are ignored;
/// the receiver may have gone away.
#[derive(Debug, Clone)]
pub struct ChannelSink {
  sender: mpsc::UnboundedSender<DisplayEvent>,
}

impl ChannelSink {
  pub fn new(sender: mpsc::UnboundedSender<DisplayEvent>) -> Self {
    Self { sender }
  }

  /// Create a sink together with its receiving end.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<DisplayEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl DisplaySink for ChannelSink {
  fn update_value(&self, node_id: &str, value: &str) {
    let _ = self.sender.send(DisplayEvent::Value {
      node_id: node_id.to_string(),
      value: value.to_string(),
    });
  }

  fn append_point(&self, node_id: &str, point: SeriesPoint) {
    let _ = self.sender.send(DisplayEvent::Point {
      node_id: node_id.to_string(),
      point,
    });
  }

  fn append_series_point(&self, node_id: &str, series: usize, point: SeriesPoint) {
    let _ = self.sender.send(DisplayEvent::SeriesPoint {
      node_id: node_id.to_string(),
      series,
      point,
    });
  }
}
