//! Conduit Blocks
//!
//! The built-in block catalog:
//!
//! | type            | category | notes                                   |
//! |-----------------|----------|-----------------------------------------|
//! | `manual`        | trigger  | fired by hand, passes `value` through   |
//! | `interval`      | trigger  | fires every `interval_ms`               |
//! | `volume_window` | trigger  | needs a [`VolumeSource`]                |
//! | `threshold`     | filter   | numeric comparison with branch outputs  |
//! | `format`        | action   | minijinja message over a data bag       |
//! | `swap_quote`    | action   | needs a [`QuoteProvider`] and a wallet  |
//! | `display_value` | display  | single value                            |
//! | `chart`         | display  | time series                             |
//! | `multi_chart`   | display  | up to three series                      |
//!
//! Blocks that talk to the outside world only see the collaborator traits
//! defined here. The host constructs the implementations and hands them over
//! through [`Collaborators`].

mod display;
mod format;
mod input;
mod interval;
mod manual;
mod swap;
mod threshold;
mod volume;

use std::fmt;
use std::sync::Arc;

use conduit_block::BlockRegistry;
use tracing::debug;

pub use display::{Chart, DisplayValue, MULTI_CHART_SERIES, MultiChart};
pub use format::FormatMessage;
pub use interval::IntervalTrigger;
pub use manual::ManualTrigger;
pub use swap::{Quote, QuoteProvider, QuoteRequest, SwapQuote};
pub use threshold::{Operator, ThresholdFilter};
pub use volume::{RollingWindows, VolumeSource, VolumeWindowTrigger, WindowSummary};

/// External services the built-in blocks may use.
#[derive(Clone, Default)]
pub struct Collaborators {
  pub quotes: Option<Arc<dyn QuoteProvider>>,
  pub volumes: Option<Arc<dyn VolumeSource>>,
  /// Shared by every `volume_window` node.
  pub windows: RollingWindows,
}

impl fmt::Debug for Collaborators {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Collaborators")
      .field("quotes", &self.quotes.is_some())
      .field("volumes", &self.volumes.is_some())
      .finish_non_exhaustive()
  }
}

/// Register every built-in block whose collaborators are available.
pub fn register_builtins(registry: &mut BlockRegistry, collaborators: Collaborators) {
  registry.register(ManualTrigger::new());
  registry.register(IntervalTrigger::new());
  registry.register(ThresholdFilter::new());
  registry.register(FormatMessage::new());
  registry.register(DisplayValue::new());
  registry.register(Chart::new());
  registry.register(MultiChart::new());

  match collaborators.quotes {
    Some(provider) => {
      registry.register(SwapQuote::new(provider));
    }
    None => debug!(block_type = SwapQuote::TYPE, "no quote provider; block not registered"),
  }

  match collaborators.volumes {
    Some(source) => {
      registry.register(VolumeWindowTrigger::new(source, collaborators.windows));
    }
    None => debug!(
      block_type = VolumeWindowTrigger::TYPE,
      "no volume source; block not registered"
    ),
  }
}
