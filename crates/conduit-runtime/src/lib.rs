//! Conduit Runtime
//!
//! Executes connected models against a [`conduit_block::BlockRegistry`]:
//!
//! - [`Executor::run_downstream`] propagates one trigger firing forward
//!   through the graph.
//! - [`Executor::run_from_node`] runs a single node with its dependencies,
//!   then continues downstream.
//! - [`Executor::subscribe_to_agent`] attaches every trigger of an agent and
//!   starts a pass per firing; [`AgentSupervisor`] keeps one such set per
//!   agent.
//!
//! Within a pass nodes run strictly one at a time. Separate firings get
//! separate passes with their own outputs map, so they never observe each
//! other's values.

mod config;
mod downstream;
mod error;
mod executor;
mod resolve;
mod result;
mod single;
mod sink;
mod subscription;
mod supervisor;

pub use config::{DEFAULT_ITERATION_FACTOR, ExecutorConfig};
pub use error::RuntimeError;
pub use executor::Executor;
pub use resolve::{RunOutputs, literal_inputs, resolve_inputs};
pub use result::{NodeFailure, NodeRunReport, PassReport};
pub use sink::{ChannelSink, DisplayEvent, DisplaySink, NoopSink};
pub use subscription::{AgentSubscription, ModelSupplier, TriggerCallback, TriggerPayload};
pub use supervisor::{AgentCleanup, AgentSupervisor};
