//! Conduit Block
//!
//! This crate defines the contract every conduit block implements and the
//! registry that maps a block-type key to its implementation.
//!
//! A block is a reusable unit of behavior belonging to one of four
//! categories (trigger, filter, action, display). It declares its inputs,
//! reports the outputs it produces, and exposes an async `run`. Trigger
//! blocks may additionally `subscribe` to an external event source and fire
//! the graph whenever that source produces a value.
//!
//! The [`BlockRegistry`] is populated once at process start and then shared
//! read-only (behind an `Arc`) by the model and both executors.

mod block;
mod context;
mod error;
mod outputs;
mod registry;
mod subscription;

pub use block::{Block, Category, DisplayEffect, FieldType, InputField, SeriesPoint};
pub use context::{
  RunContext, TransactionSender, TypedDataSigner, WALLET_ADDRESS_FIELD, is_well_formed_address,
};
pub use error::BlockError;
pub use outputs::{InputMap, OutputName, Outputs};
pub use registry::BlockRegistry;
pub use subscription::{FireFn, Subscription};
