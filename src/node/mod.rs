//! Peer node
//!
//! This module provides:
//! - Node configuration
//! - The lifecycle controller driving sessions from transport events
//! - The periodic broadcast loop
//! - The [`Node`] runner tying them to a transport, source and sink

pub mod broadcast;
pub mod config;
pub mod controller;
pub mod listener;

pub use broadcast::{BroadcastHandle, BroadcastLoop, TickOutcome, TickReport};
pub use config::NodeConfig;
pub use controller::LifecycleController;
pub use listener::Node;
