//! Peer sessions
//!
//! This module provides:
//! - The per-peer lifecycle state machine
//! - Bounded outbound queues and their writer tasks
//! - The inbound handler that turns an accepted stream into frames

pub mod inbound;
pub mod outbound;
pub mod state;

pub use inbound::{FrameDispatch, InboundOutcome, InboundSession};
pub use outbound::{OutboundHandle, OutboundQueue, PushOutcome};
pub use state::{PeerLifecycle, PeerPhase};
