//! Session entry
//!
//! One registered outbound channel to a peer.

use std::time::{Duration, Instant};

use crate::protocol::PeerId;
use crate::session::OutboundHandle;
use crate::stats::SessionStats;

/// Live outbound channel to one peer
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session ID (distinguishes successive sessions to the same peer)
    pub id: u64,

    /// Remote peer
    pub peer: PeerId,

    /// Bounded queue drained into the peer's stream
    pub outbound: OutboundHandle,

    /// When the session was registered
    pub created_at: Instant,
}

impl Session {
    /// Create a new session
    pub fn new(id: u64, peer: PeerId, outbound: OutboundHandle) -> Self {
        Self {
            id,
            peer,
            outbound,
            created_at: Instant::now(),
        }
    }

    /// Time since registration
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Current delivery statistics
    pub fn stats(&self) -> SessionStats {
        self.outbound.counters().snapshot()
    }
}
