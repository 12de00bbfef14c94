//! Per-peer lifecycle state machine
//!
//! Tracks one peer from discovery to teardown:
//!
//! ```text
//! Discovered ──► Dialing ──► Connected ──► Closed
//!                   │                        ▲
//!                   └──── dial failure ──────┘
//! ```
//!
//! `Closed` is reachable from every state and is terminal for this lifecycle.

use std::time::{Duration, Instant};

use crate::protocol::PeerId;

/// Lifecycle phase of a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerPhase {
    /// Seen by discovery, no dial issued yet
    Discovered,
    /// Dial in flight
    Dialing,
    /// Outbound session registered
    Connected,
    /// Torn down
    Closed,
}

/// Lifecycle of one peer
#[derive(Debug, Clone)]
pub struct PeerLifecycle {
    /// Remote peer
    pub peer: PeerId,

    /// Current phase
    pub phase: PeerPhase,

    /// Dial attempt this lifecycle belongs to
    pub attempt: u64,

    /// Session ID once connected
    pub session_id: Option<u64>,

    /// When the peer was discovered
    pub discovered_at: Instant,

    /// When the outbound session was registered
    pub connected_at: Option<Instant>,
}

impl PeerLifecycle {
    /// Create a lifecycle for a freshly discovered peer
    pub fn new(peer: PeerId, attempt: u64) -> Self {
        Self {
            peer,
            phase: PeerPhase::Discovered,
            attempt,
            session_id: None,
            discovered_at: Instant::now(),
            connected_at: None,
        }
    }

    /// Transition to dialing
    pub fn start_dial(&mut self) -> bool {
        if self.phase == PeerPhase::Discovered {
            self.phase = PeerPhase::Dialing;
            true
        } else {
            false
        }
    }

    /// Dial succeeded and the session was registered
    pub fn on_connected(&mut self, session_id: u64) -> bool {
        if self.phase == PeerPhase::Dialing {
            self.phase = PeerPhase::Connected;
            self.session_id = Some(session_id);
            self.connected_at = Some(Instant::now());
            true
        } else {
            false
        }
    }

    /// Close from any state
    pub fn close(&mut self) {
        self.phase = PeerPhase::Closed;
    }

    /// A dial is in flight or a session is live
    pub fn is_active(&self) -> bool {
        matches!(self.phase, PeerPhase::Dialing | PeerPhase::Connected)
    }

    /// Whether a dial result for `attempt` still applies
    pub fn awaits_dial(&self, attempt: u64) -> bool {
        self.phase == PeerPhase::Dialing && self.attempt == attempt
    }

    /// Time connected, if connected
    pub fn connected_for(&self) -> Option<Duration> {
        self.connected_at.map(|t| t.elapsed())
    }
}
