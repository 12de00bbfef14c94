//! Peer table
//!
//! Everything the node tracks per peer, kept together so a single lock
//! covers it: the outbound session registry, the set of live render targets,
//! the lifecycle of each peer being dialed or connected and the inbound
//! connection currently bound to each peer.

use std::collections::{HashMap, HashSet};

use super::entry::Session;
use super::store::SessionRegistry;
use crate::media::FrameSink;
use crate::protocol::PeerId;
use crate::session::{PeerLifecycle, PeerPhase};
use crate::transport::ConnectionId;

/// What tearing down a peer removed
#[derive(Debug, Default)]
pub struct ClosedPeer {
    /// Phase the peer was in, if it had a lifecycle
    pub previous_phase: Option<PeerPhase>,
    /// Session that was removed
    pub session: Option<Session>,
    /// Whether a render target was destroyed
    pub had_target: bool,
    /// Inbound connection that was bound to the peer
    pub inbound: Option<ConnectionId>,
}

impl ClosedPeer {
    /// Nothing was known about the peer
    pub fn is_noop(&self) -> bool {
        self.previous_phase.is_none()
            && self.session.is_none()
            && !self.had_target
            && self.inbound.is_none()
    }
}

/// Sessions, render targets and lifecycles for all peers
#[derive(Debug)]
pub struct PeerTable {
    /// Outbound sessions
    pub sessions: SessionRegistry,
    targets: HashSet<PeerId>,
    lifecycles: HashMap<PeerId, PeerLifecycle>,
    inbound: HashMap<PeerId, ConnectionId>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self {
            sessions: SessionRegistry::new(),
            targets: HashSet::new(),
            lifecycles: HashMap::new(),
            inbound: HashMap::new(),
        }
    }

    /// Lifecycle of a peer, if it is being dialed or connected
    pub fn lifecycle(&self, peer: &PeerId) -> Option<&PeerLifecycle> {
        self.lifecycles.get(peer)
    }

    pub fn lifecycle_mut(&mut self, peer: &PeerId) -> Option<&mut PeerLifecycle> {
        self.lifecycles.get_mut(peer)
    }

    /// Start tracking a peer; replaces any previous lifecycle
    pub fn track(&mut self, lifecycle: PeerLifecycle) {
        self.lifecycles.insert(lifecycle.peer.clone(), lifecycle);
    }

    /// Stop tracking a peer without touching its session or target
    pub fn forget(&mut self, peer: &PeerId) -> Option<PeerLifecycle> {
        self.lifecycles.remove(peer).map(|mut lifecycle| {
            lifecycle.close();
            lifecycle
        })
    }

    /// Whether a dial is in flight or a session is live for `peer`
    pub fn is_active(&self, peer: &PeerId) -> bool {
        self.sessions.contains(peer)
            || self
                .lifecycles
                .get(peer)
                .map(|l| l.is_active())
                .unwrap_or(false)
    }

    /// Bind an inbound connection to `peer`, replacing any earlier one
    pub fn bind_inbound(&mut self, peer: &PeerId, connection: ConnectionId) {
        if let Some(previous) = self.inbound.insert(peer.clone(), connection) {
            if previous != connection {
                tracing::debug!(peer = %peer, previous = %previous, connection_id = %connection, "Inbound connection replaced");
            }
        }
    }

    /// Whether `connection` is the inbound connection currently bound to `peer`
    ///
    /// Once the peer is closed, or a newer connection binds, an older
    /// connection is no longer current and must not tear the peer down.
    pub fn is_current_inbound(&self, peer: &PeerId, connection: ConnectionId) -> bool {
        self.inbound.get(peer) == Some(&connection)
    }

    /// Create the render target for `peer` unless it exists
    ///
    /// Returns `true` if a target was created.
    pub fn ensure_target<K: FrameSink + ?Sized>(&mut self, sink: &K, peer: &PeerId) -> bool {
        if !self.targets.insert(peer.clone()) {
            return false;
        }

        sink.create_target(peer);
        tracing::debug!(peer = %peer, targets = self.targets.len(), "Render target created");
        true
    }

    /// Destroy the render target for `peer` if it exists
    pub fn destroy_target<K: FrameSink + ?Sized>(&mut self, sink: &K, peer: &PeerId) -> bool {
        if !self.targets.remove(peer) {
            return false;
        }

        sink.destroy_target(peer);
        tracing::debug!(peer = %peer, targets = self.targets.len(), "Render target destroyed");
        true
    }

    pub fn has_target(&self, peer: &PeerId) -> bool {
        self.targets.contains(peer)
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Close a peer from whatever state it is in
    ///
    /// Removes its lifecycle, session, render target and inbound binding.
    /// Safe to call for a peer that was never connected or is unknown.
    pub fn close_peer<K: FrameSink + ?Sized>(&mut self, sink: &K, peer: &PeerId) -> ClosedPeer {
        let previous_phase = self.lifecycles.remove(peer).map(|l| l.phase);

        ClosedPeer {
            previous_phase,
            session: self.sessions.remove(peer),
            had_target: self.destroy_target(sink, peer),
            inbound: self.inbound.remove(peer),
        }
    }

    /// Tear down every peer, keeping none
    pub fn clear<K: FrameSink + ?Sized>(&mut self, sink: &K) {
        self.lifecycles.clear();
        self.inbound.clear();
        self.sessions.clear();
        for peer in self.targets.drain() {
            sink.destroy_target(&peer);
        }
    }
}

impl Default for PeerTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MemorySink;
    use crate::session::outbound;

    #[test]
    fn test_close_unknown_peer_is_noop() {
        let sink = MemorySink::new();
        let mut table = PeerTable::new();

        let closed = table.close_peer(&sink, &PeerId::new("QmA"));
        assert!(closed.is_noop());
    }

    #[test]
    fn test_close_dialing_peer() {
        let sink = MemorySink::new();
        let mut table = PeerTable::new();
        let peer = PeerId::new("QmA");

        let mut lifecycle = PeerLifecycle::new(peer.clone(), 1);
        lifecycle.start_dial();
        table.track(lifecycle);
        assert!(table.is_active(&peer));

        let closed = table.close_peer(&sink, &peer);
        assert_eq!(closed.previous_phase, Some(PeerPhase::Dialing));
        assert!(closed.session.is_none());
        assert!(!closed.had_target);
        assert!(!table.is_active(&peer));
        assert!(table.lifecycle(&peer).is_none());
    }

    #[test]
    fn test_close_connected_peer() {
        let sink = MemorySink::new();
        let mut table = PeerTable::new();
        let peer = PeerId::new("QmA");

        let (handle, _queue) = outbound::channel(2);
        table.sessions.register(&peer, handle);
        assert!(table.ensure_target(&sink, &peer));
        assert!(!table.ensure_target(&sink, &peer));
        assert!(sink.has_target(&peer));

        let closed = table.close_peer(&sink, &peer);
        assert!(closed.session.is_some());
        assert!(closed.had_target);
        assert!(!sink.has_target(&peer));
        assert_eq!(table.target_count(), 0);
        assert!(table.sessions.is_empty());
    }

    #[test]
    fn test_closed_peer_forgets_inbound_binding() {
        let sink = MemorySink::new();
        let mut table = PeerTable::new();
        let peer = PeerId::new("QmA");

        table.bind_inbound(&peer, ConnectionId(1));
        assert!(table.is_current_inbound(&peer, ConnectionId(1)));

        table.bind_inbound(&peer, ConnectionId(2));
        assert!(!table.is_current_inbound(&peer, ConnectionId(1)));

        let closed = table.close_peer(&sink, &peer);
        assert_eq!(closed.inbound, Some(ConnectionId(2)));
        assert!(!closed.is_noop());
        assert!(!table.is_current_inbound(&peer, ConnectionId(2)));
    }

    #[test]
    fn test_clear() {
        let sink = MemorySink::new();
        let mut table = PeerTable::new();
        for id in ["QmA", "QmB"] {
            table.ensure_target(&sink, &PeerId::new(id));
        }

        table.clear(&sink);
        assert!(sink.peers().is_empty());
        assert_eq!(table.target_count(), 0);
    }
}
