//! Session registry implementation
//!
//! Maps each peer to its single live outbound session. The registry itself
//! is not synchronized; the node keeps it behind the same lock as the render
//! target set so that registration, removal and iteration observe one
//! consistent view.

use std::collections::HashMap;

use super::entry::Session;
use crate::protocol::PeerId;
use crate::session::OutboundHandle;

/// Registry of outbound sessions keyed by peer
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<PeerId, Session>,
    next_session_id: u64,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            next_session_id: 1,
        }
    }

    /// Register an outbound session for `peer`
    ///
    /// Returns `false` and leaves the registry unchanged if the peer already
    /// has a session.
    pub fn register(&mut self, peer: &PeerId, outbound: OutboundHandle) -> bool {
        self.insert(peer, outbound).is_some()
    }

    /// Register and return the new session's ID
    pub fn insert(&mut self, peer: &PeerId, outbound: OutboundHandle) -> Option<u64> {
        if self.sessions.contains_key(peer) {
            tracing::debug!(peer = %peer, "Session already registered");
            return None;
        }

        let id = self.next_session_id.max(1);
        self.next_session_id = id + 1;
        self.sessions
            .insert(peer.clone(), Session::new(id, peer.clone(), outbound));

        tracing::info!(
            peer = %peer,
            session_id = id,
            sessions = self.sessions.len(),
            "Session registered"
        );

        Some(id)
    }

    /// Outbound handle for `peer`
    pub fn lookup(&self, peer: &PeerId) -> Option<OutboundHandle> {
        self.sessions.get(peer).map(|s| s.outbound.clone())
    }

    /// Full session entry for `peer`
    pub fn get(&self, peer: &PeerId) -> Option<&Session> {
        self.sessions.get(peer)
    }

    /// Remove the session for `peer`; no-op if absent
    pub fn remove(&mut self, peer: &PeerId) -> Option<Session> {
        let removed = self.sessions.remove(peer);

        if let Some(ref session) = removed {
            tracing::info!(
                peer = %peer,
                session_id = session.id,
                sessions = self.sessions.len(),
                "Session removed"
            );
        }

        removed
    }

    /// Snapshot of every `(peer, handle)` pair
    pub fn snapshot(&self) -> Vec<(PeerId, OutboundHandle)> {
        self.sessions
            .iter()
            .map(|(peer, session)| (peer.clone(), session.outbound.clone()))
            .collect()
    }

    /// Apply `f` to every session
    ///
    /// Iterates over a snapshot taken up front, so sessions removed while
    /// `f` runs elsewhere are still visited once and never cause a failure.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&PeerId, &OutboundHandle),
    {
        for (peer, handle) in self.snapshot() {
            f(&peer, &handle);
        }
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.sessions.contains_key(peer)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove every session
    pub fn clear(&mut self) -> Vec<Session> {
        self.sessions.drain().map(|(_, session)| session).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::outbound;

    fn peer(id: &str) -> PeerId {
        PeerId::new(id)
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = SessionRegistry::new();
        let (first, _q1) = outbound::channel(4);
        let (second, _q2) = outbound::channel(4);

        assert!(registry.register(&peer("QmA"), first));
        assert!(!registry.register(&peer("QmA"), second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_session_ids_unique() {
        let mut registry = SessionRegistry::new();
        let (h1, _q1) = outbound::channel(4);
        let (h2, _q2) = outbound::channel(4);

        let id1 = registry.insert(&peer("QmA"), h1).unwrap();
        registry.remove(&peer("QmA"));
        let id2 = registry.insert(&peer("QmA"), h2).unwrap();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_lookup_and_remove() {
        let mut registry = SessionRegistry::new();
        let (handle, _queue) = outbound::channel(4);

        assert!(registry.lookup(&peer("QmA")).is_none());
        registry.register(&peer("QmA"), handle);
        assert!(registry.lookup(&peer("QmA")).is_some());
        assert!(registry.contains(&peer("QmA")));

        assert!(registry.remove(&peer("QmA")).is_some());
        // Removing again is a no-op
        assert!(registry.remove(&peer("QmA")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_for_each_visits_all() {
        let mut registry = SessionRegistry::new();
        let mut queues = Vec::new();
        for id in ["QmA", "QmB", "QmC"] {
            let (handle, queue) = outbound::channel(4);
            registry.register(&peer(id), handle);
            queues.push(queue);
        }

        let mut seen = Vec::new();
        registry.for_each(|peer, _| seen.push(peer.clone()));
        seen.sort();
        assert_eq!(seen, vec![peer("QmA"), peer("QmB"), peer("QmC")]);
    }

    #[test]
    fn test_snapshot_survives_removal() {
        let mut registry = SessionRegistry::new();
        let (ha, _qa) = outbound::channel(4);
        let (hb, _qb) = outbound::channel(4);
        registry.register(&peer("QmA"), ha);
        registry.register(&peer("QmB"), hb);

        let snapshot = registry.snapshot();
        registry.remove(&peer("QmA"));
        registry.remove(&peer("QmB"));

        // The snapshot is unaffected and its handles still usable
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().all(|(_, h)| !h.is_closed()));
        assert!(registry.is_empty());
    }
}
