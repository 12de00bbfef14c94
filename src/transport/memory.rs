//! In-process transport
//!
//! A [`MemoryNetwork`] is a hub that nodes join. Joining announces the new
//! node to every existing node (and vice versa) as a discovery event. Dials
//! are connected with `tokio::io::duplex` pipes and only succeed when the
//! target registered the requested protocol.
//!
//! The accepting side learns who dialed it only through
//! [`resolve_remote_identity`](Transport::resolve_remote_identity), which
//! waits for the configured identify delay first. Bytes can be read from the
//! stream before that, as on real peer-to-peer stacks.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::io::DuplexStream;
use tokio::sync::mpsc;

use super::{ConnectionId, IncomingConnection, Transport, TransportEvent};
use crate::error::TransportError;
use crate::protocol::PeerId;

type EventSender = mpsc::UnboundedSender<TransportEvent<DuplexStream>>;

struct NodeEntry {
    events: EventSender,
    protocols: HashSet<String>,
}

#[derive(Default)]
struct NetworkInner {
    nodes: HashMap<PeerId, NodeEntry>,
    /// Dialer identity per connection
    connections: HashMap<ConnectionId, PeerId>,
    /// Peers whose inbound connections can't be identified
    unidentifiable: HashSet<PeerId>,
    next_connection: u64,
}

/// Shared in-process network
#[derive(Clone)]
pub struct MemoryNetwork {
    inner: Arc<Mutex<NetworkInner>>,
    identify_delay: Duration,
    stream_buffer: usize,
}

impl MemoryNetwork {
    /// Create an empty network with no identify delay
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(NetworkInner::default())),
            identify_delay: Duration::ZERO,
            stream_buffer: 256 * 1024,
        }
    }

    /// Delay before an inbound connection's remote identity resolves
    pub fn identify_delay(mut self, delay: Duration) -> Self {
        self.identify_delay = delay;
        self
    }

    /// Bytes buffered in each direction of a connection
    pub fn stream_buffer(mut self, bytes: usize) -> Self {
        self.stream_buffer = bytes.max(1);
        self
    }

    fn lock(&self) -> MutexGuard<'_, NetworkInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Join the network as `peer`, accepting dials on `protocols`
    ///
    /// Existing nodes discover the new peer and the new peer discovers them.
    pub fn join(&self, peer: impl Into<PeerId>, protocols: &[&str]) -> MemoryTransport {
        let peer = peer.into();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut inner = self.lock();
            for (other_id, other) in inner.nodes.iter() {
                let _ = other
                    .events
                    .send(TransportEvent::PeerDiscovered(peer.clone()));
                let _ = tx.send(TransportEvent::PeerDiscovered(other_id.clone()));
            }

            inner.nodes.insert(
                peer.clone(),
                NodeEntry {
                    events: tx,
                    protocols: protocols.iter().map(|p| p.to_string()).collect(),
                },
            );
        }

        tracing::debug!(peer = %peer, "Joined memory network");

        MemoryTransport {
            local: peer,
            network: self.clone(),
            events: tokio::sync::Mutex::new(rx),
        }
    }

    /// Remove a peer and tell everyone else it disconnected
    ///
    /// The departing node's event stream ends.
    pub fn leave(&self, peer: &PeerId) {
        let mut inner = self.lock();
        if inner.nodes.remove(peer).is_none() {
            return;
        }

        for other in inner.nodes.values() {
            let _ = other
                .events
                .send(TransportEvent::Disconnected(peer.clone()));
        }
    }

    /// Announce `peer` to every other node again
    pub fn announce(&self, peer: &PeerId) {
        let inner = self.lock();
        for (other_id, other) in inner.nodes.iter() {
            if other_id != peer {
                let _ = other
                    .events
                    .send(TransportEvent::PeerDiscovered(peer.clone()));
            }
        }
    }

    /// Make identity resolution fail for connections dialed by `peer`
    pub fn make_unidentifiable(&self, peer: &PeerId) {
        self.lock().unidentifiable.insert(peer.clone());
    }

    /// Peers currently joined
    pub fn peers(&self) -> Vec<PeerId> {
        self.lock().nodes.keys().cloned().collect()
    }
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

/// One node's handle on a [`MemoryNetwork`]
pub struct MemoryTransport {
    local: PeerId,
    network: MemoryNetwork,
    events: tokio::sync::Mutex<mpsc::UnboundedReceiver<TransportEvent<DuplexStream>>>,
}

impl Transport for MemoryTransport {
    type Stream = DuplexStream;

    fn local_peer_id(&self) -> PeerId {
        self.local.clone()
    }

    async fn next_event(&self) -> Result<TransportEvent<DuplexStream>, TransportError> {
        self.events
            .lock()
            .await
            .recv()
            .await
            .ok_or(TransportError::EventStreamClosed)
    }

    async fn dial(&self, peer: &PeerId, protocol: &str) -> Result<DuplexStream, TransportError> {
        let mut guard = self.network.lock();
        let inner = &mut *guard;

        let target = inner
            .nodes
            .get(peer)
            .ok_or_else(|| TransportError::UnknownPeer(peer.clone()))?;

        if !target.protocols.contains(protocol) {
            return Err(TransportError::ProtocolNotSupported {
                peer: peer.clone(),
                protocol: protocol.to_string(),
            });
        }

        let id = ConnectionId(inner.next_connection);
        inner.next_connection += 1;

        let (local, remote) = tokio::io::duplex(self.network.stream_buffer);
        target
            .events
            .send(TransportEvent::Incoming(IncomingConnection {
                id,
                protocol: protocol.to_string(),
                stream: remote,
            }))
            .map_err(|_| TransportError::DialFailed {
                peer: peer.clone(),
                reason: "peer is shutting down".into(),
            })?;

        inner.connections.insert(id, self.local.clone());
        Ok(local)
    }

    async fn resolve_remote_identity(
        &self,
        connection: ConnectionId,
    ) -> Result<PeerId, TransportError> {
        if !self.network.identify_delay.is_zero() {
            tokio::time::sleep(self.network.identify_delay).await;
        }

        let inner = self.network.lock();
        let peer = inner.connections.get(&connection).ok_or_else(|| {
            TransportError::IdentityResolution(format!("unknown connection {}", connection))
        })?;

        if inner.unidentifiable.contains(peer) {
            return Err(TransportError::IdentityResolution(format!(
                "no identity for {}",
                connection
            )));
        }

        Ok(peer.clone())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    const PROTO: &str = "/test/1.0.0";

    #[tokio::test]
    async fn test_join_announces_both_ways() {
        let network = MemoryNetwork::new();
        let a = network.join("QmA", &[PROTO]);
        let b = network.join("QmB", &[PROTO]);

        match a.next_event().await.unwrap() {
            TransportEvent::PeerDiscovered(peer) => assert_eq!(peer, PeerId::new("QmB")),
            other => panic!("unexpected event: {:?}", other),
        }
        match b.next_event().await.unwrap() {
            TransportEvent::PeerDiscovered(peer) => assert_eq!(peer, PeerId::new("QmA")),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dial_and_resolve() {
        let network = MemoryNetwork::new();
        let a = network.join("QmA", &[PROTO]);
        let b = network.join("QmB", &[PROTO]);
        let _ = b.next_event().await.unwrap(); // discovery of A

        let mut outbound = a.dial(&PeerId::new("QmB"), PROTO).await.unwrap();
        outbound.write_all(b"ping").await.unwrap();

        let incoming = match b.next_event().await.unwrap() {
            TransportEvent::Incoming(incoming) => incoming,
            other => panic!("unexpected event: {:?}", other),
        };
        assert_eq!(incoming.protocol, PROTO);

        let mut stream = incoming.stream;
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        let identity = b.resolve_remote_identity(incoming.id).await.unwrap();
        assert_eq!(identity, PeerId::new("QmA"));
    }

    #[tokio::test]
    async fn test_dial_unsupported_protocol() {
        let network = MemoryNetwork::new();
        let a = network.join("QmA", &[PROTO]);
        let _b = network.join("QmB", &["/other/1.0.0"]);

        let result = a.dial(&PeerId::new("QmB"), PROTO).await;
        assert!(matches!(
            result,
            Err(TransportError::ProtocolNotSupported { .. })
        ));

        let result = a.dial(&PeerId::new("QmC"), PROTO).await;
        assert!(matches!(result, Err(TransportError::UnknownPeer(_))));
    }

    #[tokio::test]
    async fn test_leave_ends_stream_and_notifies() {
        let network = MemoryNetwork::new();
        let a = network.join("QmA", &[PROTO]);
        let b = network.join("QmB", &[PROTO]);
        let _ = a.next_event().await.unwrap();

        network.leave(&PeerId::new("QmB"));

        match a.next_event().await.unwrap() {
            TransportEvent::Disconnected(peer) => assert_eq!(peer, PeerId::new("QmB")),
            other => panic!("unexpected event: {:?}", other),
        }

        // B's queue still holds the discovery of A, then ends
        let _ = b.next_event().await.unwrap();
        assert_eq!(
            b.next_event().await.unwrap_err(),
            TransportError::EventStreamClosed
        );
    }

    #[tokio::test]
    async fn test_unidentifiable_peer() {
        let network = MemoryNetwork::new();
        let a = network.join("QmA", &[PROTO]);
        let b = network.join("QmB", &[PROTO]);
        let _ = b.next_event().await.unwrap();
        network.make_unidentifiable(&PeerId::new("QmA"));

        let _outbound = a.dial(&PeerId::new("QmB"), PROTO).await.unwrap();
        let incoming = match b.next_event().await.unwrap() {
            TransportEvent::Incoming(incoming) => incoming,
            other => panic!("unexpected event: {:?}", other),
        };

        let result = b.resolve_remote_identity(incoming.id).await;
        assert!(matches!(result, Err(TransportError::IdentityResolution(_))));
    }
}
