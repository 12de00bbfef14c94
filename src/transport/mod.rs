//! Transport seam
//!
//! Discovery, dialing, multiplexing and encryption belong to the transport.
//! A node only needs:
//! - a stream of events (peer discovered, inbound connection, peer gone)
//! - a way to dial a peer on the application protocol
//! - a way to learn who is on the other end of an inbound connection
//!
//! Identity resolution is deliberately separate from accepting a connection:
//! on real stacks it completes some time after the first bytes can be read.

pub mod memory;

use std::fmt;
use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::TransportError;
use crate::protocol::PeerId;

pub use memory::{MemoryNetwork, MemoryTransport};

/// Transport-assigned identifier for an inbound connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// An inbound connection negotiated on some protocol
#[derive(Debug)]
pub struct IncomingConnection<S> {
    /// Connection identifier, used to resolve the remote identity
    pub id: ConnectionId,
    /// Protocol negotiated by the dialer
    pub protocol: String,
    /// Duplex byte stream
    pub stream: S,
}

/// Events delivered by a transport
#[derive(Debug)]
pub enum TransportEvent<S> {
    /// A peer became reachable (it may not speak our protocol)
    PeerDiscovered(PeerId),
    /// A remote peer opened a stream to us
    Incoming(IncomingConnection<S>),
    /// All connections to a peer closed
    Disconnected(PeerId),
}

/// Peer-to-peer transport
pub trait Transport: Send + Sync + 'static {
    /// Duplex stream type for both dialed and accepted connections
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Identity of the local node
    fn local_peer_id(&self) -> PeerId;

    /// Wait for the next event
    ///
    /// Returns `TransportError::EventStreamClosed` once the transport is gone.
    fn next_event(
        &self,
    ) -> impl Future<Output = Result<TransportEvent<Self::Stream>, TransportError>> + Send;

    /// Open an application stream to `peer` using `protocol`
    fn dial(
        &self,
        peer: &PeerId,
        protocol: &str,
    ) -> impl Future<Output = Result<Self::Stream, TransportError>> + Send;

    /// Resolve the remote identity of an inbound connection
    fn resolve_remote_identity(
        &self,
        connection: ConnectionId,
    ) -> impl Future<Output = Result<PeerId, TransportError>> + Send;
}
