//! Inbound session handler
//!
//! Runs one accepted connection: reads raw bytes while the remote identity
//! resolves concurrently, holds bytes back until the identity is known, then
//! splits the byte stream into fixed-size frames and hands them on in order.
//!
//! Resolution and reads race. Whichever finishes first, bytes are never
//! attributed to a peer before its identity is known, and none are lost
//! because they arrived early.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::TransportError;
use crate::media::{FrameAssembler, FrameBuffer, FrameGeometry};
use crate::protocol::PeerId;
use crate::transport::ConnectionId;

/// Receiver of frames decoded by an inbound session
pub trait FrameDispatch: Send + Sync {
    /// The connection's remote identity resolved
    ///
    /// Called once, before the first `dispatch` for this connection.
    fn bind(&self, connection: ConnectionId, peer: &PeerId) -> impl Future<Output = ()> + Send;

    /// A complete frame arrived from `peer`
    fn dispatch(&self, peer: &PeerId, frame: FrameBuffer) -> impl Future<Output = ()> + Send;
}

/// How an inbound session ended
#[derive(Debug)]
pub enum InboundOutcome {
    /// Remote closed the stream
    Ended {
        /// Identity, if it resolved before the end
        peer: Option<PeerId>,
        /// Bytes left over that never formed a whole frame
        trailing_bytes: usize,
    },
    /// Identity resolution failed; nothing was dispatched
    IdentityFailed(TransportError),
    /// Reading from the stream failed
    ReadFailed {
        peer: Option<PeerId>,
        error: std::io::Error,
    },
}

impl InboundOutcome {
    /// Peer to disconnect as a result of this outcome
    pub fn peer(&self) -> Option<&PeerId> {
        match self {
            InboundOutcome::Ended { peer, .. } | InboundOutcome::ReadFailed { peer, .. } => {
                peer.as_ref()
            }
            InboundOutcome::IdentityFailed(_) => None,
        }
    }
}

/// State for one accepted connection
pub struct InboundSession<S> {
    connection: ConnectionId,
    stream: S,
    assembler: FrameAssembler,
    read_buffer_size: usize,
}

impl<S> InboundSession<S>
where
    S: AsyncRead + Send + Unpin,
{
    /// Create a handler for an accepted stream
    pub fn new(
        connection: ConnectionId,
        stream: S,
        geometry: FrameGeometry,
        max_pending_frames: usize,
        read_buffer_size: usize,
    ) -> Self {
        Self {
            connection,
            stream,
            assembler: FrameAssembler::new(geometry, max_pending_frames),
            read_buffer_size: read_buffer_size.max(1),
        }
    }

    /// Run until the stream ends, a read fails or the identity can't be resolved
    ///
    /// Dropping the returned future (or returning) drops `identity`, which
    /// cancels an in-flight resolution.
    pub async fn run<I, D>(mut self, identity: I, dispatch: &D) -> InboundOutcome
    where
        I: Future<Output = Result<PeerId, TransportError>> + Send,
        D: FrameDispatch,
    {
        tokio::pin!(identity);
        let mut resolving = true;
        let mut buf = vec![0u8; self.read_buffer_size];

        loop {
            tokio::select! {
                biased;

                result = &mut identity, if resolving => {
                    resolving = false;
                    match result {
                        Ok(peer) => {
                            tracing::debug!(
                                connection_id = %self.connection,
                                peer = %peer,
                                buffered = self.assembler.buffered_len(),
                                "Inbound identity resolved"
                            );
                            dispatch.bind(self.connection, &peer).await;
                            self.assembler.resolve(peer);
                            self.drain(dispatch).await;
                        }
                        Err(e) => {
                            tracing::warn!(
                                connection_id = %self.connection,
                                error = %e,
                                "Identity resolution failed, closing connection"
                            );
                            return InboundOutcome::IdentityFailed(e);
                        }
                    }
                }

                read = self.stream.read(&mut buf) => match read {
                    Ok(0) => {
                        let trailing_bytes = self.assembler.buffered_len();
                        if trailing_bytes > 0 && self.assembler.peer().is_some() {
                            tracing::debug!(
                                connection_id = %self.connection,
                                trailing_bytes,
                                "Stream ended mid-frame"
                            );
                        }
                        return InboundOutcome::Ended {
                            peer: self.assembler.peer().cloned(),
                            trailing_bytes,
                        };
                    }
                    Ok(n) => {
                        let dropped = self.assembler.push(&buf[..n]);
                        if dropped > 0 {
                            tracing::warn!(
                                connection_id = %self.connection,
                                dropped,
                                "Identity still unresolved, dropped oldest buffered frames"
                            );
                        }
                        self.drain(dispatch).await;
                    }
                    Err(error) => {
                        return InboundOutcome::ReadFailed {
                            peer: self.assembler.peer().cloned(),
                            error,
                        };
                    }
                },
            }
        }
    }

    async fn drain<D: FrameDispatch>(&mut self, dispatch: &D) {
        let Some(peer) = self.assembler.peer().cloned() else {
            return;
        };

        while let Some(frame) = self.assembler.next_frame() {
            tracing::trace!(connection_id = %self.connection, peer = %peer, "Frame received");
            dispatch.dispatch(&peer, frame).await;
        }
    }
}
