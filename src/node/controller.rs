//! Lifecycle controller
//!
//! Turns transport events into session state:
//! - discovery dials the peer (once) and registers an outbound session
//! - inbound connections get an [`InboundSession`] whose frames are rendered
//!   for the resolved peer
//! - disconnects, failed writes and ended inbound streams tear the peer down
//!
//! Every peer-level failure is contained to that peer. Dials and connections
//! run on their own tasks so a slow peer never stalls event handling.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;

use super::config::NodeConfig;
use crate::error::{Result, TransportError};
use crate::media::{FrameBuffer, FrameSink};
use crate::protocol::PeerId;
use crate::registry::{ClosedPeer, PeerTable};
use crate::session::outbound::{self, OutboundQueue};
use crate::session::{FrameDispatch, InboundOutcome, InboundSession, PeerLifecycle};
use crate::stats::NodeCounters;
use crate::transport::{ConnectionId, IncomingConnection, Transport, TransportEvent};

/// Drives per-peer lifecycles from transport events
pub struct LifecycleController<T: Transport, K: FrameSink> {
    config: NodeConfig,
    local: PeerId,
    transport: Arc<T>,
    sink: Arc<K>,
    table: Arc<Mutex<PeerTable>>,
    counters: Arc<NodeCounters>,
    next_attempt: AtomicU64,
    tasks: std::sync::Mutex<JoinSet<()>>,
}

impl<T: Transport, K: FrameSink> LifecycleController<T, K> {
    /// Create a controller sharing `table` with the rest of the node
    pub fn new(
        config: NodeConfig,
        transport: Arc<T>,
        sink: Arc<K>,
        table: Arc<Mutex<PeerTable>>,
        counters: Arc<NodeCounters>,
    ) -> Self {
        let local = transport.local_peer_id();

        Self {
            config,
            local,
            transport,
            sink,
            table,
            counters,
            next_attempt: AtomicU64::new(1),
            tasks: std::sync::Mutex::new(JoinSet::new()),
        }
    }

    /// Shared peer table
    pub fn table(&self) -> &Arc<Mutex<PeerTable>> {
        &self.table
    }

    /// Dispatch one transport event
    pub async fn handle_event(self: &Arc<Self>, event: TransportEvent<T::Stream>) {
        match event {
            TransportEvent::PeerDiscovered(peer) => self.on_discovered(peer).await,
            TransportEvent::Incoming(incoming) => self.accept(incoming),
            TransportEvent::Disconnected(peer) => {
                self.on_disconnected(&peer).await;
            }
        }
    }

    /// A peer became reachable: dial it unless already dialing or connected
    pub async fn on_discovered(self: &Arc<Self>, peer: PeerId) {
        if peer == self.local {
            return;
        }

        let attempt = {
            let mut table = self.table.lock().await;
            if table.is_active(&peer) {
                tracing::debug!(peer = %peer, "Already connected to peer");
                return;
            }

            let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed);
            let mut lifecycle = PeerLifecycle::new(peer.clone(), attempt);
            lifecycle.start_dial();
            table.track(lifecycle);
            attempt
        };

        tracing::debug!(peer = %peer, attempt = attempt, "Dialing peer");

        let controller = Arc::clone(self);
        self.spawn_task(async move {
            let result = controller
                .transport
                .dial(&peer, &controller.config.protocol_id)
                .await;

            let Some((session_id, queue, stream)) =
                controller.complete_dial(&peer, attempt, result).await
            else {
                return;
            };

            let result = queue.run_writer(stream).await;
            controller.on_session_closed(&peer, session_id, result).await;
        });
    }

    /// Apply a dial result
    ///
    /// Returns the new session's ID, queue and stream when the peer should be
    /// served; the caller runs the writer.
    async fn complete_dial(
        &self,
        peer: &PeerId,
        attempt: u64,
        result: std::result::Result<T::Stream, TransportError>,
    ) -> Option<(u64, OutboundQueue, T::Stream)> {
        let mut table = self.table.lock().await;
        let wanted = table
            .lifecycle(peer)
            .map(|l| l.awaits_dial(attempt))
            .unwrap_or(false);

        let stream = match result {
            Ok(stream) => stream,
            Err(e) => {
                // Not every peer speaks our protocol
                self.counters.record_dial_failure();
                if wanted {
                    table.forget(peer);
                }
                tracing::debug!(peer = %peer, error = %e, "Dial failed");
                return None;
            }
        };

        if !wanted {
            tracing::debug!(peer = %peer, attempt = attempt, "Peer closed while dialing, dropping stream");
            return None;
        }

        let (handle, queue) = outbound::channel(self.config.outbound_capacity);
        let Some(session_id) = table.sessions.insert(peer, handle) else {
            table.forget(peer);
            return None;
        };

        if let Some(lifecycle) = table.lifecycle_mut(peer) {
            lifecycle.on_connected(session_id);
        }
        table.ensure_target(self.sink.as_ref(), peer);

        Some((session_id, queue, stream))
    }

    /// The writer for `session_id` finished
    async fn on_session_closed(&self, peer: &PeerId, session_id: u64, result: Result<()>) {
        let mut table = self.table.lock().await;

        // Only the current session may tear the peer down
        let current = table.sessions.get(peer).map(|s| s.id) == Some(session_id);
        if !current {
            return;
        }

        match result {
            Ok(()) => tracing::debug!(peer = %peer, session_id = session_id, "Outbound stream closed"),
            Err(e) => tracing::debug!(peer = %peer, session_id = session_id, error = %e, "Outbound stream failed"),
        }
        self.close_peer(&mut table, peer);
    }

    /// A peer disconnected; safe for peers that never connected
    pub async fn on_disconnected(&self, peer: &PeerId) -> ClosedPeer {
        let mut table = self.table.lock().await;
        self.close_peer(&mut table, peer)
    }

    fn close_peer(&self, table: &mut PeerTable, peer: &PeerId) -> ClosedPeer {
        let closed = table.close_peer(self.sink.as_ref(), peer);

        if closed.is_noop() {
            tracing::debug!(peer = %peer, "Disconnect for unknown peer");
        } else {
            tracing::info!(
                peer = %peer,
                previous_phase = ?closed.previous_phase,
                had_session = closed.session.is_some(),
                sessions = table.sessions.len(),
                "Peer disconnected"
            );
        }

        closed
    }

    /// Serve an inbound connection on its own task
    pub fn accept(self: &Arc<Self>, incoming: IncomingConnection<T::Stream>) {
        let IncomingConnection {
            id,
            protocol,
            stream,
        } = incoming;

        if protocol != self.config.protocol_id {
            tracing::debug!(connection_id = %id, protocol = %protocol, "Ignoring connection for other protocol");
            return;
        }

        self.counters.record_connection();
        tracing::debug!(connection_id = %id, "Incoming connection");

        let session = InboundSession::new(
            id,
            stream,
            self.config.geometry,
            self.config.max_pending_frames,
            self.config.read_buffer_size,
        );

        let controller = Arc::clone(self);
        self.spawn_task(async move {
            let identity = controller.transport.resolve_remote_identity(id);
            let outcome = session.run(identity, &*controller).await;
            controller.on_inbound_closed(id, outcome).await;
        });
    }

    async fn on_inbound_closed(&self, id: ConnectionId, outcome: InboundOutcome) {
        let Some(peer) = outcome.peer() else {
            tracing::debug!(connection_id = %id, "Unidentified inbound connection dropped");
            return;
        };

        let mut table = self.table.lock().await;

        // A connection from a closed lifecycle, or one replaced by a newer
        // connection, must not tear down the peer's current state
        if !table.is_current_inbound(peer, id) {
            tracing::debug!(connection_id = %id, peer = %peer, "Stale inbound connection closed");
            return;
        }

        tracing::debug!(connection_id = %id, peer = %peer, "Inbound connection closed");
        self.close_peer(&mut table, peer);
    }

    /// Abort every connection task and tear down all peers
    pub async fn shutdown(&self) {
        let mut tasks = {
            let mut guard = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };
        tasks.shutdown().await;

        let mut table = self.table.lock().await;
        table.clear(self.sink.as_ref());
        tracing::debug!("Controller shut down");
    }

    fn spawn_task<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        // Reap finished tasks so the set doesn't grow without bound
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }
}

impl<T: Transport, K: FrameSink> FrameDispatch for LifecycleController<T, K> {
    async fn bind(&self, connection: ConnectionId, peer: &PeerId) {
        let mut table = self.table.lock().await;
        table.bind_inbound(peer, connection);
        table.ensure_target(self.sink.as_ref(), peer);
    }

    async fn dispatch(&self, peer: &PeerId, frame: FrameBuffer) {
        let table = self.table.lock().await;
        if table.has_target(peer) {
            self.sink.render(peer, &frame);
            self.counters.record_frame_received(frame.len());
        } else {
            tracing::trace!(peer = %peer, "No render target, frame dropped");
        }
    }
}
