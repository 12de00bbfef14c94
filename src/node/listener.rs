//! Peer node
//!
//! Wires a transport, a frame source and a frame sink together: runs the
//! transport event loop, the broadcast loop and the peer count reporter
//! until shutdown.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::broadcast::BroadcastLoop;
use super::config::NodeConfig;
use super::controller::LifecycleController;
use crate::error::Result;
use crate::media::{FrameSink, FrameSource};
use crate::protocol::PeerId;
use crate::registry::PeerTable;
use crate::stats::{NodeCounters, NodeStats};
use crate::transport::Transport;

/// Peer-to-peer frame streaming node
pub struct Node<T: Transport, K: FrameSink> {
    config: NodeConfig,
    transport: Arc<T>,
    sink: Arc<K>,
    table: Arc<Mutex<PeerTable>>,
    counters: Arc<NodeCounters>,
    controller: Arc<LifecycleController<T, K>>,
    started_at: Instant,
}

impl<T: Transport, K: FrameSink> Node<T, K> {
    /// Create a node over `transport`, rendering into `sink`
    pub fn new(config: NodeConfig, transport: T, sink: Arc<K>) -> Self {
        let transport = Arc::new(transport);
        let table = Arc::new(Mutex::new(PeerTable::new()));
        let counters = Arc::new(NodeCounters::default());

        let controller = Arc::new(LifecycleController::new(
            config.clone(),
            Arc::clone(&transport),
            Arc::clone(&sink),
            Arc::clone(&table),
            Arc::clone(&counters),
        ));

        Self {
            config,
            transport,
            sink,
            table,
            counters,
            controller,
            started_at: Instant::now(),
        }
    }

    /// Identity of this node
    pub fn local_peer_id(&self) -> PeerId {
        self.transport.local_peer_id()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// The render sink
    pub fn sink(&self) -> &Arc<K> {
        &self.sink
    }

    /// The lifecycle controller
    pub fn controller(&self) -> &Arc<LifecycleController<T, K>> {
        &self.controller
    }

    /// Run until the transport's event stream ends
    ///
    /// Returns the transport error that ended it.
    pub async fn run<S: FrameSource>(&self, source: S) -> Result<()> {
        self.run_until(source, std::future::pending()).await
    }

    /// Run until `shutdown` completes or the transport's event stream ends
    pub async fn run_until<S, F>(&self, source: S, shutdown: F) -> Result<()>
    where
        S: FrameSource,
        F: std::future::Future<Output = ()>,
    {
        let local = self.local_peer_id();
        tracing::info!(
            peer = %local,
            protocol = %self.config.protocol_id,
            width = self.config.geometry.width(),
            height = self.config.geometry.height(),
            "Node started"
        );

        if self.config.render_local_preview {
            self.table
                .lock()
                .await
                .ensure_target(self.sink.as_ref(), &local);
        }

        let broadcast = BroadcastLoop::new(
            source,
            Arc::clone(&self.sink),
            Arc::clone(&self.table),
            Arc::clone(&self.counters),
            local,
            self.config.geometry,
            self.config.send_interval,
        )
        .with_preview(self.config.render_local_preview)
        .spawn();

        let stats_handle = self.spawn_stats_task();

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.event_loop() => result,
        };

        broadcast.stop();
        if let Some(handle) = stats_handle {
            handle.abort();
        }
        self.controller.shutdown().await;

        match &result {
            Ok(()) => tracing::info!("Node stopped"),
            Err(e) => tracing::error!(error = %e, "Node stopped"),
        }
        result
    }

    async fn event_loop(&self) -> Result<()> {
        loop {
            let event = self.transport.next_event().await?;
            self.controller.handle_event(event).await;
        }
    }

    /// Current statistics
    pub async fn stats(&self) -> NodeStats {
        let mut stats = self.counters.snapshot();
        let table = self.table.lock().await;
        stats.active_sessions = table.sessions.len();
        stats.render_targets = table.target_count();
        stats.uptime = self.started_at.elapsed();
        stats
    }

    /// Periodically log how many peers we're connected to
    fn spawn_stats_task(&self) -> Option<JoinHandle<()>> {
        let interval = self.config.stats_interval;
        if interval.is_zero() {
            return None;
        }

        let table = Arc::clone(&self.table);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let table = table.lock().await;
                let mut dropped = 0;
                table
                    .sessions
                    .for_each(|_, handle| dropped += handle.counters().snapshot().frames_dropped);

                tracing::info!(
                    peers = table.sessions.len(),
                    targets = table.target_count(),
                    frames_dropped = dropped,
                    "Connected to peers"
                );
            }
        }))
    }
}
