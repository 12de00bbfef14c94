//! Outbound broadcast loop
//!
//! Once per interval: capture the local frame, optionally paint it into the
//! node's own render target, then push it into every registered session.
//! Pushes never wait, so one stalled peer cannot hold up the loop or the
//! other peers. The next tick is scheduled after the current one finishes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::media::{FrameGeometry, FrameSink, FrameSource};
use crate::protocol::PeerId;
use crate::registry::PeerTable;
use crate::session::PushOutcome;
use crate::stats::NodeCounters;

/// Per-tick delivery summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Sessions a push was attempted on
    pub pushed: usize,
    /// Pushes that were queued
    pub queued: usize,
    /// Pushes dropped because the session's queue was full
    pub dropped: usize,
    /// Pushes to sessions whose writer had already gone
    pub closed: usize,
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Capture not ready; nothing sent
    NotReady,
    /// Source produced a frame of the wrong size; nothing sent
    Rejected,
    /// Frame fanned out
    Sent(TickReport),
}

/// Periodic capture-and-send task
pub struct BroadcastLoop<S, K> {
    source: S,
    sink: Arc<K>,
    table: Arc<Mutex<PeerTable>>,
    counters: Arc<NodeCounters>,
    local: PeerId,
    geometry: FrameGeometry,
    interval: Duration,
    preview: bool,
}

impl<S, K> BroadcastLoop<S, K>
where
    S: FrameSource,
    K: FrameSink,
{
    /// Create a loop pushing frames of `geometry` every `interval`
    pub fn new(
        source: S,
        sink: Arc<K>,
        table: Arc<Mutex<PeerTable>>,
        counters: Arc<NodeCounters>,
        local: PeerId,
        geometry: FrameGeometry,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            sink,
            table,
            counters,
            local,
            geometry,
            interval,
            preview: true,
        }
    }

    /// Whether to paint each captured frame into the local render target
    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    /// Run one tick
    pub async fn tick(&mut self) -> TickOutcome {
        let Some(frame) = self.source.capture_frame(self.geometry) else {
            self.counters.record_skipped_tick();
            return TickOutcome::NotReady;
        };

        if frame.geometry() != self.geometry {
            tracing::warn!(
                expected = self.geometry.frame_len(),
                actual = frame.len(),
                "Captured frame has the wrong size, skipping tick"
            );
            self.counters.record_skipped_tick();
            return TickOutcome::Rejected;
        }

        let sessions = {
            let table = self.table.lock().await;
            if self.preview && table.has_target(&self.local) {
                self.sink.render(&self.local, &frame);
            }
            table.sessions.snapshot()
        };

        let mut report = TickReport::default();
        for (peer, handle) in &sessions {
            report.pushed += 1;
            match handle.push(&frame) {
                PushOutcome::Queued => report.queued += 1,
                PushOutcome::Dropped => {
                    report.dropped += 1;
                    tracing::trace!(peer = %peer, "Outbound queue full, frame dropped");
                }
                PushOutcome::Closed => report.closed += 1,
            }
        }

        self.counters.record_tick(report.pushed);
        TickOutcome::Sent(report)
    }

    /// Spawn the loop; the first tick runs immediately
    pub fn spawn(mut self) -> BroadcastHandle {
        let interval = self.interval;
        let task = tokio::spawn(async move {
            loop {
                self.tick().await;
                tokio::time::sleep(interval).await;
            }
        });

        BroadcastHandle { task }
    }
}

/// Handle to a running broadcast loop
///
/// The loop stops when `stop` is called or the handle is dropped.
#[derive(Debug)]
pub struct BroadcastHandle {
    task: JoinHandle<()>,
}

impl BroadcastHandle {
    /// Stop the loop
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for BroadcastHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
