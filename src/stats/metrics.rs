//! Statistics and metrics for nodes and sessions

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters for one outbound session
#[derive(Debug, Default)]
pub struct SessionCounters {
    frames_queued: AtomicU64,
    frames_dropped: AtomicU64,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
}

impl SessionCounters {
    pub fn record_queued(&self) {
        self.frames_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self, bytes: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> SessionStats {
        SessionStats {
            frames_queued: self.frames_queued.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}

/// Session-level statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames accepted into the outbound queue
    pub frames_queued: u64,
    /// Frames dropped because the queue was full
    pub frames_dropped: u64,
    /// Frames written to the stream
    pub frames_sent: u64,
    /// Bytes written to the stream
    pub bytes_sent: u64,
}

/// Live counters for a node
#[derive(Debug, Default)]
pub struct NodeCounters {
    ticks: AtomicU64,
    ticks_skipped: AtomicU64,
    frames_pushed: AtomicU64,
    dial_failures: AtomicU64,
    connections_accepted: AtomicU64,
    frames_received: AtomicU64,
    bytes_received: AtomicU64,
}

impl NodeCounters {
    pub fn record_tick(&self, pushes: usize) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.frames_pushed
            .fetch_add(pushes as u64, Ordering::Relaxed);
    }

    pub fn record_skipped_tick(&self) {
        self.ticks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dial_failure(&self) {
        self.dial_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_received(&self, bytes: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    ///
    /// Gauges (sessions, targets, uptime) are filled in by the caller.
    pub fn snapshot(&self) -> NodeStats {
        NodeStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            frames_pushed: self.frames_pushed.load(Ordering::Relaxed),
            dial_failures: self.dial_failures.load(Ordering::Relaxed),
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            ..NodeStats::default()
        }
    }
}

/// Node-wide statistics
#[derive(Debug, Clone, Default)]
pub struct NodeStats {
    /// Broadcast ticks that captured a frame
    pub ticks: u64,
    /// Broadcast ticks skipped (capture not ready or rejected)
    pub ticks_skipped: u64,
    /// Frame pushes attempted across all sessions
    pub frames_pushed: u64,
    /// Dials that failed
    pub dial_failures: u64,
    /// Inbound connections accepted
    pub connections_accepted: u64,
    /// Frames rendered from remote peers
    pub frames_received: u64,
    /// Bytes of rendered frames
    pub bytes_received: u64,
    /// Currently registered outbound sessions
    pub active_sessions: usize,
    /// Currently live render targets
    pub render_targets: usize,
    /// Time since the node started
    pub uptime: Duration,
}

impl NodeStats {
    /// Average inbound frame rate over the node's uptime
    pub fn receive_rate(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.frames_received as f64 / secs
        } else {
            0.0
        }
    }
}
