//! Render targets
//!
//! The rendering surface lives outside this crate. A [`FrameSink`] owns one
//! render target per peer; the node creates a target before the first
//! `render` for that peer and destroys it when the peer goes away.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::frame::FrameBuffer;
use crate::protocol::PeerId;

/// Destination for decoded frames, keyed by peer
pub trait FrameSink: Send + Sync + 'static {
    /// Create the render target for a peer
    fn create_target(&self, peer: &PeerId);

    /// Paint a frame into the peer's target
    ///
    /// Only called after `create_target` for the same peer.
    fn render(&self, peer: &PeerId, frame: &FrameBuffer);

    /// Tear down the peer's target
    fn destroy_target(&self, peer: &PeerId);
}

/// State of one in-memory render target
#[derive(Debug, Clone, Default)]
pub struct TargetState {
    /// Most recently rendered frame
    pub last_frame: Option<FrameBuffer>,
    /// Number of frames rendered
    pub frames_rendered: u64,
}

/// Headless render surface
///
/// Keeps the latest frame per peer. Useful for nodes without a display and
/// for observing what a node has rendered.
#[derive(Debug, Default)]
pub struct MemorySink {
    targets: Mutex<HashMap<PeerId, TargetState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PeerId, TargetState>> {
        // A panic while holding this lock leaves plain data behind; keep going.
        self.targets.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether a target exists for the peer
    pub fn has_target(&self, peer: &PeerId) -> bool {
        self.lock().contains_key(peer)
    }

    /// Snapshot of one target
    pub fn target(&self, peer: &PeerId) -> Option<TargetState> {
        self.lock().get(peer).cloned()
    }

    /// Peers with a live target
    pub fn peers(&self) -> Vec<PeerId> {
        self.lock().keys().cloned().collect()
    }

    /// Frames rendered for a peer (0 if no target)
    pub fn frames_rendered(&self, peer: &PeerId) -> u64 {
        self.lock().get(peer).map(|t| t.frames_rendered).unwrap_or(0)
    }
}

impl FrameSink for MemorySink {
    fn create_target(&self, peer: &PeerId) {
        self.lock().entry(peer.clone()).or_default();
    }

    fn render(&self, peer: &PeerId, frame: &FrameBuffer) {
        match self.lock().get_mut(peer) {
            Some(target) => {
                target.last_frame = Some(frame.clone());
                target.frames_rendered += 1;
            }
            None => {
                tracing::trace!(peer = %peer, "Render without target ignored");
            }
        }
    }

    fn destroy_target(&self, peer: &PeerId) {
        self.lock().remove(peer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::frame::FrameGeometry;

    #[test]
    fn test_target_lifecycle() {
        let sink = MemorySink::new();
        let peer = PeerId::new("QmA");
        let frame = FrameBuffer::solid(FrameGeometry::new(1, 1).unwrap(), [9, 9, 9, 9]);

        // Render before create is ignored
        sink.render(&peer, &frame);
        assert!(!sink.has_target(&peer));

        sink.create_target(&peer);
        sink.render(&peer, &frame);
        sink.render(&peer, &frame);
        assert_eq!(sink.frames_rendered(&peer), 2);
        assert_eq!(sink.target(&peer).unwrap().last_frame, Some(frame));

        sink.destroy_target(&peer);
        assert!(!sink.has_target(&peer));
        assert_eq!(sink.frames_rendered(&peer), 0);
    }
}
