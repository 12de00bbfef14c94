//! Node configuration

use std::time::Duration;

use crate::media::FrameGeometry;
use crate::protocol::constants::*;

/// Node configuration options
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Application protocol negotiated with peers
    pub protocol_id: String,

    /// Frame dimensions, fixed for the node's lifetime
    pub geometry: FrameGeometry,

    /// Delay between the end of one broadcast tick and the start of the next
    pub send_interval: Duration,

    /// Frames buffered per outbound session before new frames are dropped
    pub outbound_capacity: usize,

    /// Frames held for an inbound connection whose identity is unresolved
    pub max_pending_frames: usize,

    /// Read buffer size for inbound streams
    pub read_buffer_size: usize,

    /// Peer count reporting interval (zero disables)
    pub stats_interval: Duration,

    /// Render the local capture into the node's own target
    pub render_local_preview: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            protocol_id: PROTOCOL_ID.to_string(),
            geometry: FrameGeometry::default(),
            send_interval: DEFAULT_SEND_INTERVAL,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            max_pending_frames: DEFAULT_MAX_PENDING_FRAMES,
            read_buffer_size: 64 * 1024, // 64KB
            stats_interval: DEFAULT_STATS_INTERVAL,
            render_local_preview: true,
        }
    }
}

impl NodeConfig {
    /// Set the application protocol identifier
    pub fn protocol_id(mut self, protocol_id: impl Into<String>) -> Self {
        self.protocol_id = protocol_id.into();
        self
    }

    /// Set the frame geometry
    pub fn geometry(mut self, geometry: FrameGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Set the broadcast interval
    pub fn send_interval(mut self, interval: Duration) -> Self {
        self.send_interval = interval;
        self
    }

    /// Set the per-session outbound queue capacity (at least one frame)
    pub fn outbound_capacity(mut self, frames: usize) -> Self {
        self.outbound_capacity = frames.max(1);
        self
    }

    /// Set the pre-identity buffering cap (at least one frame)
    pub fn max_pending_frames(mut self, frames: usize) -> Self {
        self.max_pending_frames = frames.max(1);
        self
    }

    /// Set the inbound read buffer size
    pub fn read_buffer_size(mut self, bytes: usize) -> Self {
        self.read_buffer_size = bytes.max(1);
        self
    }

    /// Set the stats reporting interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Disable rendering of the local capture
    pub fn disable_local_preview(mut self) -> Self {
        self.render_local_preview = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();

        assert_eq!(config.protocol_id, PROTOCOL_ID);
        assert_eq!(config.geometry.frame_len(), 128 * 128 * 4);
        assert_eq!(config.send_interval, Duration::from_millis(100));
        assert_eq!(config.outbound_capacity, DEFAULT_OUTBOUND_CAPACITY);
        assert_eq!(config.stats_interval, Duration::from_secs(2));
        assert!(config.render_local_preview);
    }

    #[test]
    fn test_builder_capacity_floor() {
        let config = NodeConfig::default()
            .outbound_capacity(0)
            .max_pending_frames(0)
            .read_buffer_size(0);

        assert_eq!(config.outbound_capacity, 1);
        assert_eq!(config.max_pending_frames, 1);
        assert_eq!(config.read_buffer_size, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let geometry = FrameGeometry::new(64, 48).unwrap();
        let config = NodeConfig::default()
            .protocol_id("/resort/0.1.0")
            .geometry(geometry)
            .send_interval(Duration::from_millis(40))
            .stats_interval(Duration::ZERO)
            .disable_local_preview();

        assert_eq!(config.protocol_id, "/resort/0.1.0");
        assert_eq!(config.geometry, geometry);
        assert_eq!(config.send_interval, Duration::from_millis(40));
        assert!(config.stats_interval.is_zero());
        assert!(!config.render_local_preview);
    }
}
