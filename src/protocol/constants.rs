//! Protocol constants

use std::time::Duration;

/// Application protocol negotiated on top of the transport's multiplexer
pub const PROTOCOL_ID: &str = "/framemesh/0.1.0";

/// Default frame width in pixels
pub const DEFAULT_FRAME_WIDTH: u32 = 128;

/// Default frame height in pixels
pub const DEFAULT_FRAME_HEIGHT: u32 = 128;

/// RGBA
pub const BYTES_PER_PIXEL: usize = 4;

/// Default delay between broadcast ticks
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(100);

/// Default number of frames buffered per outbound session
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 8;

/// Default number of frames held for a connection whose identity is unresolved
pub const DEFAULT_MAX_PENDING_FRAMES: usize = 32;

/// Default interval for peer count reporting
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(2);
