//! Error types
//!
//! Crate-wide error type plus the transport and frame errors it wraps.

use crate::protocol::PeerId;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error on a peer stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame construction or decoding failure
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}

/// Errors reported by a [`Transport`](crate::transport::Transport)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Dial to a peer failed
    #[error("Dial to {peer} failed: {reason}")]
    DialFailed { peer: PeerId, reason: String },

    /// The remote peer does not speak the requested protocol
    #[error("Peer {peer} does not support protocol {protocol}")]
    ProtocolNotSupported { peer: PeerId, protocol: String },

    /// The remote identity of an inbound connection could not be resolved
    #[error("Identity resolution failed: {0}")]
    IdentityResolution(String),

    /// Peer is not known to the transport
    #[error("Unknown peer: {0}")]
    UnknownPeer(PeerId),

    /// Event stream ended; the transport is gone
    #[error("Transport event stream closed")]
    EventStreamClosed,
}

/// Errors constructing or decoding frames
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Buffer length does not match the fixed frame geometry
    #[error("Frame size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Geometry with a zero dimension
    #[error("Invalid frame geometry {width}x{height}")]
    InvalidGeometry { width: u32, height: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::from(FrameError::SizeMismatch {
            expected: 16,
            actual: 12,
        });
        assert_eq!(
            err.to_string(),
            "Frame error: Frame size mismatch: expected 16 bytes, got 12"
        );

        let err = Error::from(TransportError::ProtocolNotSupported {
            peer: PeerId::new("QmPeer"),
            protocol: "/framemesh/0.1.0".into(),
        });
        assert!(err.to_string().contains("QmPeer"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
