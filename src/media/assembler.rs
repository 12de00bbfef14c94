//! Inbound frame assembly
//!
//! An inbound connection delivers raw bytes in arbitrary read-sized pieces and
//! its remote identity resolves asynchronously, possibly after the first bytes
//! have arrived. The assembler keeps the two phases explicit:
//!
//! ```text
//!   Buffering ──resolve(peer)──► Dispatching(peer)
//!      │                              │
//!   bytes accumulate,              whole frames are
//!   nothing is emitted             split off in order
//! ```
//!
//! Bytes buffered while the identity is unknown are emitted in their original
//! order once it resolves, exactly as if they had arrived afterwards.

use bytes::{Buf, BytesMut};

use super::frame::{FrameBuffer, FrameGeometry};
use crate::protocol::PeerId;

/// Phase of an inbound connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblerPhase {
    /// Identity unknown; bytes are held back
    Buffering,
    /// Identity known; complete frames are released for this peer
    Dispatching(PeerId),
}

/// Accumulates inbound bytes into fixed-size frames
#[derive(Debug)]
pub struct FrameAssembler {
    geometry: FrameGeometry,
    buffer: BytesMut,
    phase: AssemblerPhase,
    /// Cap on bytes held while buffering, in whole frames
    max_pending_frames: usize,
    /// Frames discarded because the buffering cap was exceeded
    dropped_frames: u64,
}

impl FrameAssembler {
    /// Create an assembler in the buffering phase
    pub fn new(geometry: FrameGeometry, max_pending_frames: usize) -> Self {
        Self {
            geometry,
            buffer: BytesMut::with_capacity(geometry.frame_len()),
            phase: AssemblerPhase::Buffering,
            max_pending_frames: max_pending_frames.max(1),
            dropped_frames: 0,
        }
    }

    pub fn phase(&self) -> &AssemblerPhase {
        &self.phase
    }

    /// The resolved peer, if any
    pub fn peer(&self) -> Option<&PeerId> {
        match &self.phase {
            AssemblerPhase::Dispatching(peer) => Some(peer),
            AssemblerPhase::Buffering => None,
        }
    }

    /// Bytes currently held
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Append received bytes
    ///
    /// While buffering, the oldest whole frames are discarded once the cap is
    /// exceeded. Discarding whole frames keeps the remaining bytes aligned to
    /// frame boundaries. Returns the number of frames discarded by this call.
    pub fn push(&mut self, data: &[u8]) -> usize {
        self.buffer.extend_from_slice(data);

        if self.phase != AssemblerPhase::Buffering {
            return 0;
        }

        let frame_len = self.geometry.frame_len();
        let cap = self.max_pending_frames * frame_len;
        if self.buffer.len() <= cap {
            return 0;
        }

        let excess = self.buffer.len() - cap;
        let frames = excess.div_ceil(frame_len);
        self.buffer.advance(frames * frame_len);
        self.dropped_frames += frames as u64;
        frames
    }

    /// Bind the connection to its remote identity
    ///
    /// Has no effect once already resolved.
    pub fn resolve(&mut self, peer: PeerId) {
        if self.phase == AssemblerPhase::Buffering {
            self.phase = AssemblerPhase::Dispatching(peer);
        }
    }

    /// Split off the next complete frame
    ///
    /// Returns `None` while buffering or when less than one frame is held.
    pub fn next_frame(&mut self) -> Option<FrameBuffer> {
        if self.phase == AssemblerPhase::Buffering {
            return None;
        }

        let frame_len = self.geometry.frame_len();
        if self.buffer.len() < frame_len {
            return None;
        }

        let data = self.buffer.split_to(frame_len).freeze();
        FrameBuffer::new(self.geometry, data).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> FrameGeometry {
        FrameGeometry::new(2, 1).unwrap() // 8 bytes per frame
    }

    fn collect(assembler: &mut FrameAssembler) -> Vec<Vec<u8>> {
        std::iter::from_fn(|| assembler.next_frame())
            .map(|f| f.data().to_vec())
            .collect()
    }

    #[test]
    fn test_nothing_emitted_before_resolution() {
        let mut assembler = FrameAssembler::new(geometry(), 4);
        assembler.push(&[1; 8]);
        assembler.push(&[2; 8]);

        assert_eq!(assembler.phase(), &AssemblerPhase::Buffering);
        assert!(assembler.next_frame().is_none());
        assert_eq!(assembler.buffered_len(), 16);
    }

    #[test]
    fn test_buffered_bytes_released_in_order() {
        let mut assembler = FrameAssembler::new(geometry(), 4);
        assembler.push(&[1; 5]);
        assembler.push(&[1, 1, 1, 2, 2]);

        assembler.resolve(PeerId::new("QmA"));
        assembler.push(&[2, 2, 2, 2, 2, 2]);

        let frames = collect(&mut assembler);
        assert_eq!(frames, vec![vec![1; 8], vec![2; 8]]);
        assert_eq!(assembler.peer(), Some(&PeerId::new("QmA")));
    }

    #[test]
    fn test_exact_concatenation_yields_n_frames() {
        let mut assembler = FrameAssembler::new(geometry(), 4);
        assembler.resolve(PeerId::new("QmA"));

        let mut stream = Vec::new();
        for i in 0..5u8 {
            stream.extend_from_slice(&[i; 8]);
        }
        // Deliver in awkward read sizes
        for chunk in stream.chunks(3) {
            assembler.push(chunk);
        }

        let frames = collect(&mut assembler);
        assert_eq!(frames.len(), 5);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame, &vec![i as u8; 8]);
        }
        assert_eq!(assembler.buffered_len(), 0);
    }

    #[test]
    fn test_leftover_bytes_kept() {
        let mut assembler = FrameAssembler::new(geometry(), 4);
        assembler.resolve(PeerId::new("QmA"));
        assembler.push(&[7; 11]);

        assert_eq!(collect(&mut assembler).len(), 1);
        assert_eq!(assembler.buffered_len(), 3);
    }

    #[test]
    fn test_pending_cap_drops_oldest_whole_frames() {
        let mut assembler = FrameAssembler::new(geometry(), 2);
        assembler.push(&[1; 8]);
        assembler.push(&[2; 8]);
        let dropped = assembler.push(&[3; 8]);

        assert_eq!(dropped, 1);
        assert_eq!(assembler.dropped_frames(), 1);

        assembler.resolve(PeerId::new("QmA"));
        assert_eq!(collect(&mut assembler), vec![vec![2; 8], vec![3; 8]]);
    }

    #[test]
    fn test_no_cap_after_resolution() {
        let mut assembler = FrameAssembler::new(geometry(), 1);
        assembler.resolve(PeerId::new("QmA"));
        assert_eq!(assembler.push(&[0; 32]), 0);
        assert_eq!(collect(&mut assembler).len(), 4);
    }

    #[test]
    fn test_resolve_is_sticky() {
        let mut assembler = FrameAssembler::new(geometry(), 1);
        assembler.resolve(PeerId::new("QmA"));
        assembler.resolve(PeerId::new("QmB"));
        assert_eq!(assembler.peer(), Some(&PeerId::new("QmA")));
    }
}
