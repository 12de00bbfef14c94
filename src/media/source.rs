//! Local frame sources
//!
//! The capture device lives outside this crate. A [`FrameSource`] is polled
//! once per broadcast tick and may report that no frame is available yet,
//! for example while a camera is still initializing.

use bytes::BytesMut;

use super::frame::{FrameBuffer, FrameGeometry};

/// Produces the local frame for each broadcast tick
pub trait FrameSource: Send + 'static {
    /// Grab the current frame, or `None` if capture is not ready
    ///
    /// The returned frame should match `geometry`; frames that don't are
    /// rejected by the broadcast loop.
    fn capture_frame(&mut self, geometry: FrameGeometry) -> Option<FrameBuffer>;
}

impl<F> FrameSource for F
where
    F: FnMut(FrameGeometry) -> Option<FrameBuffer> + Send + 'static,
{
    fn capture_frame(&mut self, geometry: FrameGeometry) -> Option<FrameBuffer> {
        self(geometry)
    }
}

/// Synthetic moving gradient
///
/// Reports "not ready" for the first `warmup` polls to mimic a camera that
/// takes a moment to come up.
#[derive(Debug, Clone)]
pub struct TestPatternSource {
    warmup: u32,
    polls: u32,
    tick: u8,
    seed: u8,
}

impl TestPatternSource {
    /// Source that is ready immediately
    pub fn new(seed: u8) -> Self {
        Self {
            warmup: 0,
            polls: 0,
            tick: 0,
            seed,
        }
    }

    /// Report not-ready for the first `polls` captures
    pub fn with_warmup(mut self, polls: u32) -> Self {
        self.warmup = polls;
        self
    }
}

impl FrameSource for TestPatternSource {
    fn capture_frame(&mut self, geometry: FrameGeometry) -> Option<FrameBuffer> {
        if self.polls < self.warmup {
            self.polls += 1;
            return None;
        }

        let width = geometry.width() as usize;
        let mut data = BytesMut::with_capacity(geometry.frame_len());
        for y in 0..geometry.height() as usize {
            for x in 0..width {
                let r = (x as u8).wrapping_add(self.tick);
                let g = (y as u8).wrapping_add(self.seed);
                let b = self.tick.wrapping_mul(3);
                data.extend_from_slice(&[r, g, b, 0xFF]);
            }
        }
        self.tick = self.tick.wrapping_add(1);

        FrameBuffer::new(geometry, data.freeze()).ok()
    }
}
