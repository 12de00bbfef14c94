//! Raw RGBA frame types
//!
//! Frames travel on the wire as exactly `width * height * 4` bytes with no
//! header. The receiver relies purely on byte count, so the geometry is fixed
//! for the lifetime of a node.

use bytes::Bytes;

use crate::error::FrameError;
use crate::protocol::constants::{BYTES_PER_PIXEL, DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH};

/// Fixed frame dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    width: u32,
    height: u32,
}

impl FrameGeometry {
    /// Create a geometry, rejecting zero dimensions
    pub fn new(width: u32, height: u32) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::InvalidGeometry { width, height });
        }
        Ok(Self { width, height })
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of bytes in one frame on the wire
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }
}

impl Default for FrameGeometry {
    fn default() -> Self {
        Self {
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
        }
    }
}

/// One raw RGBA frame
///
/// Cloning is cheap: the pixel data is reference counted, so fanning a frame
/// out to many sessions never copies the pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    geometry: FrameGeometry,
    data: Bytes,
}

impl FrameBuffer {
    /// Wrap pixel data, checking it matches the geometry exactly
    pub fn new(geometry: FrameGeometry, data: impl Into<Bytes>) -> Result<Self, FrameError> {
        let data = data.into();
        let expected = geometry.frame_len();
        if data.len() != expected {
            return Err(FrameError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { geometry, data })
    }

    /// A frame filled with a single RGBA color
    pub fn solid(geometry: FrameGeometry, rgba: [u8; 4]) -> Self {
        let data: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take(geometry.frame_len())
            .collect();
        Self {
            geometry,
            data: Bytes::from(data),
        }
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Raw pixel bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Consume the frame, returning its pixel bytes
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry() {
        let geometry = FrameGeometry::default();
        assert_eq!(geometry.width(), 128);
        assert_eq!(geometry.height(), 128);
        assert_eq!(geometry.frame_len(), 128 * 128 * 4);
    }

    #[test]
    fn test_zero_geometry_rejected() {
        assert!(matches!(
            FrameGeometry::new(0, 10),
            Err(FrameError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn test_size_mismatch() {
        let geometry = FrameGeometry::new(2, 2).unwrap();
        let result = FrameBuffer::new(geometry, vec![0u8; 15]);
        assert_eq!(
            result,
            Err(FrameError::SizeMismatch {
                expected: 16,
                actual: 15
            })
        );

        let frame = FrameBuffer::new(geometry, vec![0u8; 16]).unwrap();
        assert_eq!(frame.len(), 16);
    }

    #[test]
    fn test_solid_frame() {
        let geometry = FrameGeometry::new(2, 1).unwrap();
        let frame = FrameBuffer::solid(geometry, [1, 2, 3, 255]);
        assert_eq!(&frame.data()[..], &[1, 2, 3, 255, 1, 2, 3, 255]);
    }
}
