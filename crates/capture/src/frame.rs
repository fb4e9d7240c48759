//! Decoded image frames

use crate::CaptureError;
use tracing::debug;

/// Decoded RGB image frame
///
/// Immutable once produced; moved by value into whichever component
/// consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    /// RGB pixel data (width * height * 3)
    data: Vec<u8>,
    /// Frame width
    width: u32,
    /// Frame height
    height: u32,
}

impl ImageHandle {
    /// Wrap an already-decoded RGB8 buffer.
    ///
    /// The buffer length must be exactly `width * height * 3` bytes.
    pub fn from_rgb8(data: Vec<u8>, width: u32, height: u32) -> Result<Self, CaptureError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(CaptureError::Decode(format!(
                "buffer length {} does not match {}x{} RGB frame ({} bytes)",
                data.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Decode an image byte buffer (PNG, JPEG, ...) into an RGB frame
    pub fn decode(bytes: &[u8]) -> Result<Self, CaptureError> {
        let img = image::load_from_memory(bytes).map_err(|e| CaptureError::Decode(e.to_string()))?;
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        debug!("Decoded {}x{} image from {} bytes", width, height, bytes.len());
        Ok(Self {
            data: rgb.into_raw(),
            width,
            height,
        })
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGB pixel data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// True when the handle holds no pixel data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.width == 0 || self.height == 0
    }

    /// Get pixel at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }
}
