use image::{Luma, Rgba};

use super::hsv::{rgb_to_hsv, ChromaRange};
use super::morphology::{open, Border};
use super::types::MatteExtractor;
use crate::error::Result;
use crate::frame::{validate_frame, BinaryMask, Frame, Matte};

/// Chroma-key matte extractor.
///
/// Pixels whose HSV value falls inside the key range become background,
/// everything else foreground. One opening pass then clears isolated
/// foreground speckles.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChromaKeyExtractor {
    range: ChromaRange,
}

impl ChromaKeyExtractor {
    pub fn new(range: ChromaRange) -> Result<Self> {
        range.validate()?;
        Ok(Self { range })
    }

    pub fn range(&self) -> ChromaRange {
        self.range
    }

    /// Foreground mask before the opening pass: 255 where the pixel is
    /// outside the key range.
    pub fn raw_mask(&self, frame: &Frame) -> BinaryMask {
        BinaryMask::from_fn(frame.width(), frame.height(), |x, y| {
            let hsv = rgb_to_hsv(frame.get_pixel(x, y).0);
            Luma([if self.range.contains(hsv) { 0 } else { 255 }])
        })
    }

    pub fn foreground_mask(&self, frame: &Frame) -> BinaryMask {
        open(&self.raw_mask(frame), Border::Ignore)
    }
}

impl MatteExtractor for ChromaKeyExtractor {
    fn extract(&self, frame: &Frame) -> Result<Matte> {
        let _span = tracing::debug_span!("chroma_key").entered();
        validate_frame(frame)?;

        let mask = self.foreground_mask(frame);
        Ok(Matte::from_fn(frame.width(), frame.height(), |x, y| {
            let [r, g, b] = frame.get_pixel(x, y).0;
            Rgba([r, g, b, mask.get_pixel(x, y)[0]])
        }))
    }

    fn name(&self) -> &'static str {
        "chroma_key"
    }
}
