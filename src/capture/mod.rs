mod image_sequence;
mod memory;

pub use image_sequence::{sample_indices, ImageSequence};
pub use memory::MemorySource;

use anyhow::Result;

use crate::frame::Frame;

/// Trait for frame sources
pub trait FrameSource {
    /// Next frame in presentation order, `None` once the source is exhausted
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Resolution of the frames, once known
    fn resolution(&self) -> Option<(u32, u32)>;
}
