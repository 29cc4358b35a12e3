use std::collections::VecDeque;

use anyhow::Result;

use super::FrameSource;
use crate::frame::Frame;

/// Frames already decoded by the caller.
pub struct MemorySource {
    frames: VecDeque<Frame>,
    resolution: Option<(u32, u32)>,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>) -> Self {
        let resolution = frames.first().map(|f| f.dimensions());
        Self {
            frames: frames.into(),
            resolution,
        }
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        self.resolution
    }
}
