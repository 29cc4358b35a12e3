mod animation;
mod files;
pub mod palette;

pub use animation::{write_apng, write_gif, Animation, AnimationFrame};
pub use files::{AnimationFileSink, PngSequenceSink};
pub use palette::{encode_indexed, quantize, Disposal, PaletteFrame, PaletteOptions};

use anyhow::Result;

use crate::frame::Matte;

/// Animated container written by [`AnimationFileSink`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum OutputFormat {
    /// Animated PNG, full 8-bit alpha.
    Apng,
    /// Animated GIF, indexed color with one transparent entry.
    Gif,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Apng => "png",
            Self::Gif => "gif",
        }
    }

    pub fn is_indexed(self) -> bool {
        matches!(self, Self::Gif)
    }
}

/// A matte ready for a container: direct RGBA or palette-indexed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodedFrame {
    Rgba(Matte),
    Indexed(PaletteFrame),
}

impl EncodedFrame {
    /// Encode `matte` the way `format` needs it. RGBA output is the matte
    /// unchanged.
    pub fn encode(
        matte: &Matte,
        format: OutputFormat,
        opts: &PaletteOptions,
    ) -> crate::error::Result<Self> {
        if format.is_indexed() {
            encode_indexed(matte, opts).map(Self::Indexed)
        } else {
            Ok(Self::Rgba(matte.clone()))
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Rgba(m) => m.dimensions(),
            Self::Indexed(p) => p.dimensions(),
        }
    }
}

/// Trait for output destinations
pub trait OutputSink {
    /// Write a frame to the output, shown for `duration_ms`
    fn write_frame(&mut self, matte: &Matte, duration_ms: u32) -> Result<()>;

    /// Flush whatever was buffered. Called once after the last frame.
    fn finish(&mut self) -> Result<()>;
}
