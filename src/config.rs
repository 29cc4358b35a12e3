use crate::error::{MatteError, Result};
use crate::output::{OutputFormat, PaletteOptions};
use crate::segmentation::{AlphaRefiner, ChromaRange};

/// Everything one pipeline run needs. Built by the caller and passed in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    pub chroma: ChromaRange,
    pub refine: AlphaRefiner,
    pub palette: PaletteOptions,
    pub formats: Vec<OutputFormat>,
    /// Output frame rate; sets every frame's display duration.
    pub fps_out: u32,
    /// Container loop count, 0 = forever.
    pub loop_count: u16,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chroma: ChromaRange::default(),
            refine: AlphaRefiner::default(),
            palette: PaletteOptions::default(),
            formats: vec![OutputFormat::Apng, OutputFormat::Gif],
            fps_out: 15,
            loop_count: 0,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.chroma.validate()?;
        if self.fps_out == 0 {
            return Err(MatteError::config("output fps must be non-zero"));
        }
        Ok(())
    }

    /// Display time of one output frame, truncated to whole milliseconds.
    pub fn frame_duration_ms(&self) -> u32 {
        1000 / self.fps_out.max(1)
    }
}
