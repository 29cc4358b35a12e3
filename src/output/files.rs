use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::animation::{write_apng, write_gif, Animation};
use super::{EncodedFrame, OutputFormat, OutputSink, PaletteOptions};
use crate::frame::{matte_to_gray, Matte};

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    Ok(())
}

/// Collects encoded frames and writes one animated file on `finish`.
pub struct AnimationFileSink {
    path: PathBuf,
    format: OutputFormat,
    palette: PaletteOptions,
    animation: Animation,
}

impl AnimationFileSink {
    pub fn new<P: AsRef<Path>>(
        path: P,
        format: OutputFormat,
        palette: PaletteOptions,
        loop_count: u16,
    ) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format,
            palette,
            animation: Animation::new(loop_count),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frame_count(&self) -> usize {
        self.animation.len()
    }
}

impl OutputSink for AnimationFileSink {
    fn write_frame(&mut self, matte: &Matte, duration_ms: u32) -> Result<()> {
        let encoded = EncodedFrame::encode(matte, self.format, &self.palette)
            .with_context(|| format!("Failed to encode frame {}", self.animation.len()))?;
        self.animation.push(encoded, duration_ms)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        ensure_parent_dir(&self.path)?;
        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;
        let writer = BufWriter::new(file);

        let written = match self.format {
            OutputFormat::Gif => write_gif(&self.animation, writer),
            OutputFormat::Apng => write_apng(&self.animation, writer),
        };
        written.with_context(|| format!("Failed to write {}", self.path.display()))?;

        tracing::info!(
            "Wrote {} frames to {}",
            self.animation.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Writes every matte as its own PNG (`frame_00000.png`, ...), optionally
/// with a grayscale alpha mask next to it.
pub struct PngSequenceSink {
    dir: PathBuf,
    save_masks: bool,
    next_index: usize,
}

impl PngSequenceSink {
    pub fn new<P: AsRef<Path>>(dir: P, save_masks: bool) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create frame directory {}", dir.display()))?;
        Ok(Self {
            dir,
            save_masks,
            next_index: 0,
        })
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("frame_{index:05}.png"))
    }

    pub fn mask_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("mask_{index:05}.png"))
    }
}

impl OutputSink for PngSequenceSink {
    fn write_frame(&mut self, matte: &Matte, _duration_ms: u32) -> Result<()> {
        let path = self.frame_path(self.next_index);
        matte
            .save(&path)
            .with_context(|| format!("Failed to save {}", path.display()))?;

        if self.save_masks {
            let mask_path = self.mask_path(self.next_index);
            matte_to_gray(matte)
                .save(&mask_path)
                .with_context(|| format!("Failed to save {}", mask_path.display()))?;
        }

        self.next_index += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        tracing::info!("Saved {} frames to {}", self.next_index, self.dir.display());
        Ok(())
    }
}
