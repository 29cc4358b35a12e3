use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};

use super::FrameSource;
use crate::frame::Frame;

/// Indices of the source frames to keep when resampling `frame_count` frames
/// recorded at `fps_in` to `fps_out`.
///
/// Output instants are `k / fps_out` for every instant before the end of the
/// clip; each picks the source frame shown at that time.
pub fn sample_indices(frame_count: usize, fps_in: f64, fps_out: f64) -> Vec<usize> {
    if frame_count == 0 || !(fps_in > 0.0) || !(fps_out > 0.0) {
        return Vec::new();
    }
    let duration = frame_count as f64 / fps_in;
    (0usize..)
        .map(|k| k as f64 / fps_out)
        .take_while(|&t| t < duration)
        .map(|t| ((t * fps_in + 1e-9).floor() as usize).min(frame_count - 1))
        .collect()
}

/// Decodes an explicit list of still images, one frame per file.
pub struct ImageSequence {
    paths: VecDeque<PathBuf>,
    resolution: Option<(u32, u32)>,
}

impl ImageSequence {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths: VecDeque<PathBuf> = paths
            .into_iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect();
        tracing::info!("Image sequence with {} frames", paths.len());
        Self {
            paths,
            resolution: None,
        }
    }

    /// Keep only the frames sampled at `fps_out` from a sequence recorded at
    /// `fps_in`.
    pub fn resampled(mut self, fps_in: f64, fps_out: f64) -> Result<Self> {
        ensure!(fps_in > 0.0, "input fps must be positive, got {fps_in}");
        ensure!(fps_out > 0.0, "output fps must be positive, got {fps_out}");

        let all: Vec<PathBuf> = self.paths.drain(..).collect();
        let picked = sample_indices(all.len(), fps_in, fps_out);
        tracing::info!(
            "Resampling {} frames from {} fps to {} fps ({} kept)",
            all.len(),
            fps_in,
            fps_out,
            picked.len()
        );
        self.paths = picked.into_iter().map(|i| all[i].clone()).collect();
        Ok(self)
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };

        let frame = image::open(&path)
            .with_context(|| format!("Failed to decode frame {}", path.display()))?
            .to_rgb8();

        match self.resolution {
            None => {
                tracing::debug!(
                    "Frame size {}x{} from {}",
                    frame.width(),
                    frame.height(),
                    path.display()
                );
                self.resolution = Some(frame.dimensions());
            }
            Some(expected) if expected != frame.dimensions() => {
                bail!(
                    "Frame {} is {}x{}, expected {}x{}",
                    path.display(),
                    frame.width(),
                    frame.height(),
                    expected.0,
                    expected.1
                );
            }
            Some(_) => {}
        }

        Ok(Some(frame))
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        self.resolution
    }
}
