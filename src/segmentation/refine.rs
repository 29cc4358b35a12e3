use image::{Luma, Rgba};

use super::blur::gaussian_blur_mask;
use super::morphology::{erode, Border};
use crate::frame::{BinaryMask, Matte};

/// Shrinks and feathers a matte's alpha to hide key-color fringing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlphaRefiner {
    /// Pixels eroded off the foreground boundary.
    pub shrink_pixels: u32,
    /// Blur radius; the kernel is `2 * feather + 1` wide.
    pub feather: u32,
    /// Alpha at or below this counts as transparent when re-binarizing.
    pub alpha_thresh: u8,
}

impl Default for AlphaRefiner {
    fn default() -> Self {
        Self {
            shrink_pixels: 1,
            feather: 1,
            alpha_thresh: 1,
        }
    }
}

impl AlphaRefiner {
    pub fn new(shrink_pixels: u32, feather: u32) -> Self {
        Self {
            shrink_pixels,
            feather,
            ..Self::default()
        }
    }

    pub fn with_alpha_thresh(mut self, alpha_thresh: u8) -> Self {
        self.alpha_thresh = alpha_thresh;
        self
    }

    /// True when refinement only re-binarizes the alpha.
    pub fn is_noop(&self) -> bool {
        self.shrink_pixels == 0 && self.feather == 0
    }

    pub fn kernel_size(&self) -> u32 {
        self.feather.saturating_mul(2).saturating_add(1).max(1)
    }

    /// Refined alpha only.
    pub fn refine_alpha(&self, matte: &Matte) -> BinaryMask {
        let binary = BinaryMask::from_fn(matte.width(), matte.height(), |x, y| {
            Luma([if matte.get_pixel(x, y)[3] > self.alpha_thresh {
                255
            } else {
                0
            }])
        });

        let shrunk = if self.shrink_pixels > 0 {
            erode(&binary, self.shrink_pixels, Border::Background)
        } else {
            binary
        };

        if self.feather > 0 {
            gaussian_blur_mask(&shrunk, self.kernel_size())
        } else {
            shrunk
        }
    }

    /// Returns a new matte with refined alpha and colors premultiplied by it.
    pub fn refine(&self, matte: &Matte) -> Matte {
        let _span = tracing::debug_span!(
            "refine_alpha",
            shrink = self.shrink_pixels,
            feather = self.feather
        )
        .entered();

        let alpha = self.refine_alpha(matte);
        Matte::from_fn(matte.width(), matte.height(), |x, y| {
            let [r, g, b, _] = matte.get_pixel(x, y).0;
            let a = alpha.get_pixel(x, y)[0];
            Rgba([premultiply(r, a), premultiply(g, a), premultiply(b, a), a])
        })
    }
}

fn premultiply(c: u8, a: u8) -> u8 {
    let scaled = (u32::from(c) * u32::from(a) + 127) / 255;
    scaled.min(255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::morphology::count_set;

    fn opaque(w: u32, h: u32, rgb: [u8; 3]) -> Matte {
        Matte::from_pixel(w, h, Rgba([rgb[0], rgb[1], rgb[2], 255]))
    }

    fn disc(size: u32) -> Matte {
        let c = (size / 2) as i64;
        let r2 = (c - 1) * (c - 1);
        Matte::from_fn(size, size, |x, y| {
            let (dx, dy) = (x as i64 - c, y as i64 - c);
            let a = if dx * dx + dy * dy <= r2 { 255 } else { 0 };
            Rgba([90, 160, 220, a])
        })
    }

    #[test]
    fn shrink_one_clears_outer_ring() {
        let out = AlphaRefiner::new(1, 0).refine(&opaque(10, 10, [50, 60, 70]));
        for (x, y, p) in out.enumerate_pixels() {
            let edge = x == 0 || y == 0 || x == 9 || y == 9;
            assert_eq!(p[3], if edge { 0 } else { 255 }, "pixel ({x},{y})");
            if edge {
                assert_eq!([p[0], p[1], p[2]], [0, 0, 0]);
            } else {
                assert_eq!([p[0], p[1], p[2]], [50, 60, 70]);
            }
        }
    }

    #[test]
    fn noop_rebinarizes_only() {
        let matte = Matte::from_fn(3, 1, |x, _| Rgba([100, 100, 100, [0, 1, 2][x as usize]]));
        let out = AlphaRefiner::new(0, 0).refine(&matte);
        let alphas: Vec<u8> = out.pixels().map(|p| p[3]).collect();
        assert_eq!(alphas, vec![0, 0, 255]);
        assert_eq!(out.get_pixel(2, 0).0, [100, 100, 100, 255]);
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn noop_is_idempotent() {
        let refiner = AlphaRefiner::new(0, 0);
        let once = refiner.refine(&AlphaRefiner::new(2, 3).refine(&disc(16)));
        let twice = refiner.refine(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn larger_shrink_never_grows_foreground() {
        let matte = disc(21);
        let mut last = usize::MAX;
        for shrink in 0..5 {
            let alpha = AlphaRefiner::new(shrink, 0).refine_alpha(&matte);
            let n = count_set(&alpha);
            assert!(n <= last, "shrink {shrink}: {n} > {last}");
            last = n;
        }
    }

    #[test]
    fn feather_softens_the_edge() {
        let out = AlphaRefiner::new(0, 2).refine(&disc(21));
        let partial = out.pixels().filter(|p| p[3] > 0 && p[3] < 255).count();
        assert!(partial > 0);
        assert_eq!(AlphaRefiner::new(0, 2).kernel_size(), 5);
    }

    #[test]
    fn default_feather_gives_quarter_steps_at_a_hard_edge() {
        let matte = Matte::from_fn(8, 1, |x, _| {
            if x < 4 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([200, 200, 200, 255])
            }
        });
        let alpha = AlphaRefiner::new(0, 1).refine_alpha(&matte);
        let row: Vec<u8> = alpha.pixels().map(|p| p[0]).collect();
        assert_eq!(row, vec![0, 0, 0, 64, 191, 255, 255, 255]);
    }

    #[test]
    fn premultiplied_colors_never_exceed_input() {
        let matte = disc(15);
        let out = AlphaRefiner::new(1, 2).refine(&matte);
        for (src, dst) in matte.pixels().zip(out.pixels()) {
            for c in 0..3 {
                assert!(dst[c] <= src[c]);
            }
        }
    }

    #[test]
    fn input_is_not_mutated() {
        let matte = disc(9);
        let copy = matte.clone();
        let _ = AlphaRefiner::default().refine(&matte);
        assert_eq!(matte, copy);
    }

    #[test]
    fn premultiply_rounds_to_nearest() {
        assert_eq!(premultiply(255, 255), 255);
        assert_eq!(premultiply(200, 0), 0);
        assert_eq!(premultiply(255, 128), 128);
        assert_eq!(premultiply(3, 128), 2);
    }
}
