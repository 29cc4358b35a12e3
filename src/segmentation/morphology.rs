use image::Luma;

use crate::frame::BinaryMask;

/// Offsets of the 3x3 elliptical structuring element. At this size the
/// ellipse degenerates to a cross.
const CROSS_3X3: [(i64, i64); 5] = [(0, -1), (-1, 0), (0, 0), (1, 0), (0, 1)];

/// How neighbours outside the mask are treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Border {
    /// Out-of-bounds neighbours are skipped, so edges neither erode nor grow.
    Ignore,
    /// Out-of-bounds neighbours count as background (0).
    Background,
}

#[derive(Clone, Copy)]
enum Op {
    Erode,
    Dilate,
}

fn apply(mask: &BinaryMask, op: Op, border: Border) -> BinaryMask {
    let (w, h) = mask.dimensions();
    let (wi, hi) = (i64::from(w), i64::from(h));

    BinaryMask::from_fn(w, h, |x, y| {
        let mut acc = match op {
            Op::Erode => u8::MAX,
            Op::Dilate => u8::MIN,
        };
        for (dx, dy) in CROSS_3X3 {
            let (sx, sy) = (i64::from(x) + dx, i64::from(y) + dy);
            let value = if sx < 0 || sy < 0 || sx >= wi || sy >= hi {
                match border {
                    Border::Ignore => continue,
                    Border::Background => 0,
                }
            } else {
                mask.get_pixel(sx as u32, sy as u32)[0]
            };
            acc = match op {
                Op::Erode => acc.min(value),
                Op::Dilate => acc.max(value),
            };
        }
        Luma([acc])
    })
}

pub fn erode(mask: &BinaryMask, iterations: u32, border: Border) -> BinaryMask {
    let mut out = mask.clone();
    for _ in 0..iterations {
        out = apply(&out, Op::Erode, border);
    }
    out
}

pub fn dilate(mask: &BinaryMask, iterations: u32, border: Border) -> BinaryMask {
    let mut out = mask.clone();
    for _ in 0..iterations {
        out = apply(&out, Op::Dilate, border);
    }
    out
}

/// Erosion followed by dilation. Removes foreground islands too thin to
/// survive the erosion.
pub fn open(mask: &BinaryMask, border: Border) -> BinaryMask {
    dilate(&erode(mask, 1, border), 1, border)
}

/// Number of pixels equal to 255.
pub fn count_set(mask: &BinaryMask) -> usize {
    mask.pixels().filter(|p| p[0] == u8::MAX).count()
}
