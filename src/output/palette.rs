use std::collections::HashMap;

use color_quant::NeuQuant;
use image::{Rgb, RgbImage, Rgba, RgbaImage};

use crate::error::{MatteError, Result};
use crate::frame::Matte;

/// GIF palettes hold at most this many entries.
pub const MAX_PALETTE_LEN: usize = 256;

/// NeuQuant sampling factor, 1 (best) to 30 (fastest).
const NEUQUANT_SAMPLE_FACTOR: i32 = 3;

/// Settings for converting a matte into an indexed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaletteOptions {
    /// Alpha at or below this is treated as fully transparent.
    pub alpha_cutoff: u8,
    /// Color painted under transparent pixels before quantizing.
    pub fill: [u8; 3],
    /// Palette size limit; one slot of the 256 is left for transparency.
    pub max_colors: usize,
    /// Fail instead of falling back to index 0 when the palette is full and
    /// no entry equals `fill`.
    pub strict_transparency: bool,
    pub disposal: Disposal,
}

impl Default for PaletteOptions {
    fn default() -> Self {
        Self {
            alpha_cutoff: 128,
            fill: [0, 0, 0],
            max_colors: 255,
            strict_transparency: false,
            disposal: Disposal::Replace,
        }
    }
}

/// What the player does with a frame before drawing the next one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Disposal {
    /// Leave it in place; the next frame is composited over it.
    Keep,
    /// Clear it; the next frame fully replaces it.
    #[default]
    Replace,
}

/// 8-bit indexed frame with one palette entry reserved for transparency.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaletteFrame {
    pub width: u32,
    pub height: u32,
    pub palette: Vec<[u8; 3]>,
    pub indices: Vec<u8>,
    pub transparent_index: u8,
    pub disposal: Disposal,
}

impl PaletteFrame {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Palette as packed RGB triples.
    pub fn palette_bytes(&self) -> Vec<u8> {
        self.palette.iter().flatten().copied().collect()
    }

    /// Decode back to RGBA; the transparent index becomes (0, 0, 0, 0).
    pub fn to_rgba(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let idx = self.indices[(y * self.width + x) as usize];
            if idx == self.transparent_index {
                return Rgba([0, 0, 0, 0]);
            }
            let [r, g, b] = self.palette[usize::from(idx)];
            Rgba([r, g, b, 255])
        })
    }
}

/// Encode a matte as an indexed frame.
///
/// Pixels with alpha at or below the cutoff are painted with the fill color
/// and the opaque result is quantized. The first palette entry equal to the
/// fill color becomes the transparency index. Without one, the fill color is
/// appended in the reserved slot. Only a full palette falls back to index 0,
/// or fails when `strict_transparency` is set.
pub fn encode_indexed(matte: &Matte, opts: &PaletteOptions) -> Result<PaletteFrame> {
    let _span = tracing::debug_span!("encode_indexed").entered();
    let (width, height) = matte.dimensions();
    if width == 0 || height == 0 {
        return Err(MatteError::invalid_frame("matte has no pixels"));
    }

    let flattened = RgbImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = matte.get_pixel(x, y).0;
        if a <= opts.alpha_cutoff {
            Rgb(opts.fill)
        } else {
            Rgb([r, g, b])
        }
    });

    let (mut palette, mut indices) = quantize(&flattened, opts.max_colors);

    let marker = match palette.iter().position(|c| *c == opts.fill) {
        Some(i) => Some(i),
        None if palette.len() < MAX_PALETTE_LEN => {
            palette.push(opts.fill);
            Some(palette.len() - 1)
        }
        None if opts.strict_transparency => return Err(MatteError::MissingFillColor(opts.fill)),
        None => None,
    };

    let transparent_index = match marker {
        Some(i) => {
            let i = i as u8;
            for (idx, p) in indices.iter_mut().zip(matte.pixels()) {
                if p[3] <= opts.alpha_cutoff {
                    *idx = i;
                }
            }
            i
        }
        None => {
            tracing::warn!(
                fill = ?opts.fill,
                palette_len = palette.len(),
                "palette is full and lacks the fill color, marking index 0 as transparent"
            );
            0
        }
    };

    Ok(PaletteFrame {
        width,
        height,
        palette,
        indices,
        transparent_index,
        disposal: opts.disposal,
    })
}

/// Reduce an image to at most `max_colors` (clamped to 1..=256) colors.
///
/// Images that already fit keep their exact colors, ordered by descending
/// frequency. Larger ones go through NeuQuant.
/// Returns the palette and one index per pixel in row-major order.
pub fn quantize(image: &RgbImage, max_colors: usize) -> (Vec<[u8; 3]>, Vec<u8>) {
    let max_colors = max_colors.clamp(1, MAX_PALETTE_LEN);

    let mut counts: HashMap<[u8; 3], u32> = HashMap::new();
    for p in image.pixels() {
        *counts.entry(p.0).or_default() += 1;
    }
    let mut histogram: Vec<([u8; 3], u32)> = counts.into_iter().collect();
    histogram.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut lookup: HashMap<[u8; 3], u8> = HashMap::with_capacity(histogram.len());
    let palette: Vec<[u8; 3]> = if histogram.len() <= max_colors {
        for (i, (color, _)) in histogram.iter().enumerate() {
            lookup.insert(*color, i as u8);
        }
        histogram.iter().map(|(c, _)| *c).collect()
    } else {
        let rgba: Vec<u8> = image
            .pixels()
            .flat_map(|Rgb([r, g, b])| [*r, *g, *b, 255])
            .collect();
        let nq = NeuQuant::new(NEUQUANT_SAMPLE_FACTOR, max_colors, &rgba);
        for (color, _) in &histogram {
            let [r, g, b] = *color;
            lookup.insert(*color, nq.index_of(&[r, g, b, 255]) as u8);
        }
        nq.color_map_rgb()
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect()
    };

    let indices = image.pixels().map(|p| lookup[&p.0]).collect();
    (palette, indices)
}
