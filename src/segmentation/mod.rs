mod blur;
mod chroma;
pub mod hsv;
pub mod morphology;
mod refine;
pub mod types;

pub use blur::gaussian_blur_mask;
pub use chroma::ChromaKeyExtractor;
pub use hsv::{rgb_to_hsv, ChromaRange, HsvColor};
pub use morphology::Border;
pub use refine::AlphaRefiner;
pub use types::MatteExtractor;

use crate::error::Result;

/// Create the default extractor (green screen)
pub fn create_default_extractor(range: ChromaRange) -> Result<Box<dyn MatteExtractor>> {
    let extractor = ChromaKeyExtractor::new(range)?;
    Ok(Box::new(extractor))
}
