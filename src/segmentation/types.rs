use crate::error::Result;
use crate::frame::{Frame, Matte};

/// Trait for matte producers.
/// Implementations are stateless per frame, so a single extractor can be
/// shared across worker threads.
pub trait MatteExtractor: Send + Sync {
    /// Process a frame and return an RGBA matte
    ///
    /// # Arguments
    /// * `frame` - Input RGB frame
    ///
    /// # Returns
    /// * Matte with the frame's color channels and an alpha channel in 0..=255,
    ///   same dimensions as `frame`
    fn extract(&self, frame: &Frame) -> Result<Matte>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}
