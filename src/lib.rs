//! Green-screen matting for frame sequences.
//!
//! Frames come from a [`capture::FrameSource`], get a chroma-key matte from a
//! [`segmentation::MatteExtractor`], have their alpha shrunk and feathered by
//! [`segmentation::AlphaRefiner`], and go out through
//! [`output::OutputSink`]s as animated PNG or palette GIF.

pub mod capture;
pub mod config;
pub mod error;
pub mod frame;
pub mod output;
pub mod pipeline;
pub mod segmentation;

pub use config::PipelineConfig;
pub use error::{MatteError, Result};
pub use frame::{BinaryMask, Frame, Matte};
pub use pipeline::{process_batch, process_frame, run_pipeline, write_mattes, PipelineStats};
