use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use greenkey::capture::{FrameSource, ImageSequence};
use greenkey::output::{AnimationFileSink, OutputFormat, OutputSink, PaletteOptions, PngSequenceSink};
use greenkey::segmentation::{self, AlphaRefiner, ChromaRange, HsvColor};
use greenkey::{process_batch, run_pipeline, write_mattes, PipelineConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input frames (PNG, JPEG, ...), in presentation order
    #[arg(required = true)]
    frames: Vec<PathBuf>,

    /// Output path without extension; each format adds its own
    #[arg(short, long)]
    out: PathBuf,

    /// Animated formats to write (repeatable)
    #[arg(short, long = "format", value_enum, default_values_t = [OutputFormat::Apng, OutputFormat::Gif])]
    formats: Vec<OutputFormat>,

    /// Frame rate the input frames were captured at; enables resampling
    #[arg(long)]
    fps_in: Option<f64>,

    /// Output frame rate
    #[arg(long, default_value_t = 15)]
    fps_out: u32,

    /// Pixels to remove around the subject
    #[arg(long, default_value_t = 1)]
    shrink: u32,

    /// Softness of the new edge (blur radius)
    #[arg(long, default_value_t = 1)]
    feather: u32,

    /// Alpha at or below this counts as transparent before shrinking
    #[arg(long, default_value_t = 1)]
    alpha_thresh: u8,

    /// Alpha at or below this becomes the GIF transparent color
    #[arg(long, default_value_t = 128)]
    alpha_cutoff: u8,

    /// Lower HSV bound of the key color (hue 0-179)
    #[arg(long, default_value = "37,40,40")]
    lower: HsvColor,

    /// Upper HSV bound of the key color (hue 0-179)
    #[arg(long, default_value = "85,255,255")]
    upper: HsvColor,

    /// Animation loop count, 0 loops forever
    #[arg(long, default_value_t = 0)]
    loop_count: u16,

    /// Also save every matte as a PNG in this directory
    #[arg(long)]
    save_frames: Option<PathBuf>,

    /// With --save-frames, also save the alpha mask of each frame
    #[arg(long)]
    save_masks: bool,

    /// Fail when a GIF palette is full and has no entry for the fill color
    /// instead of marking index 0 transparent
    #[arg(long)]
    strict_transparency: bool,

    /// Matte frames in parallel on this many threads (loads all frames first)
    #[arg(long)]
    threads: Option<usize>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn config(&self) -> Result<PipelineConfig> {
        let chroma = ChromaRange::new(self.lower, self.upper).context("Invalid key color range")?;
        let mut formats = Vec::new();
        for format in &self.formats {
            if !formats.contains(format) {
                formats.push(*format);
            }
        }
        Ok(PipelineConfig {
            chroma,
            refine: AlphaRefiner::new(self.shrink, self.feather).with_alpha_thresh(self.alpha_thresh),
            palette: PaletteOptions {
                alpha_cutoff: self.alpha_cutoff,
                strict_transparency: self.strict_transparency,
                ..PaletteOptions::default()
            },
            formats,
            fps_out: self.fps_out,
            loop_count: self.loop_count,
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("greenkey starting");
    let config = args.config()?;
    config.validate()?;
    tracing::info!(
        "Key range: {:?}..={:?}, shrink={}, feather={}",
        config.chroma.lower,
        config.chroma.upper,
        config.refine.shrink_pixels,
        config.refine.feather
    );

    let mut source = ImageSequence::new(&args.frames);
    if let Some(fps_in) = args.fps_in {
        source = source.resampled(fps_in, f64::from(config.fps_out))?;
    }

    let mut sinks = build_sinks(&args, &config)?;
    let extractor = segmentation::create_default_extractor(config.chroma)?;

    let frame_count = match args.threads {
        Some(threads) => {
            let mut frames = Vec::with_capacity(source.remaining());
            while let Some(frame) = source.next_frame()? {
                frames.push(frame);
            }
            tracing::info!("Matting {} frames on {} threads", frames.len(), threads);
            let mattes = process_batch(&frames, &config, Some(threads))
                .context("Failed to matte frames")?;
            write_mattes(&mattes, &mut sinks, &config)?;
            mattes.len() as u64
        }
        None => run_pipeline(&mut source, extractor.as_ref(), &mut sinks, &config)?.frames,
    };

    tracing::info!("Done, {} frames", frame_count);
    Ok(())
}

fn build_sinks(args: &Args, config: &PipelineConfig) -> Result<Vec<Box<dyn OutputSink>>> {
    let mut sinks: Vec<Box<dyn OutputSink>> = Vec::new();
    for &format in &config.formats {
        let path = with_extension(&args.out, format.extension());
        tracing::info!("Output: {} ({:?})", path.display(), format);
        sinks.push(Box::new(AnimationFileSink::new(
            path,
            format,
            config.palette,
            config.loop_count,
        )));
    }
    if let Some(dir) = &args.save_frames {
        tracing::info!("Saving individual frames to {}", dir.display());
        sinks.push(Box::new(PngSequenceSink::new(dir, args.save_masks)?));
    }
    Ok(sinks)
}

fn with_extension(stem: &Path, extension: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}
