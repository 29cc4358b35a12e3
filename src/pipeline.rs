use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::capture::FrameSource;
use crate::config::PipelineConfig;
use crate::error::MatteError;
use crate::frame::{Frame, Matte};
use crate::output::OutputSink;
use crate::segmentation::{AlphaRefiner, ChromaKeyExtractor, MatteExtractor};

/// Extract a matte from one frame and refine its alpha.
pub fn process_frame(
    frame: &Frame,
    extractor: &dyn MatteExtractor,
    refiner: &AlphaRefiner,
) -> crate::error::Result<Matte> {
    let matte = extractor.extract(frame)?;
    Ok(refiner.refine(&matte))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames: u64,
    pub extract_time: Duration,
    pub output_time: Duration,
}

/// Pull every frame from `source`, matte it, and hand it to each sink in
/// source order. Stops at the first error; sinks are finished only after
/// the whole sequence went through.
pub fn run_pipeline<S>(
    source: &mut S,
    extractor: &dyn MatteExtractor,
    sinks: &mut [Box<dyn OutputSink>],
    config: &PipelineConfig,
) -> Result<PipelineStats>
where
    S: FrameSource + ?Sized,
{
    config.validate()?;
    let duration_ms = config.frame_duration_ms();
    let mut stats = PipelineStats::default();

    tracing::info!(
        "Starting pipeline: extractor={}, shrink={}, feather={}, {} ms/frame",
        extractor.name(),
        config.refine.shrink_pixels,
        config.refine.feather,
        duration_ms
    );
    if config.refine.is_noop() {
        tracing::debug!("Shrink and feather disabled, alpha is only re-binarized");
    }

    while let Some(frame) = source
        .next_frame()
        .with_context(|| format!("Failed to read frame {}", stats.frames))?
    {
        let extract_start = Instant::now();
        let matte = process_frame(&frame, extractor, &config.refine)
            .with_context(|| format!("Failed to matte frame {}", stats.frames))?;
        stats.extract_time += extract_start.elapsed();

        let output_start = Instant::now();
        for sink in sinks.iter_mut() {
            sink.write_frame(&matte, duration_ms)
                .with_context(|| format!("Failed to write frame {}", stats.frames))?;
        }
        stats.output_time += output_start.elapsed();

        stats.frames += 1;

        // Log stats every 30 frames
        if stats.frames % 30 == 0 {
            let n = stats.frames as f64;
            tracing::info!(
                "Frame {}: matte={:.1}ms, output={:.1}ms",
                stats.frames,
                stats.extract_time.as_secs_f64() * 1000.0 / n,
                stats.output_time.as_secs_f64() * 1000.0 / n
            );
        }
    }

    if stats.frames == 0 {
        tracing::warn!("Frame source produced no frames");
    }

    for sink in sinks.iter_mut() {
        sink.finish().context("Failed to finish output")?;
    }

    tracing::info!("Processed {} frames", stats.frames);
    Ok(stats)
}

/// Hand already matted frames to every sink in order, then finish the sinks.
pub fn write_mattes(
    mattes: &[Matte],
    sinks: &mut [Box<dyn OutputSink>],
    config: &PipelineConfig,
) -> Result<()> {
    config.validate()?;
    let duration_ms = config.frame_duration_ms();
    for (i, matte) in mattes.iter().enumerate() {
        for sink in sinks.iter_mut() {
            sink.write_frame(matte, duration_ms)
                .with_context(|| format!("Failed to write frame {i}"))?;
        }
    }
    for sink in sinks.iter_mut() {
        sink.finish().context("Failed to finish output")?;
    }
    Ok(())
}

/// Matte a batch of frames on a dedicated thread pool. Output order matches
/// input order. `threads = None` uses rayon's default worker count.
pub fn process_batch(
    frames: &[Frame],
    config: &PipelineConfig,
    threads: Option<usize>,
) -> crate::error::Result<Vec<Matte>> {
    config.validate()?;
    let extractor = ChromaKeyExtractor::new(config.chroma)?;
    let pool = build_thread_pool(threads)?;

    pool.install(|| {
        frames
            .par_iter()
            .map(|frame| process_frame(frame, &extractor, &config.refine))
            .collect()
    })
}

fn build_thread_pool(threads: Option<usize>) -> crate::error::Result<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(MatteError::config("thread count must be >= 1 when set"));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| MatteError::config(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::MemorySource;
    use image::Rgb;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorded {
        frames: Vec<(Matte, u32)>,
        finished: bool,
    }

    struct RecordingSink(Rc<RefCell<Recorded>>);

    impl OutputSink for RecordingSink {
        fn write_frame(&mut self, matte: &Matte, duration_ms: u32) -> Result<()> {
            self.0.borrow_mut().frames.push((matte.clone(), duration_ms));
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.0.borrow_mut().finished = true;
            Ok(())
        }
    }

    fn subject(w: u32, h: u32, shade: u8) -> Frame {
        Frame::from_fn(w, h, |x, y| {
            if (2..w - 2).contains(&x) && (2..h - 2).contains(&y) {
                Rgb([shade, 20, 30])
            } else {
                Rgb([0, 255, 0])
            }
        })
    }

    #[test]
    fn noop_refiner_still_clears_background_color() {
        let frame = subject(12, 10, 200);
        let matte =
            process_frame(&frame, &ChromaKeyExtractor::default(), &AlphaRefiner::new(0, 0))
                .unwrap();
        assert_eq!(matte.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(matte.get_pixel(5, 5).0, [200, 20, 30, 255]);
    }

    #[test]
    fn frames_reach_every_sink_in_order() {
        let frames: Vec<Frame> = (0..3).map(|i| subject(10, 10, 100 + i * 50)).collect();
        let mut source = MemorySource::new(frames);
        let a = Rc::new(RefCell::new(Recorded::default()));
        let b = Rc::new(RefCell::new(Recorded::default()));
        let mut sinks: Vec<Box<dyn OutputSink>> = vec![
            Box::new(RecordingSink(a.clone())),
            Box::new(RecordingSink(b.clone())),
        ];

        let config = PipelineConfig {
            fps_out: 10,
            refine: AlphaRefiner::new(0, 0),
            ..PipelineConfig::default()
        };
        let stats = run_pipeline(
            &mut source,
            &ChromaKeyExtractor::default(),
            &mut sinks,
            &config,
        )
        .unwrap();

        assert_eq!(stats.frames, 3);
        for rec in [a, b] {
            let rec = rec.borrow();
            assert!(rec.finished);
            assert_eq!(rec.frames.len(), 3);
            for (i, (matte, duration)) in rec.frames.iter().enumerate() {
                assert_eq!(*duration, 100);
                assert_eq!(matte.get_pixel(5, 5)[0], 100 + i as u8 * 50);
                assert_eq!(matte.get_pixel(5, 5)[3], 255);
                assert_eq!(matte.get_pixel(0, 0)[3], 0);
            }
        }
    }

    #[test]
    fn invalid_frame_aborts_the_run() {
        let mut source = MemorySource::new(vec![subject(8, 8, 90), Frame::new(0, 0)]);
        let rec = Rc::new(RefCell::new(Recorded::default()));
        let mut sinks: Vec<Box<dyn OutputSink>> = vec![Box::new(RecordingSink(rec.clone()))];

        let err = run_pipeline(
            &mut source,
            &ChromaKeyExtractor::default(),
            &mut sinks,
            &PipelineConfig::default(),
        )
        .unwrap_err();

        assert!(format!("{err:#}").contains("invalid frame"));
        assert_eq!(rec.borrow().frames.len(), 1);
        assert!(!rec.borrow().finished);
    }

    #[test]
    fn batch_matches_sequential_order() {
        let frames: Vec<Frame> = (0..6).map(|i| subject(9, 9, 60 + i * 30)).collect();
        let config = PipelineConfig::default();
        let parallel = process_batch(&frames, &config, Some(3)).unwrap();

        let extractor = ChromaKeyExtractor::new(config.chroma).unwrap();
        for (frame, got) in frames.iter().zip(&parallel) {
            let expected = process_frame(frame, &extractor, &config.refine).unwrap();
            assert_eq!(&expected, got);
        }
    }

    #[test]
    fn write_mattes_delivers_then_finishes() {
        let mattes = process_batch(&[subject(8, 8, 120)], &PipelineConfig::default(), None).unwrap();
        let rec = Rc::new(RefCell::new(Recorded::default()));
        let mut sinks: Vec<Box<dyn OutputSink>> = vec![Box::new(RecordingSink(rec.clone()))];
        write_mattes(&mattes, &mut sinks, &PipelineConfig::default()).unwrap();
        assert_eq!(rec.borrow().frames.len(), 1);
        assert_eq!(rec.borrow().frames[0].1, 66);
        assert!(rec.borrow().finished);
    }

    #[test]
    fn zero_threads_is_rejected() {
        let err = process_batch(&[], &PipelineConfig::default(), Some(0)).unwrap_err();
        assert!(matches!(err, MatteError::InvalidConfig(_)));
    }
}
