use std::borrow::Cow;
use std::io::Write;

use super::palette::Disposal;
use super::EncodedFrame;
use crate::error::{MatteError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimationFrame {
    pub image: EncodedFrame,
    pub duration_ms: u32,
}

/// Ordered frames plus a container-level loop count (0 = forever).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Animation {
    loop_count: u16,
    frames: Vec<AnimationFrame>,
}

impl Animation {
    pub fn new(loop_count: u16) -> Self {
        Self {
            loop_count,
            frames: Vec::new(),
        }
    }

    /// Append a frame. All frames must share the first frame's size.
    pub fn push(&mut self, image: EncodedFrame, duration_ms: u32) -> Result<()> {
        if let Some(expected) = self.dimensions() {
            let got = image.dimensions();
            if got != expected {
                return Err(MatteError::invalid_frame(format!(
                    "frame {} is {}x{}, animation is {}x{}",
                    self.frames.len(),
                    got.0,
                    got.1,
                    expected.0,
                    expected.1
                )));
            }
        }
        self.frames.push(AnimationFrame { image, duration_ms });
        Ok(())
    }

    pub fn loop_count(&self) -> u16 {
        self.loop_count
    }

    pub fn frames(&self) -> &[AnimationFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.frames.first().map(|f| f.image.dimensions())
    }

    fn checked_dimensions(&self) -> Result<(u32, u32)> {
        self.dimensions()
            .ok_or_else(|| MatteError::encode("animation has no frames"))
    }
}

fn gif_err(e: impl std::fmt::Display) -> MatteError {
    MatteError::encode(format!("gif: {e}"))
}

fn png_err(e: impl std::fmt::Display) -> MatteError {
    MatteError::encode(format!("png: {e}"))
}

/// GIF delays are in hundredths of a second.
fn centiseconds(duration_ms: u32) -> u16 {
    ((duration_ms + 5) / 10).min(u32::from(u16::MAX)) as u16
}

/// Serialize as an animated GIF. Every frame must be indexed.
pub fn write_gif<W: Write>(animation: &Animation, writer: W) -> Result<()> {
    let (width, height) = animation.checked_dimensions()?;
    let width = u16::try_from(width).map_err(|_| gif_err("width exceeds 65535"))?;
    let height = u16::try_from(height).map_err(|_| gif_err("height exceeds 65535"))?;

    let mut encoder = gif::Encoder::new(writer, width, height, &[]).map_err(gif_err)?;
    let repeat = match animation.loop_count {
        0 => gif::Repeat::Infinite,
        n => gif::Repeat::Finite(n),
    };
    encoder.set_repeat(repeat).map_err(gif_err)?;

    for (i, frame) in animation.frames.iter().enumerate() {
        let EncodedFrame::Indexed(indexed) = &frame.image else {
            return Err(MatteError::encode(format!(
                "gif frame {i} is not palette-indexed"
            )));
        };
        let out = gif::Frame {
            width,
            height,
            delay: centiseconds(frame.duration_ms),
            dispose: match indexed.disposal {
                Disposal::Keep => gif::DisposalMethod::Keep,
                Disposal::Replace => gif::DisposalMethod::Background,
            },
            transparent: Some(indexed.transparent_index),
            palette: Some(indexed.palette_bytes()),
            buffer: Cow::Borrowed(&indexed.indices),
            ..gif::Frame::default()
        };
        encoder.write_frame(&out).map_err(gif_err)?;
    }

    encoder.into_inner().map_err(gif_err)?;
    Ok(())
}

/// Serialize as an animated PNG. Indexed frames are expanded back to RGBA.
pub fn write_apng<W: Write>(animation: &Animation, writer: W) -> Result<()> {
    let (width, height) = animation.checked_dimensions()?;
    let frame_count = u32::try_from(animation.len()).map_err(png_err)?;

    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder
        .set_animated(frame_count, u32::from(animation.loop_count))
        .map_err(png_err)?;

    let mut writer = encoder.write_header().map_err(png_err)?;
    for frame in &animation.frames {
        let delay_ms = frame.duration_ms.min(u32::from(u16::MAX)) as u16;
        writer.set_frame_delay(delay_ms, 1000).map_err(png_err)?;
        writer.set_blend_op(png::BlendOp::Source).map_err(png_err)?;
        writer.set_dispose_op(png::DisposeOp::None).map_err(png_err)?;

        let written = match &frame.image {
            EncodedFrame::Rgba(matte) => writer.write_image_data(matte.as_raw()),
            EncodedFrame::Indexed(indexed) => writer.write_image_data(indexed.to_rgba().as_raw()),
        };
        written.map_err(png_err)?;
    }
    writer.finish().map_err(png_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Matte;
    use crate::output::{encode_indexed, OutputFormat, PaletteOptions};
    use image::Rgba;

    fn matte(shift: u32) -> Matte {
        Matte::from_fn(6, 4, |x, _| {
            if (x + shift) % 6 < 3 {
                Rgba([200, 30, 40, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    fn animation(format: OutputFormat, frames: u32, duration_ms: u32, loop_count: u16) -> Animation {
        let mut anim = Animation::new(loop_count);
        for i in 0..frames {
            let image = EncodedFrame::encode(&matte(i), format, &PaletteOptions::default()).unwrap();
            anim.push(image, duration_ms).unwrap();
        }
        anim
    }

    #[test]
    fn push_rejects_mismatched_sizes() {
        let mut anim = Animation::new(0);
        anim.push(EncodedFrame::Rgba(Matte::new(4, 4)), 66).unwrap();
        let err = anim
            .push(EncodedFrame::Rgba(Matte::new(5, 4)), 66)
            .unwrap_err();
        assert!(matches!(err, MatteError::InvalidFrame(_)));
        assert_eq!(anim.len(), 1);
    }

    #[test]
    fn empty_animation_is_rejected() {
        let anim = Animation::new(0);
        assert!(write_gif(&anim, Vec::new()).is_err());
        assert!(write_apng(&anim, Vec::new()).is_err());
    }

    #[test]
    fn gif_requires_indexed_frames() {
        let anim = animation(OutputFormat::Apng, 1, 66, 0);
        let err = write_gif(&anim, Vec::new()).unwrap_err();
        assert!(matches!(err, MatteError::Encode(_)));
    }

    #[test]
    fn gif_frames_carry_transparency_disposal_and_delay() {
        let anim = animation(OutputFormat::Gif, 3, 66, 0);
        let mut bytes = Vec::new();
        write_gif(&anim, &mut bytes).unwrap();

        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::Indexed);
        let mut decoder = options.read_info(bytes.as_slice()).unwrap();

        let mut seen = 0;
        while let Some(frame) = decoder.read_next_frame().unwrap() {
            let EncodedFrame::Indexed(expected) = &anim.frames()[seen].image else {
                unreachable!()
            };
            assert_eq!(frame.delay, 7);
            assert_eq!(frame.dispose, gif::DisposalMethod::Background);
            assert_eq!(frame.transparent, Some(expected.transparent_index));
            assert_eq!(&frame.buffer[..], &expected.indices[..]);
            seen += 1;
        }
        assert_eq!(seen, 3);
    }

    #[test]
    fn gif_keep_disposal_is_written() {
        let opts = PaletteOptions {
            disposal: Disposal::Keep,
            ..PaletteOptions::default()
        };
        let mut anim = Animation::new(1);
        anim.push(EncodedFrame::encode(&matte(0), OutputFormat::Gif, &opts).unwrap(), 40)
            .unwrap();
        let mut bytes = Vec::new();
        write_gif(&anim, &mut bytes).unwrap();

        let mut decoder = gif::DecodeOptions::new().read_info(bytes.as_slice()).unwrap();
        let frame = decoder.read_next_frame().unwrap().unwrap();
        assert_eq!(frame.dispose, gif::DisposalMethod::Keep);
    }

    #[test]
    fn apng_carries_loop_count_and_delay() {
        let anim = animation(OutputFormat::Apng, 2, 66, 3);
        let mut bytes = Vec::new();
        write_apng(&anim, &mut bytes).unwrap();

        let decoder = png::Decoder::new(bytes.as_slice());
        let mut reader = decoder.read_info().unwrap();
        let actl = reader.info().animation_control.as_ref().unwrap();
        assert_eq!((actl.num_frames, actl.num_plays), (2, 3));
        let fctl = reader.info().frame_control.as_ref().unwrap();
        assert_eq!((fctl.delay_num, fctl.delay_den), (66, 1000));

        let mut buf = vec![0; reader.output_buffer_size()];
        reader.next_frame(&mut buf).unwrap();
        assert_eq!(&buf[..], matte(0).as_raw().as_slice());
    }

    #[test]
    fn apng_accepts_indexed_frames() {
        let mut anim = Animation::new(0);
        let indexed = encode_indexed(&matte(0), &PaletteOptions::default()).unwrap();
        anim.push(EncodedFrame::Indexed(indexed), 100).unwrap();
        let mut bytes = Vec::new();
        write_apng(&anim, &mut bytes).unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn centiseconds_round_to_nearest() {
        assert_eq!(centiseconds(66), 7);
        assert_eq!(centiseconds(64), 6);
        assert_eq!(centiseconds(0), 0);
    }
}
