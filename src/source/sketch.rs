use std::f64::consts::TAU;

use rayon::prelude::*;

use crate::foundation::error::{EncoderError, EncoderResult};

use super::FrameSource;

/// Animated radial interference pattern, one full cycle over the clip.
///
/// Red and green are two concentric sine waves travelling in opposite directions; blue pulses
/// uniformly. With [`RadialSketch::with_vertical_fade`] every row is darkened towards the top.
#[derive(Clone, Debug)]
pub struct RadialSketch {
    width: u32,
    height: u32,
    channels: u32,
    frames: usize,
    vertical_fade: bool,
}

impl RadialSketch {
    /// A `width` x `height` sketch with `frames` frames and `channels` bytes per pixel.
    pub fn new(width: u32, height: u32, channels: u32, frames: usize) -> EncoderResult<Self> {
        if width == 0 || height == 0 {
            return Err(EncoderError::config("sketch dimensions must be > 0"));
        }
        if !matches!(channels, 3 | 4) {
            return Err(EncoderError::config(format!(
                "sketch channels must be 3 or 4, got {channels}"
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            frames,
            vertical_fade: false,
        })
    }

    /// Scale every pixel by `y / height`.
    pub fn with_vertical_fade(mut self, on: bool) -> Self {
        self.vertical_fade = on;
        self
    }

    /// Render the frame at normalized time `t` (0 = first frame, 1 = one full cycle).
    pub fn draw(&self, t: f64, dst: &mut [u8]) {
        let (w, h) = (self.width as f64, self.height as f64);
        let stride = self.channels as usize;
        let blue = (t * TAU).sin() * 0.5 + 0.5;

        dst.par_chunks_mut(self.width as usize * stride)
            .enumerate()
            .for_each(|(y, row)| {
                let fade = if self.vertical_fade { y as f64 / h } else { 1.0 };
                let dy = y as f64 - h / 2.0;
                for (x, px) in row.chunks_exact_mut(stride).enumerate() {
                    let dx = x as f64 - w / 2.0;
                    let dist = (dx * dx + dy * dy).sqrt();
                    let k = ((dist / w) * 4.0 + t * TAU).sin() * 0.5 + 0.5;
                    let a = ((dist / w) * 2.0 - t * TAU).sin() * 0.5 + 0.5;
                    px[0] = (k * 255.0 * fade) as u8;
                    px[1] = (a * 255.0 * fade) as u8;
                    px[2] = (blue * 255.0 * fade) as u8;
                    if stride == 4 {
                        px[3] = 255;
                    }
                }
            });
    }
}

impl FrameSource for RadialSketch {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn channels(&self) -> u32 {
        self.channels
    }

    fn len_frames(&self) -> usize {
        self.frames
    }

    fn read_into(&mut self, index: usize, dst: &mut [u8]) -> EncoderResult<()> {
        if index >= self.frames {
            return Err(EncoderError::contract(format!(
                "frame {index} out of range for a {}-frame sketch",
                self.frames
            )));
        }
        if dst.len() != self.frame_len() {
            return Err(EncoderError::contract(format!(
                "sketch frame needs {} bytes, got {}",
                self.frame_len(),
                dst.len()
            )));
        }
        self.draw(index as f64 / self.frames as f64, dst);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/sketch.rs"]
mod tests;
