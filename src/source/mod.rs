//! Frame sources: where raw pixels come from before they reach a session or a pipeline.

/// Numbered image files decoded with the `image` crate.
pub mod sequence;
/// Synthetic animated test pattern.
pub mod sketch;

use crate::engine::Engine;
use crate::foundation::error::{EncoderError, EncoderResult};
use crate::pipeline::PipelineCoordinator;
use crate::session::config::EncoderConfig;
use crate::session::encoder_session::EncoderSession;

/// A finite, random-access sequence of packed RGB(A) frames of one size.
pub trait FrameSource {
    /// Frame width in pixels.
    fn width(&self) -> u32;

    /// Frame height in pixels.
    fn height(&self) -> u32;

    /// Bytes per pixel (3 or 4).
    fn channels(&self) -> u32;

    /// Number of frames.
    fn len_frames(&self) -> usize;

    /// Write frame `index` into `dst`, which is exactly [`FrameSource::frame_len`] bytes.
    fn read_into(&mut self, index: usize, dst: &mut [u8]) -> EncoderResult<()>;

    /// Bytes per frame.
    fn frame_len(&self) -> usize {
        self.width() as usize * self.height() as usize * self.channels() as usize
    }

    /// Default session configuration for frames of this source.
    fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig::new(self.width(), self.height()).with_stride(self.channels())
    }
}

/// Encode every frame of `source` through `session`, reading straight into its RGB staging
/// region. Returns the number of frames encoded.
pub fn encode_with_session<E: Engine>(
    session: &mut EncoderSession<E>,
    source: &mut dyn FrameSource,
) -> EncoderResult<u64> {
    let config = session.config();
    if (config.width, config.height, config.stride)
        != (source.width(), source.height(), source.channels())
    {
        return Err(EncoderError::config(format!(
            "source frames are {}x{}x{} but the session expects {}x{}x{}",
            source.width(),
            source.height(),
            source.channels(),
            config.width,
            config.height,
            config.stride
        )));
    }

    let len = source.frame_len();
    for index in 0..source.len_frames() {
        let rgb = session.rgb_pointer()?;
        source.read_into(index, session.memory_mut().slice_mut(rgb, len)?)?;
        session.encode_rgb_pointer()?;
    }
    Ok(source.len_frames() as u64)
}

/// Submit every frame of `source` to a started pipeline. Returns the number of frames submitted.
pub fn encode_with_pipeline(
    pipeline: &mut PipelineCoordinator,
    source: &mut dyn FrameSource,
) -> EncoderResult<u64> {
    if pipeline.frame_len() != source.frame_len() {
        return Err(EncoderError::config(format!(
            "source frames are {} bytes but the pipeline region holds {}",
            source.frame_len(),
            pipeline.frame_len()
        )));
    }
    for index in 0..source.len_frames() {
        pipeline.submit_with(|dst| source.read_into(index, dst))?;
    }
    Ok(source.len_frames() as u64)
}

#[cfg(test)]
#[path = "../../tests/unit/source/mod.rs"]
mod tests;
