use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{EncoderError, EncoderResult};

/// Encoder session configuration.
///
/// Keys use the camelCase spelling of the settings object accepted by the engine, so an existing
/// JSON settings file can be loaded unchanged with [`EncoderConfig::from_path`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncoderConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Bytes per packed RGB pixel (3 for RGB, 4 for RGBA).
    ///
    /// Host-side only; never forwarded to the engine.
    pub stride: u32,
    /// Frames per second.
    pub fps: u32,
    /// Encoder speed/effort trade-off (0 = best quality, 10 = fastest).
    pub speed: u32,
    /// Target bitrate in kilobits per second; `0` selects constant quantizer mode.
    pub kbps: u32,
    /// Constant quantizer used when `kbps == 0`.
    pub quantization_parameter: u32,
    /// Lowest quantizer the rate control may pick when `kbps > 0`.
    pub qp_min: u32,
    /// Highest quantizer the rate control may pick when `kbps > 0`.
    pub qp_max: u32,
    /// Key frame interval in frames.
    pub group_of_pictures: u32,
    /// Preferred NAL unit size in bytes (0 = unconstrained).
    pub desired_nalu_bytes: u32,
    /// Emit a fragmented container.
    pub fragmentation: bool,
    /// Write the container strictly sequentially (no back-patching).
    pub sequential: bool,
    /// Enable temporal denoising.
    pub temporal_denoise: bool,
    /// Read RGB input bottom-up (GL readback order).
    pub rgb_flip_y: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            stride: 4,
            fps: 30,
            speed: 10,
            kbps: 0,
            quantization_parameter: 10,
            qp_min: 10,
            qp_max: 50,
            group_of_pictures: 20,
            desired_nalu_bytes: 0,
            fragmentation: false,
            sequential: false,
            temporal_denoise: false,
            rgb_flip_y: false,
        }
    }
}

impl EncoderConfig {
    /// Default configuration for a `width` x `height` RGBA input.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Set the packed pixel stride.
    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    /// Set the frame rate.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Parse a JSON settings object.
    pub fn from_json_str(json: &str) -> EncoderResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| EncoderError::config(format!("invalid encoder settings JSON: {e}")))
    }

    /// Load a JSON settings file.
    pub fn from_path(path: impl AsRef<Path>) -> EncoderResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read encoder settings '{}'", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Check the constraints a session needs before anything is allocated.
    pub fn validate(&self) -> EncoderResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(EncoderError::config(format!(
                "width and height must be > 0 (got {}x{})",
                self.width, self.height
            )));
        }
        if !matches!(self.stride, 3 | 4) {
            return Err(EncoderError::config(format!(
                "stride must be 3 (RGB) or 4 (RGBA), got {}",
                self.stride
            )));
        }
        Ok(())
    }

    /// Exact byte length of one packed RGB(A) frame.
    pub fn rgb_frame_len(&self) -> usize {
        self.pixel_count() * self.stride as usize
    }

    /// Exact byte length of one planar YUV 4:2:0 frame.
    pub fn yuv_frame_len(&self) -> usize {
        self.pixel_count() * 3 / 2
    }

    /// The settings forwarded to the engine, with host-only fields stripped.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            width: self.width,
            height: self.height,
            fps: self.fps,
            speed: self.speed,
            kbps: self.kbps,
            quantization_parameter: self.quantization_parameter,
            qp_min: self.qp_min,
            qp_max: self.qp_max,
            group_of_pictures: self.group_of_pictures,
            desired_nalu_bytes: self.desired_nalu_bytes,
            fragmentation: self.fragmentation,
            sequential: self.sequential,
            temporal_denoise: self.temporal_denoise,
            rgb_flip_y: self.rgb_flip_y,
        }
    }

    fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Engine-facing settings: [`EncoderConfig`] without transport-only fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct EngineConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub speed: u32,
    pub kbps: u32,
    pub quantization_parameter: u32,
    pub qp_min: u32,
    pub qp_max: u32,
    pub group_of_pictures: u32,
    pub desired_nalu_bytes: u32,
    pub fragmentation: bool,
    pub sequential: bool,
    pub temporal_denoise: bool,
    pub rgb_flip_y: bool,
}

#[cfg(test)]
#[path = "../../tests/unit/session/config.rs"]
mod tests;
