use std::path::{Path, PathBuf};

use anyhow::Context as _;
use image::GenericImageView as _;

use crate::foundation::error::{EncoderError, EncoderResult};

use super::FrameSource;

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// A directory of numbered still images (`0.png`, `1.png`, ..., `120.jpg`), played in numeric
/// order.
///
/// Frame size comes from the first image; every later image must match it.
#[derive(Clone, Debug)]
pub struct ImageSequence {
    files: Vec<PathBuf>,
    width: u32,
    height: u32,
    channels: u32,
}

impl ImageSequence {
    /// Scan `dir` for numbered PNG/JPEG files and probe the first one for the frame size.
    ///
    /// Files whose stem is not an integer are skipped. Frames are produced as RGBA.
    pub fn open(dir: impl AsRef<Path>) -> EncoderResult<Self> {
        let dir = dir.as_ref();
        let mut numbered = Vec::new();
        for entry in
            std::fs::read_dir(dir).with_context(|| format!("read sequence dir '{}'", dir.display()))?
        {
            let path = entry
                .with_context(|| format!("read entry in '{}'", dir.display()))?
                .path();
            if let Some(frame) = frame_number(&path) {
                numbered.push((frame, path));
            } else {
                tracing::debug!(path = %path.display(), "skipping non-frame file");
            }
        }
        numbered.sort();

        let files: Vec<PathBuf> = numbered.into_iter().map(|(_, path)| path).collect();
        let Some(first) = files.first() else {
            return Err(EncoderError::config(format!(
                "no numbered png/jpg frames in '{}'",
                dir.display()
            )));
        };
        let (width, height) = image::image_dimensions(first)
            .with_context(|| format!("probe image '{}'", first.display()))?;
        tracing::info!(frames = files.len(), width, height, "image sequence opened");

        Ok(Self {
            files,
            width,
            height,
            channels: 4,
        })
    }

    /// Produce RGB (3) or RGBA (4) frames.
    pub fn with_channels(mut self, channels: u32) -> EncoderResult<Self> {
        if !matches!(channels, 3 | 4) {
            return Err(EncoderError::config(format!(
                "sequence channels must be 3 or 4, got {channels}"
            )));
        }
        self.channels = channels;
        Ok(self)
    }

    /// Frame files in playback order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl FrameSource for ImageSequence {
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
        self.files.len()
    }

    fn read_into(&mut self, index: usize, dst: &mut [u8]) -> EncoderResult<()> {
        let path = self.files.get(index).ok_or_else(|| {
            EncoderError::contract(format!(
                "frame {index} out of range for a {}-frame sequence",
                self.files.len()
            ))
        })?;
        let img = image::open(path).with_context(|| format!("decode image '{}'", path.display()))?;
        let (width, height) = img.dimensions();
        if (width, height) != (self.width, self.height) {
            return Err(EncoderError::config(format!(
                "'{}' is {width}x{height}, sequence frames are {}x{}",
                path.display(),
                self.width,
                self.height
            )));
        }

        let pixels = match self.channels {
            3 => img.to_rgb8().into_raw(),
            _ => img.to_rgba8().into_raw(),
        };
        if pixels.len() != dst.len() {
            return Err(EncoderError::contract(format!(
                "sequence frame needs {} bytes, got {}",
                pixels.len(),
                dst.len()
            )));
        }
        dst.copy_from_slice(&pixels);
        Ok(())
    }
}

fn frame_number(path: &Path) -> Option<u64> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if !EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

#[cfg(test)]
#[path = "../../tests/unit/source/sequence.rs"]
mod tests;
