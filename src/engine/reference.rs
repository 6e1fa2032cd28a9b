use std::collections::HashMap;

use crate::foundation::error::{EncoderError, EncoderResult};
use crate::session::config::EngineConfig;

use super::codec::{packbits_encode, xor_into};
use super::container::{self, BOX_HEADER_LEN, FTYP_LEN, SAMPLE_DELTA, SAMPLE_KEY};
use super::convert::{rgb_to_yuv420, yuv420_len};
use super::memory::{LinearMemory, MemPtr};
use super::{Engine, EncoderHandle, WriteCallback, write_at};

pub use super::container::{ReferenceContainer, StreamHeader};

/// Byte offset of the `mdat` size field in a non-sequential stream.
const MDAT_HEADER_AT: u64 = FTYP_LEN;

/// Lossless pure-Rust engine.
///
/// Frames are converted to YUV 4:2:0, then stored as PackBits-coded key frames every
/// `group_of_pictures` frames and XOR deltas against the previous frame otherwise. Output is a
/// small box container (see [`ReferenceContainer`]) that exercises the same write pattern a real
/// MP4 muxer produces: a header up front, sample data appended in order, and a size field at a
/// lower offset patched during finalize.
///
/// Rate-control settings (`kbps`, quantizers, `speed`, `desiredNaluBytes`, `temporalDenoise`) are
/// accepted and ignored since the coding is lossless. `fragmentation` is ignored as well.
/// `sequential` switches to one `mdat` box per sample so that nothing is ever rewritten.
#[derive(Debug, Default)]
pub struct ReferenceEngine {
    memory: LinearMemory,
    encoders: HashMap<u64, EncoderState>,
    next_handle: u64,
}

#[derive(Debug)]
struct EncoderState {
    config: EngineConfig,
    frame_len: usize,
    previous: Option<Vec<u8>>,
    delta: Vec<u8>,
    sample: Vec<u8>,
    write_pos: u64,
    sample_sizes: Vec<u32>,
    sync_samples: Vec<u32>,
}

impl ReferenceEngine {
    /// Engine with unbounded memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose memory refuses to hold more than `limit` live bytes.
    pub fn with_memory_limit(limit: usize) -> Self {
        Self {
            memory: LinearMemory::with_limit(limit),
            ..Self::default()
        }
    }

    /// Number of encoder contexts created and not yet finalized.
    pub fn active_encoders(&self) -> usize {
        self.encoders.len()
    }

    fn state_mut(&mut self, handle: EncoderHandle) -> EncoderResult<&mut EncoderState> {
        self.encoders
            .get_mut(&handle.id())
            .ok_or_else(|| unknown_handle(handle))
    }
}

impl Engine for ReferenceEngine {
    fn memory(&self) -> &LinearMemory {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut LinearMemory {
        &mut self.memory
    }

    #[tracing::instrument(skip(self, out), fields(w = config.width, h = config.height))]
    fn create_encoder(
        &mut self,
        config: &EngineConfig,
        out: &mut dyn WriteCallback,
    ) -> EncoderResult<EncoderHandle> {
        if config.width == 0
            || config.height == 0
            || !config.width.is_multiple_of(2)
            || !config.height.is_multiple_of(2)
        {
            return Err(EncoderError::config(format!(
                "reference engine needs even, non-zero dimensions (got {}x{})",
                config.width, config.height
            )));
        }
        if config.fps == 0 {
            return Err(EncoderError::config("fps must be > 0"));
        }
        if config.group_of_pictures == 0 {
            return Err(EncoderError::config("groupOfPictures must be > 0"));
        }

        write_at(out, 0, &container::ftyp())?;
        let write_pos = if config.sequential {
            FTYP_LEN
        } else {
            // Size stays zero until finalize patches it.
            write_at(out, MDAT_HEADER_AT, &container::box_header(b"mdat", 0))?;
            MDAT_HEADER_AT + BOX_HEADER_LEN
        };

        self.next_handle += 1;
        let handle = EncoderHandle::new(self.next_handle);
        self.encoders.insert(
            handle.id(),
            EncoderState {
                config: config.clone(),
                frame_len: yuv420_len(config.width as usize, config.height as usize),
                previous: None,
                delta: Vec::new(),
                sample: Vec::new(),
                write_pos,
                sample_sizes: Vec::new(),
                sync_samples: Vec::new(),
            },
        );
        tracing::debug!(handle = handle.id(), "reference encoder created");
        Ok(handle)
    }

    fn encode_rgb(
        &mut self,
        handle: EncoderHandle,
        rgb: MemPtr,
        stride: u32,
        yuv_scratch: MemPtr,
        out: &mut dyn WriteCallback,
    ) -> EncoderResult<()> {
        let state = self.state_mut(handle)?;
        let (width, height) = (state.config.width as usize, state.config.height as usize);
        let flip_y = state.config.rgb_flip_y;
        let stride = stride as usize;

        let mut scratch = self.memory.lend(yuv_scratch)?;
        let converted = self
            .memory
            .slice(rgb, width * height * stride)
            .and_then(|rgb| {
                rgb_to_yuv420(rgb, width, height, stride, flip_y, scratch.as_mut_slice())
            });
        self.memory.restore(scratch)?;
        converted?;

        self.encode_yuv(handle, yuv_scratch, out)
    }

    fn encode_yuv(
        &mut self,
        handle: EncoderHandle,
        yuv: MemPtr,
        out: &mut dyn WriteCallback,
    ) -> EncoderResult<()> {
        let state = self
            .encoders
            .get_mut(&handle.id())
            .ok_or_else(|| unknown_handle(handle))?;
        let frame = self.memory.slice(yuv, state.frame_len)?;
        state.encode_frame(frame, out)
    }

    #[tracing::instrument(skip(self, out))]
    fn finalize_encoder(
        &mut self,
        handle: EncoderHandle,
        out: &mut dyn WriteCallback,
    ) -> EncoderResult<()> {
        let state = self
            .encoders
            .remove(&handle.id())
            .ok_or_else(|| unknown_handle(handle))?;

        if !state.config.sequential {
            let mdat_len = state.write_pos - MDAT_HEADER_AT;
            let mdat_len = u32::try_from(mdat_len).map_err(|_| {
                EncoderError::resource(format!("mdat of {mdat_len} bytes exceeds 32-bit box size"))
            })?;
            write_at(out, MDAT_HEADER_AT, &mdat_len.to_be_bytes())?;
        }

        let header = StreamHeader {
            width: state.config.width,
            height: state.config.height,
            fps: state.config.fps,
            group_of_pictures: state.config.group_of_pictures,
            frame_count: state.sample_sizes.len() as u32,
        };
        let moov = container::moov(&header, &state.sample_sizes, &state.sync_samples);
        write_at(out, state.write_pos, &moov)?;

        tracing::debug!(
            frames = header.frame_count,
            key_frames = state.sync_samples.len(),
            total_bytes = state.write_pos + moov.len() as u64,
            "reference encoder finalized"
        );
        Ok(())
    }
}

impl EncoderState {
    fn encode_frame(&mut self, frame: &[u8], out: &mut dyn WriteCallback) -> EncoderResult<()> {
        let index = self.sample_sizes.len() as u32;
        let key = index.is_multiple_of(self.config.group_of_pictures);

        self.sample.clear();
        match (&self.previous, key) {
            (Some(previous), false) => {
                self.delta.resize(frame.len(), 0);
                xor_into(&mut self.delta, frame, previous);
                self.sample.push(SAMPLE_DELTA);
                packbits_encode(&self.delta, &mut self.sample);
            }
            _ => {
                self.sample.push(SAMPLE_KEY);
                packbits_encode(frame, &mut self.sample);
            }
        }
        let sample_len = u32::try_from(self.sample.len())
            .map_err(|_| EncoderError::resource("sample exceeds 32-bit size"))?;

        if self.config.sequential {
            let header = container::box_header(b"mdat", sample_len + BOX_HEADER_LEN as u32);
            write_at(out, self.write_pos, &header)?;
            self.write_pos += BOX_HEADER_LEN;
        }
        write_at(out, self.write_pos, &self.sample)?;
        self.write_pos += u64::from(sample_len);

        self.sample_sizes.push(sample_len);
        if self.sample[0] == SAMPLE_KEY {
            self.sync_samples.push(index + 1);
        }
        let previous = self.previous.get_or_insert_with(Vec::new);
        previous.clear();
        previous.extend_from_slice(frame);

        tracing::trace!(index, key, bytes = sample_len, "sample written");
        Ok(())
    }
}

fn unknown_handle(handle: EncoderHandle) -> EncoderError {
    EncoderError::contract(format!("unknown encoder handle {}", handle.id()))
}

#[cfg(test)]
#[path = "../../tests/unit/engine/reference.rs"]
mod tests;
