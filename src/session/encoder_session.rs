use crate::engine::memory::{LentRegion, LinearMemory, MemPtr};
use crate::engine::{EncoderHandle, Engine};
use crate::foundation::error::{EncoderError, EncoderResult};
use crate::session::config::EncoderConfig;
use crate::sink::bitstream::{BitstreamSink, SESSION_INITIAL_CAPACITY};

/// Lifecycle state of an [`EncoderSession`].
///
/// A session is `Active` as soon as [`EncoderSession::create`] returns; there is no observable
/// created-but-inactive state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting frames.
    Active,
    /// [`EncoderSession::end`] has run; every further operation is a contract violation.
    Ended,
}

/// Counters describing a session so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames handed to the engine.
    pub frames_encoded: u64,
    /// High-water mark of the output sink.
    pub bytes_written: u64,
    /// Storage currently held by the output sink.
    pub sink_capacity: u64,
    /// Reallocations performed by the output sink.
    pub sink_growths: u64,
}

/// One encoder run: an engine, its encoder context, the output sink and the staging regions.
///
/// Staging regions are allocated in engine memory on first use and keep their address for the
/// rest of the session, so a caller may fetch [`EncoderSession::rgb_pointer`] once, write frames
/// straight into [`EncoderSession::memory_mut`], and call
/// [`EncoderSession::encode_rgb_pointer`] per frame without any copy.
pub struct EncoderSession<E: Engine> {
    engine: E,
    handle: EncoderHandle,
    sink: BitstreamSink,
    config: EncoderConfig,
    state: SessionState,
    rgb: Option<MemPtr>,
    yuv: Option<MemPtr>,
    frames_encoded: u64,
}

impl<E: Engine> EncoderSession<E> {
    /// Validate `config` and create an encoder context inside `engine`.
    ///
    /// The engine may write container headers during creation; they land in the sink. No
    /// staging region is allocated yet.
    #[tracing::instrument(skip(engine, config), fields(w = config.width, h = config.height, stride = config.stride))]
    pub fn create(mut engine: E, config: EncoderConfig) -> EncoderResult<Self> {
        config.validate()?;
        let mut sink = BitstreamSink::with_capacity(SESSION_INITIAL_CAPACITY);
        let handle = engine.create_encoder(&config.engine_config(), &mut sink)?;
        tracing::info!(
            handle = handle.id(),
            fps = config.fps,
            gop = config.group_of_pictures,
            kbps = config.kbps,
            "encoder session created"
        );
        Ok(Self {
            engine,
            handle,
            sink,
            config,
            state: SessionState::Active,
            rgb: None,
            yuv: None,
            frames_encoded: 0,
        })
    }

    /// Session configuration.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Frames encoded so far.
    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded
    }

    /// Bytes the engine has produced so far (the sink high-water mark).
    pub fn bytes_written(&self) -> usize {
        self.sink.used_bytes()
    }

    /// Snapshot of the session counters.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            frames_encoded: self.frames_encoded,
            bytes_written: self.sink.used_bytes() as u64,
            sink_capacity: self.sink.capacity() as u64,
            sink_growths: self.sink.growth_count(),
        }
    }

    /// Engine memory, for reading staging regions.
    pub fn memory(&self) -> &LinearMemory {
        self.engine.memory()
    }

    /// Engine memory, for filling staging regions in place.
    pub fn memory_mut(&mut self) -> &mut LinearMemory {
        self.engine.memory_mut()
    }

    /// Address of the RGB staging region (`width * height * stride` bytes).
    ///
    /// Allocated on the first call. Returns [`MemPtr::NULL`] once the session has ended.
    pub fn rgb_pointer(&mut self) -> EncoderResult<MemPtr> {
        let len = self.config.rgb_frame_len();
        staging(&mut self.engine, self.state, &mut self.rgb, len)
    }

    /// Address of the YUV staging region (`width * height * 3 / 2` bytes).
    ///
    /// Allocated on the first call. Returns [`MemPtr::NULL`] once the session has ended.
    pub fn yuv_pointer(&mut self) -> EncoderResult<MemPtr> {
        let len = self.config.yuv_frame_len();
        staging(&mut self.engine, self.state, &mut self.yuv, len)
    }

    /// Copy one packed RGB(A) frame into the staging region and encode it.
    pub fn encode_rgb(&mut self, frame: &[u8]) -> EncoderResult<()> {
        self.ensure_active("encode_rgb")?;
        check_len("encode_rgb", frame.len(), self.config.rgb_frame_len())?;
        let rgb = self.rgb_pointer()?;
        self.engine.memory_mut().write(rgb, frame)?;
        self.encode_rgb_pointer()
    }

    /// Copy one planar YUV 4:2:0 frame into the staging region and encode it.
    pub fn encode_yuv(&mut self, frame: &[u8]) -> EncoderResult<()> {
        self.ensure_active("encode_yuv")?;
        check_len("encode_yuv", frame.len(), self.config.yuv_frame_len())?;
        let yuv = self.yuv_pointer()?;
        self.engine.memory_mut().write(yuv, frame)?;
        self.encode_yuv_pointer()
    }

    /// Encode whatever the RGB staging region currently holds.
    pub fn encode_rgb_pointer(&mut self) -> EncoderResult<()> {
        self.ensure_active("encode_rgb_pointer")?;
        let rgb = self.rgb_pointer()?;
        let yuv = self.yuv_pointer()?;
        self.engine.encode_rgb(
            self.handle,
            rgb,
            self.config.stride,
            yuv,
            &mut self.sink,
        )?;
        self.frame_done();
        Ok(())
    }

    /// Encode whatever the YUV staging region currently holds.
    pub fn encode_yuv_pointer(&mut self) -> EncoderResult<()> {
        self.ensure_active("encode_yuv_pointer")?;
        let yuv = self.yuv_pointer()?;
        self.engine.encode_yuv(self.handle, yuv, &mut self.sink)?;
        self.frame_done();
        Ok(())
    }

    /// Move the RGB staging region out of engine memory.
    ///
    /// The region keeps its address; encoding from it fails until it is handed back with
    /// [`EncoderSession::restore_region`].
    pub fn lend_rgb_region(&mut self) -> EncoderResult<LentRegion> {
        self.ensure_active("lend_rgb_region")?;
        let rgb = self.rgb_pointer()?;
        self.engine.memory_mut().lend(rgb)
    }

    /// Put a region obtained from [`EncoderSession::lend_rgb_region`] back.
    pub fn restore_region(&mut self, region: LentRegion) -> EncoderResult<()> {
        self.ensure_active("restore_region")?;
        self.engine.memory_mut().restore(region)
    }

    /// Finalize the encoder, release the staging regions and return the encoded stream.
    ///
    /// Refused while the RGB region is lent out; the session stays `Active` so the region can be
    /// restored first. Otherwise the session is `Ended` afterwards even when finalization fails,
    /// and every staging region is released exactly once. The first error wins.
    pub fn end(&mut self) -> EncoderResult<Vec<u8>> {
        self.ensure_active("end")?;
        if let Some(rgb) = self.rgb
            && self.engine.memory().is_lent(rgb)
        {
            return Err(EncoderError::contract(format!(
                "end called while the RGB region at {rgb} is lent out"
            )));
        }
        self.state = SessionState::Ended;

        let mut result = self.engine.finalize_encoder(self.handle, &mut self.sink);
        for ptr in [self.rgb.take(), self.yuv.take()].into_iter().flatten() {
            let released = self.engine.release(ptr);
            if result.is_ok() {
                result = released;
            } else if let Err(err) = released {
                tracing::warn!(%ptr, error = %err, "staging release failed after an earlier error");
            }
        }
        let sink = std::mem::take(&mut self.sink);
        result?;

        let bytes = sink.into_contents();
        tracing::info!(
            frames = self.frames_encoded,
            bytes = bytes.len(),
            "encoder session ended"
        );
        Ok(bytes)
    }

    fn frame_done(&mut self) {
        self.frames_encoded += 1;
        tracing::trace!(
            frame = self.frames_encoded - 1,
            used_bytes = self.sink.used_bytes(),
            "frame encoded"
        );
    }

    fn ensure_active(&self, op: &str) -> EncoderResult<()> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Ended => Err(EncoderError::contract(format!(
                "{op} called on an ended session"
            ))),
        }
    }
}

fn staging<E: Engine>(
    engine: &mut E,
    state: SessionState,
    slot: &mut Option<MemPtr>,
    len: usize,
) -> EncoderResult<MemPtr> {
    if state == SessionState::Ended {
        return Ok(MemPtr::NULL);
    }
    if let Some(ptr) = *slot {
        return Ok(ptr);
    }
    let ptr = engine.allocate(len)?;
    tracing::debug!(%ptr, len, "staging region allocated");
    *slot = Some(ptr);
    Ok(ptr)
}

fn check_len(op: &str, got: usize, expected: usize) -> EncoderResult<()> {
    if got != expected {
        return Err(EncoderError::contract(format!(
            "{op} expects exactly {expected} bytes, got {got}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/session/encoder_session.rs"]
mod tests;
