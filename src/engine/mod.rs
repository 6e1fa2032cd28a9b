//! Boundary to the encoder engine.
//!
//! An engine owns a [`LinearMemory`](memory::LinearMemory), converts and compresses frames that
//! live in it, and reports compressed output through a [`WriteCallback`]. The host never looks
//! inside the compressed stream; it only stores what the engine writes, where the engine says.
//!
//! The callback is passed into every engine call rather than bound once at creation, so the
//! session keeps sole ownership of its sink and the engine only borrows it for the duration of a
//! call.

/// RGB(A) to planar YUV 4:2:0 conversion.
pub mod convert;
/// Engine linear memory and lent regions.
pub mod memory;
/// Pure-Rust reference engine and its container format.
pub mod reference;

mod codec;
mod container;

use crate::foundation::error::{EncoderError, EncoderResult};
use crate::session::config::EngineConfig;
use memory::{LinearMemory, MemPtr};

/// Receiver of engine output.
pub trait WriteCallback {
    /// Store `bytes` at absolute `offset` and return how many bytes were accepted.
    ///
    /// Anything short of `bytes.len()` is a failed write.
    fn accept(&mut self, offset: u64, bytes: &[u8]) -> usize;
}

/// Write `bytes` at `offset`, turning a short write into an engine error.
pub fn write_at(out: &mut dyn WriteCallback, offset: u64, bytes: &[u8]) -> EncoderResult<()> {
    let accepted = out.accept(offset, bytes);
    if accepted != bytes.len() {
        return Err(EncoderError::engine(format!(
            "short write at offset {offset}: {accepted} of {} bytes accepted",
            bytes.len()
        )));
    }
    Ok(())
}

/// Opaque identifier of an encoder context inside an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EncoderHandle(u64);

impl EncoderHandle {
    /// Wrap an engine-chosen identifier.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The engine-chosen identifier.
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Native encoder engine contract.
///
/// Pointers are addresses in the engine's own memory. Errors are opaque to the host and are
/// propagated, never retried.
pub trait Engine {
    /// Engine linear memory.
    fn memory(&self) -> &LinearMemory;

    /// Mutable engine linear memory.
    fn memory_mut(&mut self) -> &mut LinearMemory;

    /// Create an encoder context that will write its output through `out`.
    fn create_encoder(
        &mut self,
        config: &EngineConfig,
        out: &mut dyn WriteCallback,
    ) -> EncoderResult<EncoderHandle>;

    /// Convert the packed RGB frame at `rgb` into `yuv_scratch`, then encode it.
    fn encode_rgb(
        &mut self,
        handle: EncoderHandle,
        rgb: MemPtr,
        stride: u32,
        yuv_scratch: MemPtr,
        out: &mut dyn WriteCallback,
    ) -> EncoderResult<()>;

    /// Encode the planar YUV 4:2:0 frame at `yuv`.
    fn encode_yuv(
        &mut self,
        handle: EncoderHandle,
        yuv: MemPtr,
        out: &mut dyn WriteCallback,
    ) -> EncoderResult<()>;

    /// Flush everything buffered for `handle` through `out` and destroy the context.
    fn finalize_encoder(
        &mut self,
        handle: EncoderHandle,
        out: &mut dyn WriteCallback,
    ) -> EncoderResult<()>;

    /// Allocate `size` bytes of engine memory.
    fn allocate(&mut self, size: usize) -> EncoderResult<MemPtr> {
        self.memory_mut().allocate(size)
    }

    /// Release a region obtained from [`Engine::allocate`].
    fn release(&mut self, ptr: MemPtr) -> EncoderResult<()> {
        self.memory_mut().release(ptr)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/mod.rs"]
mod tests;
