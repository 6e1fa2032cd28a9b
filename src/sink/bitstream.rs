use crate::engine::WriteCallback;

/// Capacity below which the sink doubles on growth.
pub const CAPACITY_DOUBLING_MAX: usize = 1024 * 1024;

/// Smallest capacity a growth step produces once the sink has storage.
pub const MIN_GROWTH_CAPACITY: usize = 256;

/// Initial capacity used by encoder sessions.
pub const SESSION_INITIAL_CAPACITY: usize = 256;

/// Growable, seekable in-memory byte store that encoder output is streamed into.
///
/// Engines write at arbitrary offsets (container headers are back-patched after the payload is
/// known), so the sink tracks a write `cursor` separately from `used_bytes`, the high-water mark
/// of everything ever written. Seeking never truncates, and only [`BitstreamSink::reset`] lowers
/// `used_bytes`.
///
/// Storage grows geometrically: `x2.0` below [`CAPACITY_DOUBLING_MAX`] and `x1.125` above it,
/// which keeps allocation counts low for small outputs without overshooting large ones.
#[derive(Debug, Default, Clone)]
pub struct BitstreamSink {
    cursor: usize,
    used_bytes: usize,
    // `contents.len()` is the sink capacity.
    contents: Vec<u8>,
    growths: u64,
}

impl BitstreamSink {
    /// Create an empty sink with no storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty sink with `capacity` bytes of storage.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            contents: vec![0u8; capacity],
            ..Self::default()
        }
    }

    /// Current write offset.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// High-water mark of bytes written.
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// Bytes of storage currently held.
    pub fn capacity(&self) -> usize {
        self.contents.len()
    }

    /// Number of reallocations performed so far.
    pub fn growth_count(&self) -> u64 {
        self.growths
    }

    /// Same as [`BitstreamSink::used_bytes`].
    pub fn len(&self) -> usize {
        self.used_bytes
    }

    /// Return `true` when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.used_bytes == 0
    }

    /// Move the write cursor to `offset`.
    ///
    /// No bounds check is made: capacity is grown by the next write, and bytes between the old
    /// high-water mark and `offset` read back as zero (also after [`BitstreamSink::reset`]).
    pub fn seek(&mut self, offset: usize) {
        self.cursor = offset;
    }

    /// Copy `bytes` into the sink at the cursor and advance it.
    ///
    /// Accepts the whole slice and returns its length, or returns 0 without writing when the
    /// span would end past `usize::MAX`.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let Some(end) = self.cursor.checked_add(bytes.len()) else {
            return 0;
        };
        self.expand(end);
        self.contents[self.cursor..end].copy_from_slice(bytes);
        self.cursor = end;
        self.used_bytes = self.used_bytes.max(end);
        bytes.len()
    }

    /// The first `used_bytes` bytes, independent of cursor and capacity.
    pub fn contents(&self) -> &[u8] {
        &self.contents[..self.used_bytes]
    }

    /// Consume the sink and return exactly the written bytes.
    pub fn into_contents(mut self) -> Vec<u8> {
        self.contents.truncate(self.used_bytes);
        self.contents
    }

    /// Forget all written data while keeping the storage.
    pub fn reset(&mut self) {
        self.contents[..self.used_bytes].fill(0);
        self.cursor = 0;
        self.used_bytes = 0;
    }

    fn expand(&mut self, requested: usize) {
        let prev = self.contents.len();
        if prev >= requested {
            return;
        }
        let target = grown_capacity(prev, requested);
        let mut next = vec![0u8; target];
        next[..self.used_bytes].copy_from_slice(&self.contents[..self.used_bytes]);
        self.contents = next;
        self.growths += 1;
        tracing::debug!(prev, requested, target, "bitstream sink grew");
    }
}

/// Capacity chosen when a sink holding `prev` bytes must fit `requested` bytes.
pub fn grown_capacity(prev: usize, requested: usize) -> usize {
    let geometric = if prev < CAPACITY_DOUBLING_MAX {
        prev.saturating_mul(2)
    } else {
        // floor(prev * 1.125) without going through floating point.
        prev.saturating_add(prev / 8)
    };
    let mut target = requested.max(geometric);
    if prev != 0 {
        target = target.max(MIN_GROWTH_CAPACITY);
    }
    target
}

impl WriteCallback for BitstreamSink {
    fn accept(&mut self, offset: u64, bytes: &[u8]) -> usize {
        let Ok(offset) = usize::try_from(offset) else {
            return 0;
        };
        self.seek(offset);
        self.write(bytes)
    }
}

impl std::io::Write for BitstreamSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(BitstreamSink::write(self, buf))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl std::io::Seek for BitstreamSink {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        let (base, delta) = match pos {
            std::io::SeekFrom::Start(off) => {
                let off = usize::try_from(off).map_err(|_| {
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "seek offset overflow")
                })?;
                BitstreamSink::seek(self, off);
                return Ok(off as u64);
            }
            std::io::SeekFrom::End(delta) => (self.used_bytes, delta),
            std::io::SeekFrom::Current(delta) => (self.cursor, delta),
        };
        let next = base.checked_add_signed(delta as isize).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )
        })?;
        BitstreamSink::seek(self, next);
        Ok(next as u64)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sink/bitstream.rs"]
mod tests;
