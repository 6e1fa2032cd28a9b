use std::collections::BTreeMap;

use crate::foundation::error::{EncoderError, EncoderResult};

/// Allocation granularity of engine memory, in bytes.
pub const REGION_ALIGN: u64 = 64;

/// Address inside an engine's [`LinearMemory`].
///
/// Addresses are plain integers, never raw pointers: every access goes through the owning
/// memory and is bounds checked. [`MemPtr::NULL`] is never handed out by an allocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemPtr(u64);

impl MemPtr {
    /// Sentinel returned where no region exists (for example after a session ended).
    pub const NULL: MemPtr = MemPtr(0);

    /// Raw address value.
    pub fn addr(self) -> u64 {
        self.0
    }

    /// Return `true` for [`MemPtr::NULL`].
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Address `bytes` past this one.
    pub fn offset(self, bytes: usize) -> MemPtr {
        MemPtr(self.0 + bytes as u64)
    }
}

impl std::fmt::Display for MemPtr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug)]
enum Region {
    Resident(Box<[u8]>),
    OnLoan { len: usize },
}

impl Region {
    fn len(&self) -> usize {
        match self {
            Region::Resident(data) => data.len(),
            Region::OnLoan { len } => *len,
        }
    }
}

/// A region moved out of a [`LinearMemory`] so another thread can fill it in place.
///
/// While lent, the region's address stays reserved and any access through the memory is a
/// contract violation. Hand it back with [`LinearMemory::restore`].
#[derive(Debug)]
pub struct LentRegion {
    ptr: MemPtr,
    data: Box<[u8]>,
}

impl LentRegion {
    /// Address the region occupies in its memory.
    pub fn ptr(&self) -> MemPtr {
        self.ptr
    }

    /// Region size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Return `true` for a zero-length region.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the region bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutably borrow the region bytes.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Linear, byte-addressable engine memory.
///
/// Regions are placed at increasing, [`REGION_ALIGN`]-aligned addresses and addresses are never
/// reused, so a stale [`MemPtr`] faults instead of aliasing a newer allocation. An optional byte
/// limit models the engine's maximum heap size.
#[derive(Debug)]
pub struct LinearMemory {
    regions: BTreeMap<u64, Region>,
    next_addr: u64,
    live_bytes: usize,
    limit: Option<usize>,
}

impl Default for LinearMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearMemory {
    /// Create an unbounded memory.
    pub fn new() -> Self {
        Self {
            regions: BTreeMap::new(),
            next_addr: REGION_ALIGN,
            live_bytes: 0,
            limit: None,
        }
    }

    /// Create a memory that refuses to hold more than `limit` live bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    /// Number of regions currently allocated (lent regions included).
    pub fn live_allocations(&self) -> usize {
        self.regions.len()
    }

    /// Bytes currently allocated (lent regions included).
    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }

    /// Allocate a zero-filled region of `size` bytes.
    pub fn allocate(&mut self, size: usize) -> EncoderResult<MemPtr> {
        if size == 0 {
            return Err(EncoderError::contract("engine allocation size must be > 0"));
        }
        if let Some(limit) = self.limit
            && self.live_bytes.saturating_add(size) > limit
        {
            return Err(EncoderError::resource(format!(
                "allocating {size} bytes exceeds the engine memory limit of {limit} bytes \
                 ({} bytes live)",
                self.live_bytes
            )));
        }

        let addr = self.next_addr;
        let span = (size as u64).div_ceil(REGION_ALIGN) * REGION_ALIGN;
        self.next_addr = addr
            .checked_add(span)
            .ok_or_else(|| EncoderError::resource("engine address space exhausted"))?;
        self.regions
            .insert(addr, Region::Resident(vec![0u8; size].into_boxed_slice()));
        self.live_bytes += size;
        Ok(MemPtr(addr))
    }

    /// Free the region starting at `ptr`.
    pub fn release(&mut self, ptr: MemPtr) -> EncoderResult<()> {
        match self.regions.get(&ptr.0) {
            None => {
                return Err(EncoderError::contract(format!(
                    "release of {ptr}, which is not the start of a live region"
                )));
            }
            Some(Region::OnLoan { .. }) => {
                return Err(EncoderError::contract(format!(
                    "release of {ptr} while it is lent out"
                )));
            }
            Some(Region::Resident(_)) => {}
        }
        if let Some(region) = self.regions.remove(&ptr.0) {
            self.live_bytes -= region.len();
        }
        Ok(())
    }

    /// Return `true` when the region starting at `ptr` is currently lent out.
    pub fn is_lent(&self, ptr: MemPtr) -> bool {
        matches!(self.regions.get(&ptr.0), Some(Region::OnLoan { .. }))
    }

    /// Size of the region starting at `ptr`.
    pub fn region_len(&self, ptr: MemPtr) -> EncoderResult<usize> {
        self.regions
            .get(&ptr.0)
            .map(Region::len)
            .ok_or_else(|| EncoderError::contract(format!("{ptr} is not the start of a region")))
    }

    /// Borrow `len` bytes starting at `ptr`.
    ///
    /// `ptr` may point inside a region; the whole span must lie within it.
    pub fn slice(&self, ptr: MemPtr, len: usize) -> EncoderResult<&[u8]> {
        let (base, region) = self.locate(ptr)?;
        let start = (ptr.0 - base) as usize;
        match region {
            Region::Resident(data) => data
                .get(start..start.saturating_add(len))
                .ok_or_else(|| out_of_bounds(ptr, len, base, data.len())),
            Region::OnLoan { .. } => Err(lent_access(base)),
        }
    }

    /// Mutably borrow `len` bytes starting at `ptr`.
    pub fn slice_mut(&mut self, ptr: MemPtr, len: usize) -> EncoderResult<&mut [u8]> {
        let (base, region) = self.locate_mut(ptr)?;
        let start = (ptr.0 - base) as usize;
        match region {
            Region::Resident(data) => {
                let region_len = data.len();
                data.get_mut(start..start.saturating_add(len))
                    .ok_or_else(|| out_of_bounds(ptr, len, base, region_len))
            }
            Region::OnLoan { .. } => Err(lent_access(base)),
        }
    }

    /// Copy `bytes` into memory at `ptr`.
    pub fn write(&mut self, ptr: MemPtr, bytes: &[u8]) -> EncoderResult<()> {
        self.slice_mut(ptr, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Move the region starting at `ptr` out of memory.
    pub fn lend(&mut self, ptr: MemPtr) -> EncoderResult<LentRegion> {
        let Some(region) = self.regions.get_mut(&ptr.0) else {
            return Err(EncoderError::contract(format!(
                "lend of {ptr}, which is not the start of a live region"
            )));
        };
        let len = region.len();
        match std::mem::replace(region, Region::OnLoan { len }) {
            Region::Resident(data) => Ok(LentRegion { ptr, data }),
            Region::OnLoan { .. } => Err(lent_access(ptr.0)),
        }
    }

    /// Put a previously lent region back at its address.
    pub fn restore(&mut self, lent: LentRegion) -> EncoderResult<()> {
        let expected = lent.data.len();
        match self.regions.get_mut(&lent.ptr.0) {
            Some(slot) if matches!(&*slot, Region::OnLoan { len } if *len == expected) => {
                *slot = Region::Resident(lent.data);
                Ok(())
            }
            _ => Err(EncoderError::contract(format!(
                "restore of {} does not match an outstanding loan",
                lent.ptr
            ))),
        }
    }

    fn locate(&self, ptr: MemPtr) -> EncoderResult<(u64, &Region)> {
        self.regions
            .range(..=ptr.0)
            .next_back()
            .filter(|(base, region)| ptr.0 < **base + region.len().max(1) as u64)
            .map(|(base, region)| (*base, region))
            .ok_or_else(|| unmapped(ptr))
    }

    fn locate_mut(&mut self, ptr: MemPtr) -> EncoderResult<(u64, &mut Region)> {
        self.regions
            .range_mut(..=ptr.0)
            .next_back()
            .filter(|(base, region)| ptr.0 < **base + region.len().max(1) as u64)
            .map(|(base, region)| (*base, region))
            .ok_or_else(|| unmapped(ptr))
    }
}

fn unmapped(ptr: MemPtr) -> EncoderError {
    EncoderError::contract(format!("{ptr} does not point into a live region"))
}

fn lent_access(base: u64) -> EncoderError {
    EncoderError::contract(format!(
        "region {} is lent out and cannot be accessed until restored",
        MemPtr(base)
    ))
}

fn out_of_bounds(ptr: MemPtr, len: usize, base: u64, region_len: usize) -> EncoderError {
    EncoderError::contract(format!(
        "access of {len} bytes at {ptr} overruns the {region_len}-byte region at {}",
        MemPtr(base)
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/engine/memory.rs"]
mod tests;
