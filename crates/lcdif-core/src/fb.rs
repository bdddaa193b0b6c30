//! The scanout memory region.

use crate::error::{LcdifError, Result};

/// A physically addressable memory region holding one scanout surface.
///
/// The region is owned exclusively by the driver core for its lifetime and
/// outlives any number of mode changes as long as the active mode fits. The
/// controller sees it at `base`, which must stay below 4 GiB because the
/// buffer-address registers are 32 bits wide.
pub struct FramebufferRegion {
    base: u64,
    buf: Vec<u8>,
}

impl FramebufferRegion {
    /// Allocates a zero-filled region of `len` bytes at bus address `base`.
    pub fn alloc(base: u64, len: usize) -> Result<Self> {
        if len == 0 {
            return Err(LcdifError::AllocationFailed { needed: len });
        }
        let end = base
            .checked_add(len as u64)
            .ok_or(LcdifError::AllocationFailed { needed: len })?;
        if end > u64::from(u32::MAX) + 1 {
            return Err(LcdifError::AllocationFailed { needed: len });
        }

        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| LcdifError::AllocationFailed { needed: len })?;
        buf.resize(len, 0);

        Ok(Self { base, buf })
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The mapping handed to the framebuffer consumer: base address and
    /// length of the whole region.
    pub fn map(&self) -> (u64, usize) {
        (self.base, self.buf.len())
    }

    /// Bounds-checked mapping starting `offset` bytes into the region.
    pub fn map_at(&self, offset: usize) -> Result<(u64, usize)> {
        if offset >= self.buf.len() {
            return Err(LcdifError::InvalidMode("map offset outside region"));
        }
        Ok((self.base + offset as u64, self.buf.len() - offset))
    }

    /// Whether `[addr, addr + len)` lies entirely inside the region.
    pub fn contains(&self, addr: u64, len: usize) -> bool {
        addr >= self.base && addr + len as u64 <= self.base + self.buf.len() as u64
    }

    pub fn fill_zero(&mut self) {
        self.buf.fill(0);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Shifts `len` bytes starting at `offset` down to the start of the
    /// region in a single overlapping move. Used by mode recovery to repair
    /// pan drift left by a previous owner.
    pub fn shift_down(&mut self, offset: usize, len: usize) {
        self.buf.copy_within(offset..offset + len, 0);
    }
}
